//! Client for the object-store presigner collaborator: rewrites `s3://` image
//! URLs into presigned HTTPS URLs the booting node can fetch directly.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::CollaboratorError;

#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    async fn presign(&self, url: &str, valid_for: Duration) -> Result<String, CollaboratorError>;
}

#[derive(Deserialize)]
struct PresignResponse {
    url: String,
}

pub struct HttpObjectStoreClient {
    client: reqwest::Client,
    endpoint: String,
    access_key: String,
    secret_key: String,
    bucket: String,
}

impl HttpObjectStoreClient {
    pub fn new(endpoint: String, access_key: String, secret_key: String, bucket: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            access_key,
            secret_key,
            bucket,
        }
    }
}

#[async_trait]
impl ObjectStoreClient for HttpObjectStoreClient {
    async fn presign(&self, url: &str, valid_for: Duration) -> Result<String, CollaboratorError> {
        let resp = self
            .client
            .post(format!("{}/presign", self.endpoint))
            .basic_auth(&self.access_key, Some(&self.secret_key))
            .json(&serde_json::json!({
                "bucket": self.bucket,
                "object": url,
                "valid_for_seconds": valid_for.as_secs(),
            }))
            .send()
            .await
            .map_err(|e| CollaboratorError::Request("object store", e.to_string()))?;

        if !resp.status().is_success() {
            return Err(CollaboratorError::Status("object store", resp.status().as_u16()));
        }

        let body = resp
            .json::<PresignResponse>()
            .await
            .map_err(|e| CollaboratorError::Request("object store", e.to_string()))?;
        Ok(body.url)
    }
}

/// In-memory fake: appends a deterministic query string instead of calling out.
pub struct FakeObjectStoreClient;

#[async_trait]
impl ObjectStoreClient for FakeObjectStoreClient {
    async fn presign(&self, url: &str, valid_for: Duration) -> Result<String, CollaboratorError> {
        let rewritten = url.replacen("s3://", "https://presigned.example/", 1);
        Ok(format!("{rewritten}?expires_in={}", valid_for.as_secs()))
    }
}
