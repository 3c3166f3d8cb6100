//! Client for the SPIRE collaborator: exchanges a node identity for a
//! short-lived join token injected into the kernel command line.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;

use crate::error::CollaboratorError;

#[async_trait]
pub trait SpireClient: Send + Sync {
    async fn fetch_join_token(&self, xname: &str) -> Result<String, CollaboratorError>;
}

#[derive(Deserialize)]
struct JoinTokenResponse {
    token: String,
}

pub struct HttpSpireClient {
    client: reqwest::Client,
    token_endpoint: String,
}

impl HttpSpireClient {
    pub fn new(token_endpoint: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build SPIRE http client");
        Self {
            client,
            token_endpoint,
        }
    }
}

#[async_trait]
impl SpireClient for HttpSpireClient {
    async fn fetch_join_token(&self, xname: &str) -> Result<String, CollaboratorError> {
        let resp = self
            .client
            .get(&self.token_endpoint)
            .query(&[("xname", xname)])
            .send()
            .await
            .map_err(|e| CollaboratorError::Request("SPIRE", e.to_string()))?;

        if !resp.status().is_success() {
            return Err(CollaboratorError::Status("SPIRE", resp.status().as_u16()));
        }

        let body = resp
            .json::<JoinTokenResponse>()
            .await
            .map_err(|e| CollaboratorError::Request("SPIRE", e.to_string()))?;
        Ok(body.token)
    }
}

/// In-memory fake: tokens are seeded per xname, unseeded lookups fail.
#[derive(Default)]
pub struct FakeSpireClient {
    tokens: DashMap<String, String>,
}

impl FakeSpireClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, xname: &str, token: &str) {
        self.tokens.insert(xname.to_string(), token.to_string());
    }
}

#[async_trait]
impl SpireClient for FakeSpireClient {
    async fn fetch_join_token(&self, xname: &str) -> Result<String, CollaboratorError> {
        self.tokens
            .get(xname)
            .map(|t| t.clone())
            .ok_or(CollaboratorError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_returns_seeded_token() {
        let fake = FakeSpireClient::new();
        fake.seed("x0", "tok-123");
        assert_eq!(fake.fetch_join_token("x0").await.unwrap(), "tok-123");
    }

    #[tokio::test]
    async fn fake_fails_for_unseeded_xname() {
        let fake = FakeSpireClient::new();
        assert!(fake.fetch_join_token("x0").await.is_err());
    }
}
