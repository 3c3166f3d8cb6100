//! `BssError`: the one error type every handler returns, so that every
//! failure path serialises to an RFC 7807 `application/problem+json` body.
//! This is deliberate: it structurally rules out a response path that
//! builds a problem-details envelope and then forgets to send it.

use axum::{http::StatusCode, response::IntoResponse, Json};
use schemars::JsonSchema;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum BssError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Blocked(String),
}

impl BssError {
    fn status(&self) -> StatusCode {
        match self {
            BssError::Validation(_) => StatusCode::BAD_REQUEST,
            BssError::NotFound(_) => StatusCode::NOT_FOUND,
            BssError::Conflict(_) => StatusCode::BAD_REQUEST,
            BssError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BssError::Upstream(_) => StatusCode::NOT_FOUND,
            BssError::Blocked(_) => StatusCode::NOT_FOUND,
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ApiError {
    pub status: u16,
    pub title: String,
    pub detail: String,
}

impl ApiError {
    pub fn trivial(status: StatusCode, detail: String) -> Self {
        Self {
            status: status.as_u16(),
            title: status.canonical_reason().unwrap_or("error").to_string(),
            detail,
        }
    }
}

impl IntoResponse for BssError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        tracing::warn!(%status, error = %self, "request failed");
        let body = ApiError::trivial(status, self.to_string());
        (status, Json(body)).into_response()
    }
}

impl From<kvstore::StorageError> for BssError {
    fn from(e: kvstore::StorageError) -> Self {
        BssError::Storage(e.to_string())
    }
}

impl From<collaborators::CollaboratorError> for BssError {
    fn from(e: collaborators::CollaboratorError) -> Self {
        BssError::Upstream(e.to_string())
    }
}

impl From<bootstore::BootstoreError> for BssError {
    fn from(e: bootstore::BootstoreError) -> Self {
        match e {
            bootstore::BootstoreError::BindingNotFound(b) => {
                BssError::NotFound(format!("no such binding: {b}"))
            }
            bootstore::BootstoreError::ImageNotFound(i) => {
                BssError::NotFound(format!("no such image: {i}"))
            }
            bootstore::BootstoreError::Conflict(item) => {
                BssError::Conflict(format!("already exists: {item}"))
            }
            bootstore::BootstoreError::Storage(e) => BssError::Storage(e.to_string()),
            bootstore::BootstoreError::Collaborator(e) => BssError::Upstream(e.to_string()),
            bootstore::BootstoreError::Corrupt(key, detail) => {
                BssError::Storage(format!("corrupt record at {key}: {detail}"))
            }
        }
    }
}

impl From<resolver::ResolverError> for BssError {
    fn from(e: resolver::ResolverError) -> Self {
        match e {
            resolver::ResolverError::Storage(e) => BssError::Storage(e.to_string()),
            resolver::ResolverError::Collaborator(e) => BssError::Upstream(e.to_string()),
            resolver::ResolverError::Bootstore(e) => e.into(),
            resolver::ResolverError::Corrupt(key, detail) => {
                BssError::Storage(format!("corrupt record at {key}: {detail}"))
            }
        }
    }
}

impl From<discovery::DiscoveryError> for BssError {
    fn from(e: discovery::DiscoveryError) -> Self {
        match e {
            discovery::DiscoveryError::Storage(e) => BssError::Storage(e.to_string()),
            discovery::DiscoveryError::Collaborator(e) => BssError::Upstream(e.to_string()),
            discovery::DiscoveryError::Resolver(e) => e.into(),
        }
    }
}

impl From<scriptbuilder::ScriptBuilderError> for BssError {
    fn from(e: scriptbuilder::ScriptBuilderError) -> Self {
        match e {
            scriptbuilder::ScriptBuilderError::NotConfigured => {
                BssError::NotFound("not configured for booting".to_string())
            }
            scriptbuilder::ScriptBuilderError::Upstream(e) => BssError::Upstream(e.to_string()),
        }
    }
}
