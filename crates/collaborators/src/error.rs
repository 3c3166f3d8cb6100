#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{0} request failed: {1}")]
    Request(&'static str, String),

    #[error("{0} returned an unexpected status: {1}")]
    Status(&'static str, u16),

    #[error("not found")]
    NotFound,
}
