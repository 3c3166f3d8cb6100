#[derive(Debug, thiserror::Error)]
pub enum BootstoreError {
    #[error("binding not found: {0}")]
    BindingNotFound(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(#[from] kvstore::StorageError),

    #[error("inventory lookup failed: {0}")]
    Collaborator(#[from] collaborators::CollaboratorError),

    #[error("malformed stored record at {0}: {1}")]
    Corrupt(String, String),
}
