#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("storage error: {0}")]
    Storage(#[from] kvstore::StorageError),

    #[error("inventory lookup failed: {0}")]
    Collaborator(#[from] collaborators::CollaboratorError),

    #[error(transparent)]
    Bootstore(#[from] bootstore::BootstoreError),

    #[error("malformed stored record at {0}: {1}")]
    Corrupt(String, String),
}
