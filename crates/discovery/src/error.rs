#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("storage error: {0}")]
    Storage(#[from] kvstore::StorageError),

    #[error("inventory lookup failed: {0}")]
    Collaborator(#[from] collaborators::CollaboratorError),

    #[error(transparent)]
    Resolver(#[from] resolver::ResolverError),
}
