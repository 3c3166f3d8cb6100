#[derive(Debug, thiserror::Error)]
pub enum ScriptBuilderError {
    #[error("not configured for booting")]
    NotConfigured,

    #[error("upstream collaborator failure: {0}")]
    Upstream(#[from] collaborators::CollaboratorError),
}
