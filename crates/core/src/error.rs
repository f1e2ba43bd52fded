/// Domain-level error shared by every crate in the workspace.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Input rejected before it could reach the decision pipeline or the
    /// rule engine. The message is safe to show to API callers.
    #[error("Validation failed: {0}")]
    Validation(String),
}
