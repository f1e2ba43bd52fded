/// Failure reported by a state store.
///
/// The decision pipeline never propagates these to its caller; it converts
/// them into a fallback decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backing store refused or failed the operation.
    #[error("{store} store unavailable: {reason}")]
    Unavailable { store: &'static str, reason: String },

    /// The operation did not complete within the configured deadline.
    #[error("{store} store timed out after {timeout_ms}ms")]
    Timeout { store: &'static str, timeout_ms: u64 },
}

/// Convenience alias for store operation results.
pub type StoreResult<T> = Result<T, StoreError>;
