use thiserror::Error;
use tiller_core::types::RunStatus;

/// Errors surfaced by the state engine.
///
/// Validation and conflict errors are terminal at the request boundary:
/// conflict resolution (re-read, retry with a fresh version) is the caller's
/// responsibility, never the engine's.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A required field was missing or malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No entity with the given id exists.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller's version token is stale; no mutation was applied.
    #[error("version conflict: expected {expected}, stored {stored}")]
    Conflict { expected: u64, stored: u64 },

    /// The requested run status change is not in the allowed transition set.
    #[error("invalid transition: {from:?} -> {to:?}")]
    InvalidTransition { from: RunStatus, to: RunStatus },

    /// A payload could not be hashed/serialized. Inputs should already be
    /// validated upstream, so this maps to a server-side defect.
    #[error("encoding error: {0}")]
    Encoding(#[from] tiller_core::error::HashError),

    /// Catch-all for backing-store failures.
    #[error("internal error: {0}")]
    Internal(String),
}
