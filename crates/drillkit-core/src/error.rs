//! Engine error types.
//!
//! Generation and persistence failures are typed so the engine can decide
//! whether a failure stops a session (generation before `Active`) or is only
//! reported (persistence), without string matching.

use thiserror::Error;

use crate::model::Phase;

/// Failures from a content source, local or remote.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The generator answered 429.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// The generator answered 402; credits are exhausted.
    #[error("payment required by content generator")]
    PaymentRequired,

    /// The generator answered, but not with well-formed items.
    #[error("malformed generator output: {0}")]
    MalformedOutput(String),

    /// The generator could not be reached or failed outright.
    #[error("content generator unavailable: {0}")]
    Unavailable(String),
}

impl GenerationError {
    /// Returns `true` if retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GenerationError::RateLimited { .. } | GenerationError::Unavailable(_)
        )
    }
}

/// Failures writing to a result sink.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The sink refused the write (e.g. remote store returned an error).
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Errors surfaced by the session state machine and engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An operation was called in a phase that does not accept it.
    #[error("cannot {operation} while session is {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: Phase,
    },

    #[error("invalid session config: {0}")]
    InvalidConfig(String),

    #[error("no content source registered as '{0}'")]
    UnknownContentSource(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The session task has already shut down.
    #[error("session is closed")]
    SessionClosed,
}
