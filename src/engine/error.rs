//! Typed errors returned by engine operations

use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// Rule violations (no hearts, not enough gems, double claims) are ordinary
/// variants the caller can branch on. Storage failures wrap the underlying
/// SQLite error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no hearts left, next heart in {retry_after_minutes} minute(s)")]
    InsufficientHearts { retry_after_minutes: i64 },

    #[error("not enough gems: need {needed}, have {available}")]
    InsufficientGems { needed: i64, available: i64 },

    #[error("reward has not been unlocked")]
    NotUnlocked,

    #[error("reward was already claimed")]
    AlreadyClaimed,

    #[error("challenge is not completed")]
    NotCompleted,

    #[error("challenge has expired")]
    ChallengeExpired,

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("record was modified concurrently, please retry")]
    ConcurrentModification,

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// True for errors that represent a rule violation rather than a fault.
    pub fn is_rule_violation(&self) -> bool {
        !matches!(self, EngineError::Storage(_))
    }
}
