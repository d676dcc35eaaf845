//! Error types for the progression engine.

use thiserror::Error;

/// Engine error type.
///
/// The first four variants form the taxonomy surfaced to callers; external
/// controllers map them onto their own response codes.
#[derive(Debug, Error)]
pub enum Error {
    /// Referenced adventurer, crate or quest acceptance does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Actor lacks the rank or ownership for the action
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Requested transition is illegal from the current state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Missing or malformed required input
    #[error("validation error: {0}")]
    Validation(String),

    /// Storage failure
    #[error("store error: {0}")]
    Store(#[from] guildhall_store::Error),
}

impl Error {
    /// Stable taxonomy kind, for callers mapping errors to responses.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::InvalidState(_) => "invalid_state",
            Self::Validation(_) => "validation_error",
            Self::Store(_) => "store_error",
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
