//! Error taxonomy for the wellness core.
//!
//! Only validation and storage-write failures ever reach a caller. AI backend failures stay
//! inside the recommendation engine (they select the fallback), and corrupt persisted bytes
//! stay inside the adapters that read them (they read as absent).

use std::time::Duration;

/// Field-level rejection of a profile or activity. Raised before anything is mutated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be between 1 and 10, got {value}")]
    StressOutOfRange { field: &'static str, value: i64 },

    #[error("profile id must not be empty")]
    EmptyId,

    #[error("activity duration must be zero or more minutes, got {0}")]
    NegativeDuration(i64),

    #[error("activity duration of {0} minutes is too long")]
    DurationTooLong(i64),

    #[error("progress window must be 7, 30 or 90 days, got {0}")]
    UnsupportedWindow(u32),
}

/// Failure talking to the key-value backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("failed to serialize record: {0}")]
    Serialize(String),
}

impl From<sled::Error> for StorageError {
    fn from(e: sled::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialize(e.to_string())
    }
}

/// Why the AI text service did not produce usable text.
///
/// Every variant routes to the deterministic fallback; the distinction only shows up in logs.
#[derive(Debug, thiserror::Error)]
pub enum AiServiceError {
    #[error("AI service is not configured (no API key)")]
    NotConfigured,

    #[error("AI request failed: {0}")]
    Transport(String),

    #[error("AI service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("AI service reported failure: {0}")]
    Unsuccessful(String),

    #[error("AI response could not be used: {0}")]
    MalformedResponse(String),

    #[error("AI service did not answer within {0:?}")]
    Timeout(Duration),
}

/// Top-level error for operations a caller can act on.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("no user profile has been saved yet")]
    ProfileMissing,
}

pub type EngineResult<T> = Result<T, EngineError>;
