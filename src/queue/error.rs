//! Queue error types.

use thiserror::Error;

/// Errors surfaced by engine and inspector operations.
///
/// A failed mutation leaves the affected row unchanged; the engine never
/// retries internally (retry is a job-level concept driven by `fail`).
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("job {0} already exists")]
    Conflict(String),

    #[error("job {0} not found")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}
