//! Completion and failure acknowledgments.

use serde_json::Value;

use super::manager::JobQueue;
use super::types::{now_ms, FailOutcome};
use super::QueueError;

impl JobQueue {
    /// Mark a job done and store its serialized result.
    ///
    /// Idempotent by id and not gated on prior state: a repeated ack
    /// overwrites the result and timestamps, and an ack for an unknown id is
    /// accepted as a no-op. Both keep consumer restarts crash-safe. The
    /// flip side is that a reclaimed job's original consumer can still mark
    /// the row done afterwards; whichever ack commits last wins.
    pub fn complete(&self, id: &str, result: &Value) -> Result<(), QueueError> {
        self.complete_at(id, result, now_ms())
    }

    /// Complete with an explicit timestamp.
    pub fn complete_at(&self, id: &str, result: &Value, now: i64) -> Result<(), QueueError> {
        let result_json = serde_json::to_string(result).unwrap_or_default();
        Ok(self.store.complete_job(id, &result_json, now)?)
    }

    /// Record a failure for a job.
    ///
    /// While the attempt budget allows, the job returns to `queued` with a
    /// backoff window (10 s / 60 s / 300 s for attempts 1 / 2 / 3+);
    /// otherwise it moves to the terminal `failed` state. Unknown ids are an
    /// error here, unlike `complete`: a failure report carries a retry
    /// decision and must land on a real row.
    pub fn fail(&self, id: &str, error: &str) -> Result<FailOutcome, QueueError> {
        self.fail_at(id, error, now_ms())
    }

    /// Fail with an explicit timestamp.
    pub fn fail_at(&self, id: &str, error: &str, now: i64) -> Result<FailOutcome, QueueError> {
        self.store
            .fail_job(id, error, now)?
            .ok_or_else(|| QueueError::NotFound(id.to_string()))
    }
}
