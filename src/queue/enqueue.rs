//! Enqueue operation and payload validation.

use rusqlite::ErrorCode;

use super::manager::JobQueue;
use super::types::{clamp_max_attempts, now_ms, Job, JobKind, JobStatus, NewJob};
use super::QueueError;

impl JobQueue {
    /// Validate and insert a new job in `queued` state.
    pub fn enqueue(&self, input: NewJob) -> Result<Job, QueueError> {
        self.enqueue_at(input, now_ms())
    }

    /// Enqueue with an explicit timestamp.
    ///
    /// A duplicate id surfaces the store's primary-key violation as
    /// `Conflict` rather than silently overwriting the existing row.
    pub fn enqueue_at(&self, input: NewJob, now: i64) -> Result<Job, QueueError> {
        if input.id.is_empty() {
            return Err(QueueError::InvalidPayload("id must be non-empty".into()));
        }
        let kind = JobKind::from_str(&input.kind).ok_or_else(|| {
            QueueError::InvalidPayload(format!("type must be one of crawl, rank (got '{}')", input.kind))
        })?;
        if input.target.is_empty() {
            return Err(QueueError::InvalidPayload("target must be non-empty".into()));
        }

        let max_attempts = clamp_max_attempts(input.max_attempts);
        let sort_at = now.max(input.created_at);

        match self.store.insert_job(
            &input.id,
            kind.as_str(),
            &input.target,
            input.created_at,
            max_attempts,
            now,
        ) {
            Ok(()) => Ok(Job {
                id: input.id,
                kind,
                target: input.target,
                created_at: input.created_at,
                status: JobStatus::Queued,
                updated_at: Some(now),
                lease_until: None,
                attempts: 0,
                max_attempts,
                next_run_at: None,
                result: None,
                error: None,
                sort_at,
            }),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(QueueError::Conflict(input.id))
            }
            Err(e) => Err(e.into()),
        }
    }
}
