//! Read-only views: get by id, status histogram, paginated list.

use super::cursor::Cursor;
use super::manager::JobQueue;
use super::types::{Job, JobPage, JobStatus, StatusCount};
use super::QueueError;

/// Page size bounds for list.
const MIN_LIMIT: i64 = 1;
const MAX_LIMIT: i64 = 200;
const DEFAULT_LIMIT: i64 = 50;

impl JobQueue {
    /// Fetch a single job. Unknown ids are not an error.
    pub fn get(&self, id: &str) -> Result<Option<Job>, QueueError> {
        Ok(self.store.get_job(id)?)
    }

    /// Per-status job counts, ordered by status ascending.
    pub fn stats(&self) -> Result<Vec<StatusCount>, QueueError> {
        Ok(self.store.count_by_status()?)
    }

    /// One page of jobs under (`sort_at` DESC, `id` DESC).
    ///
    /// `status` values outside the enum are ignored (no filter), `limit` is
    /// clamped to [1, 200] with a default of 50, and a malformed `cursor` is
    /// treated as absent. `next_cursor` is set only when the page came back
    /// full; walking pages until it is null visits each matching job exactly
    /// once.
    pub fn list(
        &self,
        status: Option<&str>,
        limit: Option<i64>,
        cursor: Option<&str>,
    ) -> Result<JobPage, QueueError> {
        let status = status.and_then(JobStatus::from_str);
        let limit = limit
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(MIN_LIMIT, MAX_LIMIT) as usize;
        let cursor = cursor.and_then(Cursor::decode);

        let items = self.store.list_page(status, limit, cursor.as_ref())?;

        let next_cursor = if items.len() == limit {
            items.last().map(|job| {
                Cursor {
                    sort_at: job.sort_at,
                    id: job.id.clone(),
                }
                .encode()
            })
        } else {
            None
        };

        Ok(JobPage { items, next_cursor })
    }
}
