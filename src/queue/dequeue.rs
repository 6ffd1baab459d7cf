//! Dequeue: atomic select-and-lease of the oldest eligible job.

use super::manager::JobQueue;
use super::types::{now_ms, LeasedJob};
use super::QueueError;

impl JobQueue {
    /// Lease the oldest eligible job, or return `None` when nothing is due.
    pub fn dequeue(&self) -> Result<Option<LeasedJob>, QueueError> {
        self.dequeue_at(now_ms())
    }

    /// Dequeue with an explicit timestamp.
    ///
    /// Eligibility at `now`: queued with no pending backoff window, or
    /// processing with an expired lease. The latter is the reclaim path -
    /// the only way an orphaned job re-enters circulation - and it does not
    /// advance the attempt counter. Selection order is deterministic:
    /// `created_at` ascending, ties broken by `id` ascending.
    ///
    /// The select-and-update runs as a single transaction under the store's
    /// writer lock, so two concurrent dequeues can never lease the same row.
    pub fn dequeue_at(&self, now: i64) -> Result<Option<LeasedJob>, QueueError> {
        Ok(self.store.lease_next(now)?)
    }
}
