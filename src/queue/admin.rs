//! Admin operations.

use super::manager::JobQueue;
use super::QueueError;

impl JobQueue {
    /// Delete terminal (`done` / `failed`) jobs whose last transition
    /// predates `before_ms`. Returns the number of rows removed. Live jobs
    /// are untouched regardless of age.
    pub fn purge_before(&self, before_ms: i64) -> Result<u64, QueueError> {
        Ok(self.store.purge_before(before_ms)?)
    }
}
