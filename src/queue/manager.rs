//! Core JobQueue struct and constructors.

use std::sync::Arc;

use tracing::info;

use super::sqlite::{SqliteConfig, SqliteStore};
use super::QueueError;

/// Durable job queue backed by the SQLite store.
///
/// All mutations flow through the store's writer lock, giving the queue
/// instance a total order over its operations without any locking at this
/// layer. Reads observe a snapshot at least as recent as their issuance.
pub struct JobQueue {
    pub(crate) store: SqliteStore,
}

impl JobQueue {
    /// Wrap an opened store, applying pending migrations.
    pub fn new(store: SqliteStore) -> Result<Arc<Self>, QueueError> {
        store.migrate()?;
        Ok(Arc::new(Self { store }))
    }

    /// Open the database described by `config` and migrate it.
    pub fn open(config: SqliteConfig) -> Result<Arc<Self>, QueueError> {
        let store = SqliteStore::new(config)?;
        let queue = Self::new(store)?;
        info!(path = %queue.store.path.display(), "Job queue ready");
        Ok(queue)
    }

    /// In-memory queue for tests.
    pub fn open_in_memory() -> Result<Arc<Self>, QueueError> {
        Self::new(SqliteStore::open_in_memory()?)
    }
}
