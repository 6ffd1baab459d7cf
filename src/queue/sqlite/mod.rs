//! SQLite storage layer.
//!
//! Embedded persistence with:
//! - WAL mode for durability
//! - a single writer connection behind a mutex
//! - versioned, additive schema migrations
//!
//! Every mutating queue operation runs its statements while holding the
//! connection lock, which serializes writes for the queue instance and makes
//! the dequeue select-and-lease atomic.

mod jobs;
mod migration;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::info;

use super::cursor::Cursor;
use super::types::{FailOutcome, Job, JobStatus, LeasedJob, StatusCount};

/// SQLite storage configuration.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path to the database file.
    pub path: PathBuf,
    /// Enable WAL mode (recommended).
    pub wal_mode: bool,
    /// Synchronous mode: 0=OFF, 1=NORMAL, 2=FULL.
    pub synchronous: i32,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("duraq.db"),
            wal_mode: true,
            synchronous: 1,
        }
    }
}

impl SqliteConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let path = std::env::var("DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("duraq.db"));

        let synchronous = std::env::var("SQLITE_SYNCHRONOUS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);

        Self {
            path,
            wal_mode: true,
            synchronous,
        }
    }
}

/// Durable store for the jobs table. Single writer: the connection mutex is
/// the serialization point for all mutations on the queue instance.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    pub path: PathBuf,
}

impl SqliteStore {
    /// Open (or create) the database file and apply pragmas.
    pub fn new(config: SqliteConfig) -> Result<Self, rusqlite::Error> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).ok();
            }
        }

        let conn = Connection::open(&config.path)?;

        conn.execute_batch(&format!(
            "PRAGMA journal_mode = {};
             PRAGMA synchronous = {};
             PRAGMA foreign_keys = ON;",
            if config.wal_mode { "WAL" } else { "DELETE" },
            config.synchronous,
        ))?;

        info!(path = %config.path.display(), "SQLite initialized");

        Ok(Self {
            conn: Mutex::new(conn),
            path: config.path,
        })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        })
    }

    /// Run pending schema migrations.
    pub fn migrate(&self) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock();
        migration::migrate(&conn)
    }

    // ============== Job Operations ==============

    /// Insert a new queued job. A primary-key violation bubbles up as the
    /// underlying constraint error.
    pub fn insert_job(
        &self,
        id: &str,
        kind: &str,
        target: &str,
        created_at: i64,
        max_attempts: u32,
        now: i64,
    ) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock();
        jobs::insert_job(&conn, id, kind, target, created_at, max_attempts, now)
    }

    /// Atomically select and lease the oldest eligible job at `now`.
    pub fn lease_next(&self, now: i64) -> Result<Option<LeasedJob>, rusqlite::Error> {
        let conn = self.conn.lock();
        jobs::lease_next(&conn, now)
    }

    /// Mark a job done, storing its serialized result. No-op for unknown ids.
    pub fn complete_job(
        &self,
        id: &str,
        result_json: &str,
        now: i64,
    ) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock();
        jobs::complete_job(&conn, id, result_json, now)
    }

    /// Record a failure, retrying with backoff or moving the job to its
    /// terminal state. Returns `None` for unknown ids.
    pub fn fail_job(
        &self,
        id: &str,
        error: &str,
        now: i64,
    ) -> Result<Option<FailOutcome>, rusqlite::Error> {
        let conn = self.conn.lock();
        jobs::fail_job(&conn, id, error, now)
    }

    // ============== Read Operations ==============

    pub fn get_job(&self, id: &str) -> Result<Option<Job>, rusqlite::Error> {
        let conn = self.conn.lock();
        jobs::get_job(&conn, id)
    }

    pub fn count_by_status(&self) -> Result<Vec<StatusCount>, rusqlite::Error> {
        let conn = self.conn.lock();
        jobs::count_by_status(&conn)
    }

    pub fn list_page(
        &self,
        status: Option<JobStatus>,
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Vec<Job>, rusqlite::Error> {
        let conn = self.conn.lock();
        jobs::list_page(&conn, status, limit, cursor)
    }

    /// Delete terminal jobs whose last transition predates `before_ms`.
    pub fn purge_before(&self, before_ms: i64) -> Result<u64, rusqlite::Error> {
        let conn = self.conn.lock();
        jobs::purge_before(&conn, before_ms)
    }
}
