//! SQLite database migrations.
//!
//! Migrations are additive and recorded in a `migrations` table, so an
//! in-place upgrade of an existing database applies only what is missing.
//! The `sort_at` column arrives in its own migration with a one-shot
//! backfill for rows that predate it.

use rusqlite::Connection;
use tracing::info;

/// Run all pending migrations.
pub fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let applied: Vec<String> = {
        let mut stmt = conn.prepare("SELECT name FROM migrations")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.filter_map(|r| r.ok()).collect()
    };

    let mut applied_count = 0;

    // Migration 1: jobs table with lease selection and retry-scan indexes.
    if !applied.contains(&"001_create_jobs".to_string()) {
        conn.execute_batch(
            "CREATE TABLE jobs (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                target TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'queued',
                updated_at INTEGER,
                lease_until INTEGER,
                attempts INTEGER NOT NULL DEFAULT 0,
                max_attempts INTEGER NOT NULL DEFAULT 3,
                next_run_at INTEGER,
                result TEXT,
                error TEXT
            );

            CREATE INDEX idx_jobs_created ON jobs(created_at, id);
            CREATE INDEX idx_jobs_next_run ON jobs(next_run_at, status);

            INSERT INTO migrations (name, applied_at) VALUES ('001_create_jobs', strftime('%s', 'now'));
            ",
        )?;
        applied_count += 1;
    }

    // Migration 2: list-ordering column, backfilled from existing timestamps.
    if !applied.contains(&"002_add_sort_at".to_string()) {
        conn.execute_batch(
            "ALTER TABLE jobs ADD COLUMN sort_at INTEGER;

            UPDATE jobs SET sort_at = COALESCE(updated_at, created_at) WHERE sort_at IS NULL;

            CREATE INDEX idx_jobs_sort ON jobs(sort_at DESC, id DESC);
            CREATE INDEX idx_jobs_status_sort ON jobs(status, sort_at DESC, id DESC);

            INSERT INTO migrations (name, applied_at) VALUES ('002_add_sort_at', strftime('%s', 'now'));
            ",
        )?;
        applied_count += 1;
    }

    if applied_count > 0 {
        info!(count = applied_count, "Applied SQLite migrations");
    }

    Ok(())
}
