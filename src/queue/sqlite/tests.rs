//! SQLite layer tests: migrations, backfill, and restart durability.

use rusqlite::Connection;

use super::{migration, SqliteConfig, SqliteStore};

#[test]
fn migrate_is_idempotent() {
    let conn = Connection::open_in_memory().unwrap();
    migration::migrate(&conn).unwrap();
    migration::migrate(&conn).unwrap();

    let applied: i64 = conn
        .query_row("SELECT COUNT(*) FROM migrations", [], |row| row.get(0))
        .unwrap();
    assert_eq!(applied, 2);
}

#[test]
fn sort_at_is_backfilled_for_rows_predating_the_column() {
    let conn = Connection::open_in_memory().unwrap();

    // Reconstruct a database that stopped at the first migration.
    conn.execute_batch(
        "CREATE TABLE migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at INTEGER NOT NULL
        );
        CREATE TABLE jobs (
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
        INSERT INTO migrations (name, applied_at) VALUES ('001_create_jobs', 0);

        INSERT INTO jobs (id, kind, target, created_at, status, updated_at)
            VALUES ('touched', 'crawl', 'https://example.com/a', 100, 'queued', 123);
        INSERT INTO jobs (id, kind, target, created_at, status, updated_at)
            VALUES ('untouched', 'crawl', 'https://example.com/b', 100, 'queued', NULL);
        ",
    )
    .unwrap();

    migration::migrate(&conn).unwrap();

    let touched: i64 = conn
        .query_row(
            "SELECT sort_at FROM jobs WHERE id = 'touched'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    let untouched: i64 = conn
        .query_row(
            "SELECT sort_at FROM jobs WHERE id = 'untouched'",
            [],
            |row| row.get(0),
        )
        .unwrap();

    assert_eq!(touched, 123);
    assert_eq!(untouched, 100);
}

#[test]
fn acknowledged_writes_survive_a_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = SqliteConfig {
        path: dir.path().join("jobs.db"),
        ..SqliteConfig::default()
    };

    {
        let store = SqliteStore::new(config.clone()).unwrap();
        store.migrate().unwrap();
        store
            .insert_job("a", "crawl", "https://example.com/a", 100, 3, 100)
            .unwrap();
    }

    let reopened = SqliteStore::new(config).unwrap();
    reopened.migrate().unwrap();
    let job = reopened.get_job("a").unwrap().expect("row persisted");
    assert_eq!(job.target, "https://example.com/a");
    assert_eq!(job.attempts, 0);
}
