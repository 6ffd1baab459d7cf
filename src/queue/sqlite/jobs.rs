//! SQLite job row operations.
//!
//! Every function takes an open connection; callers hold the store's writer
//! lock, so a select-then-update here is atomic with respect to other
//! mutations on the queue instance.

use rusqlite::{params, params_from_iter, types::Value as SqlValue, Connection, OptionalExtension};

use crate::queue::cursor::Cursor;
use crate::queue::types::{
    backoff_ms, FailOutcome, Job, JobKind, JobStatus, LeasedJob, StatusCount, LEASE_MS,
};

const JOB_COLUMNS: &str = "id, kind, target, created_at, status, updated_at, lease_until, \
     attempts, max_attempts, next_run_at, result, error, sort_at";

/// Insert a freshly enqueued job.
///
/// `sort_at` is floored at `created_at` so the list order key never precedes
/// the creation timestamp, even for producer-supplied future `created_at`.
pub fn insert_job(
    conn: &Connection,
    id: &str,
    kind: &str,
    target: &str,
    created_at: i64,
    max_attempts: u32,
    now: i64,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO jobs (id, kind, target, created_at, status, updated_at, lease_until,
            attempts, max_attempts, next_run_at, result, error, sort_at)
         VALUES (?1, ?2, ?3, ?4, 'queued', ?5, NULL, 0, ?6, NULL, NULL, NULL, ?7)",
        params![id, kind, target, created_at, now, max_attempts, now.max(created_at)],
    )?;
    Ok(())
}

/// Select and lease the oldest eligible job at `now`, in one transaction.
///
/// Eligible rows are queued jobs whose backoff window has passed, plus
/// processing jobs whose lease expired (reclaim). Reclaim does not touch the
/// attempt counter; only an explicit fail does.
pub fn lease_next(conn: &Connection, now: i64) -> Result<Option<LeasedJob>, rusqlite::Error> {
    let tx = conn.unchecked_transaction()?;

    let selected: Option<(String, String, String, i64)> = tx
        .query_row(
            "SELECT id, kind, target, created_at FROM jobs
             WHERE (status = 'queued' AND (next_run_at IS NULL OR next_run_at <= ?1))
                OR (status = 'processing' AND lease_until IS NOT NULL AND lease_until < ?1)
             ORDER BY created_at ASC, id ASC
             LIMIT 1",
            params![now],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                ))
            },
        )
        .optional()?;

    let Some((id, kind_str, target, created_at)) = selected else {
        return Ok(None);
    };

    // A leased job carries no failure reason; the next explicit fail (or
    // completion) records the fresh one.
    let lease_until = now + LEASE_MS;
    tx.execute(
        "UPDATE jobs SET status = 'processing', lease_until = ?2, next_run_at = NULL,
            error = NULL, updated_at = ?3, sort_at = MAX(?3, created_at)
         WHERE id = ?1",
        params![id, lease_until, now],
    )?;
    tx.commit()?;

    Ok(Some(LeasedJob {
        kind: parse_kind(1, &kind_str)?,
        id,
        target,
        created_at,
        lease_until,
    }))
}

/// Mark a job done and store its result.
///
/// Deliberately not gated on prior state or existence: acks may be repeated
/// or arrive after a reclaim, and both must stay safe for the consumer.
pub fn complete_job(
    conn: &Connection,
    id: &str,
    result_json: &str,
    now: i64,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "UPDATE jobs SET status = 'done', result = ?2, error = NULL, lease_until = NULL,
            next_run_at = NULL, updated_at = ?3, sort_at = MAX(?3, created_at)
         WHERE id = ?1",
        params![id, result_json, now],
    )?;
    Ok(())
}

/// Record a failure: retry with backoff while the budget allows, otherwise
/// move the job to its terminal `failed` state.
pub fn fail_job(
    conn: &Connection,
    id: &str,
    error: &str,
    now: i64,
) -> Result<Option<FailOutcome>, rusqlite::Error> {
    let tx = conn.unchecked_transaction()?;

    let counters: Option<(u32, u32)> = tx
        .query_row(
            "SELECT attempts, max_attempts FROM jobs WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((attempts, max_attempts)) = counters else {
        return Ok(None);
    };

    // Clamped so a stray report on an already-terminal row cannot push the
    // counter past its budget.
    let next_attempts = (attempts + 1).min(max_attempts);

    let outcome = if attempts + 1 < max_attempts {
        let next_run_at = now + backoff_ms(next_attempts);
        tx.execute(
            "UPDATE jobs SET status = 'queued', attempts = ?2, next_run_at = ?3,
                lease_until = NULL, error = ?4, result = NULL, updated_at = ?5,
                sort_at = MAX(?5, created_at)
             WHERE id = ?1",
            params![id, next_attempts, next_run_at, error, now],
        )?;
        FailOutcome::Retried {
            attempts: next_attempts,
            max_attempts,
            next_run_at,
        }
    } else {
        tx.execute(
            "UPDATE jobs SET status = 'failed', attempts = ?2, next_run_at = NULL,
                lease_until = NULL, error = ?3, result = NULL, updated_at = ?4,
                sort_at = MAX(?4, created_at)
             WHERE id = ?1",
            params![id, next_attempts, error, now],
        )?;
        FailOutcome::Exhausted {
            attempts: next_attempts,
            max_attempts,
        }
    };

    tx.commit()?;
    Ok(Some(outcome))
}

pub fn get_job(conn: &Connection, id: &str) -> Result<Option<Job>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"),
        params![id],
        row_to_job,
    )
    .optional()
}

/// Status histogram, ordered by status ascending.
pub fn count_by_status(conn: &Connection) -> Result<Vec<StatusCount>, rusqlite::Error> {
    let mut stmt =
        conn.prepare("SELECT status, COUNT(*) FROM jobs GROUP BY status ORDER BY status ASC")?;
    let rows = stmt.query_map([], |row| {
        let status_str: String = row.get(0)?;
        let count: i64 = row.get(1)?;
        Ok(StatusCount {
            status: parse_status(0, &status_str)?,
            count: count as u64,
        })
    })?;
    rows.collect()
}

/// One page under (`sort_at` DESC, `id` DESC), optionally filtered by status
/// and positioned strictly after `cursor`.
pub fn list_page(
    conn: &Connection,
    status: Option<JobStatus>,
    limit: usize,
    cursor: Option<&Cursor>,
) -> Result<Vec<Job>, rusqlite::Error> {
    let mut sql = format!("SELECT {JOB_COLUMNS} FROM jobs");
    let mut clauses: Vec<&str> = Vec::new();
    let mut params: Vec<SqlValue> = Vec::new();

    if let Some(status) = status {
        clauses.push("status = ?");
        params.push(SqlValue::from(status.as_str().to_string()));
    }
    if let Some(cursor) = cursor {
        clauses.push("(sort_at < ? OR (sort_at = ? AND id < ?))");
        params.push(SqlValue::from(cursor.sort_at));
        params.push(SqlValue::from(cursor.sort_at));
        params.push(SqlValue::from(cursor.id.clone()));
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY sort_at DESC, id DESC LIMIT ?");
    params.push(SqlValue::from(limit as i64));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params), row_to_job)?;
    rows.collect()
}

/// Delete terminal jobs whose last transition predates `before_ms`.
/// Live jobs are never purged.
pub fn purge_before(conn: &Connection, before_ms: i64) -> Result<u64, rusqlite::Error> {
    let deleted = conn.execute(
        "DELETE FROM jobs WHERE status IN ('done', 'failed') AND sort_at < ?1",
        params![before_ms],
    )?;
    Ok(deleted as u64)
}

fn parse_kind(idx: usize, raw: &str) -> Result<JobKind, rusqlite::Error> {
    JobKind::from_str(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown job kind '{raw}'").into(),
        )
    })
}

fn parse_status(idx: usize, raw: &str) -> Result<JobStatus, rusqlite::Error> {
    JobStatus::from_str(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown job status '{raw}'").into(),
        )
    })
}

/// Convert a database row to a Job struct.
fn row_to_job(row: &rusqlite::Row) -> Result<Job, rusqlite::Error> {
    let kind_str: String = row.get(1)?;
    let status_str: String = row.get(4)?;
    let created_at: i64 = row.get(3)?;
    let updated_at: Option<i64> = row.get(5)?;
    // Rows written before the sort_at migration read through the same
    // fallback the backfill applies.
    let sort_at: Option<i64> = row.get(12)?;

    Ok(Job {
        id: row.get(0)?,
        kind: parse_kind(1, &kind_str)?,
        target: row.get(2)?,
        created_at,
        status: parse_status(4, &status_str)?,
        updated_at,
        lease_until: row.get(6)?,
        attempts: row.get(7)?,
        max_attempts: row.get(8)?,
        next_run_at: row.get(9)?,
        result: row.get(10)?,
        error: row.get(11)?,
        sort_at: sort_at.or(updated_at).unwrap_or(created_at),
    })
}
