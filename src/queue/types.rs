//! Core job types, lease and backoff constants.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Exclusive lease duration granted by a dequeue.
pub const LEASE_MS: i64 = 120_000;

/// Attempt budget bounds and default applied at enqueue.
pub const MIN_ATTEMPTS: u32 = 1;
pub const MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Retry backoff schedule, keyed by the attempt number being recorded.
#[inline]
pub fn backoff_ms(next_attempts: u32) -> i64 {
    match next_attempts {
        1 => 10_000,
        2 => 60_000,
        _ => 300_000,
    }
}

/// Current wall-clock time in epoch milliseconds.
#[inline]
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Job behavior selector. Opaque to the queue: `rank` jobs are stored and
/// leased like any other even though no consumer currently executes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Crawl,
    Rank,
}

impl JobKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "crawl" => Some(JobKind::Crawl),
            "rank" => Some(JobKind::Rank),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Crawl => "crawl",
            JobKind::Rank => "rank",
        }
    }
}

/// Job lifecycle state.
///
/// `queued` and `processing` are live; `done` and `failed` are terminal and
/// only leave the table through purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,
    Failed,
}

impl JobStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobStatus::Queued),
            "processing" => Some(JobStatus::Processing),
            "done" => Some(JobStatus::Done),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }
}

/// A persisted job row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub kind: JobKind,
    pub target: String,
    pub created_at: i64,
    pub status: JobStatus,
    pub updated_at: Option<i64>,
    /// Non-null exactly while the job is `processing`.
    pub lease_until: Option<i64>,
    /// Count of dispatches that ended in an explicit fail.
    pub attempts: u32,
    pub max_attempts: u32,
    /// Earliest time a `queued` job may be leased again after a retry.
    pub next_run_at: Option<i64>,
    /// Serialized result payload, set on completion.
    pub result: Option<String>,
    /// Last reported failure reason.
    pub error: Option<String>,
    /// Mirror of `updated_at` (or `created_at` before any update); list order key.
    pub sort_at: i64,
}

/// Producer-supplied fields for a new job. Validation and clamping happen
/// in the engine, not here.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub id: String,
    pub kind: String,
    pub target: String,
    pub created_at: i64,
    pub max_attempts: Option<i64>,
}

/// The slice of a job handed to a consumer by a successful dequeue.
#[derive(Debug, Clone, Serialize)]
pub struct LeasedJob {
    pub id: String,
    pub kind: JobKind,
    pub target: String,
    pub created_at: i64,
    pub lease_until: i64,
}

/// Outcome of recording a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailOutcome {
    /// The job went back to `queued` with a backoff window.
    Retried {
        attempts: u32,
        max_attempts: u32,
        next_run_at: i64,
    },
    /// The attempt budget is exhausted; the job is terminally `failed`.
    Exhausted { attempts: u32, max_attempts: u32 },
}

/// One row of the status histogram.
#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: JobStatus,
    pub count: u64,
}

/// A page of jobs plus the cursor for the next one, if any.
#[derive(Debug, Clone)]
pub struct JobPage {
    pub items: Vec<Job>,
    pub next_cursor: Option<String>,
}

/// Clamp a producer-supplied attempt budget into [1, 10], defaulting to 3
/// when absent or non-numeric.
pub fn clamp_max_attempts(requested: Option<i64>) -> u32 {
    match requested {
        Some(n) => n.clamp(MIN_ATTEMPTS as i64, MAX_ATTEMPTS as i64) as u32,
        None => DEFAULT_MAX_ATTEMPTS,
    }
}
