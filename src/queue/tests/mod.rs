//! Queue engine tests.
//!
//! All scenarios run against an in-memory store with an explicit, frozen
//! clock passed through the `*_at` operation variants.

mod retry;

use std::sync::Arc;

use super::types::{FailOutcome, JobStatus, NewJob};
use super::{JobQueue, QueueError};

const T0: i64 = 1_700_000_000_000;

fn setup() -> Arc<JobQueue> {
    JobQueue::open_in_memory().expect("in-memory queue")
}

fn crawl(id: &str) -> NewJob {
    NewJob {
        id: id.to_string(),
        kind: "crawl".to_string(),
        target: format!("https://example.com/{id}"),
        created_at: T0,
        max_attempts: None,
    }
}

fn crawl_at(id: &str, created_at: i64) -> NewJob {
    NewJob {
        created_at,
        ..crawl(id)
    }
}
