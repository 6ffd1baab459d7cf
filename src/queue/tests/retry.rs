//! Retry, backoff, exhaustion, and reclaim tests.

use serde_json::json;

use super::*;
use crate::queue::types::{NewJob, LEASE_MS};

#[test]
fn single_retry_with_backoff() {
    let queue = setup();
    queue.enqueue_at(crawl("a"), T0).unwrap();
    queue.dequeue_at(T0 + 1).unwrap();

    let outcome = queue.fail_at("a", "oops", T0 + 2).unwrap();
    assert_eq!(
        outcome,
        FailOutcome::Retried {
            attempts: 1,
            max_attempts: 3,
            next_run_at: T0 + 2 + 10_000,
        }
    );

    let job = queue.get("a").unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.attempts, 1);
    assert_eq!(job.error.as_deref(), Some("oops"));
    assert!(job.lease_until.is_none());
    assert_eq!(job.next_run_at, Some(T0 + 2 + 10_000));

    // Not eligible until the backoff window passes.
    assert!(queue.dequeue_at(T0 + 3).unwrap().is_none());

    let leased = queue.dequeue_at(T0 + 2 + 10_000).unwrap().unwrap();
    assert_eq!(leased.id, "a");
}

#[test]
fn backoff_schedule_grows_per_attempt() {
    let queue = setup();
    let input = NewJob {
        max_attempts: Some(10),
        ..crawl("a")
    };
    queue.enqueue_at(input, T0).unwrap();

    let mut now = T0;
    for expected_backoff in [10_000, 60_000, 300_000, 300_000] {
        queue.dequeue_at(now).unwrap().expect("job eligible");
        now += 1;
        match queue.fail_at("a", "boom", now).unwrap() {
            FailOutcome::Retried { next_run_at, .. } => {
                assert_eq!(next_run_at, now + expected_backoff);
                now = next_run_at;
            }
            other => panic!("expected retry, got {other:?}"),
        }
    }
}

#[test]
fn attempts_exhaustion_moves_job_to_failed() {
    let queue = setup();
    let input = NewJob {
        max_attempts: Some(2),
        ..crawl("b")
    };
    queue.enqueue_at(input, T0).unwrap();

    queue.dequeue_at(T0 + 1).unwrap().unwrap();
    let first = queue.fail_at("b", "e1", T0 + 2).unwrap();
    assert_eq!(
        first,
        FailOutcome::Retried {
            attempts: 1,
            max_attempts: 2,
            next_run_at: T0 + 2 + 10_000,
        }
    );

    queue.dequeue_at(T0 + 2 + 10_000).unwrap().unwrap();
    let second = queue.fail_at("b", "e2", T0 + 2 + 10_001).unwrap();
    assert_eq!(
        second,
        FailOutcome::Exhausted {
            attempts: 2,
            max_attempts: 2,
        }
    );

    let job = queue.get("b").unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.attempts, 2);
    assert_eq!(job.error.as_deref(), Some("e2"));
    assert!(job.lease_until.is_none());
    assert!(job.next_run_at.is_none());

    // Terminal: never leased again.
    assert!(queue.dequeue_at(T0 + 1_000_000).unwrap().is_none());
}

#[test]
fn expired_lease_is_reclaimed_without_consuming_attempts() {
    let queue = setup();
    queue.enqueue_at(crawl("c"), T0).unwrap();

    let leased = queue.dequeue_at(T0).unwrap().unwrap();
    assert_eq!(leased.lease_until, T0 + LEASE_MS);

    // The lease is exclusive up to and including its expiry instant.
    assert!(queue.dequeue_at(T0 + LEASE_MS).unwrap().is_none());

    let reclaimed = queue.dequeue_at(T0 + LEASE_MS + 1).unwrap().unwrap();
    assert_eq!(reclaimed.id, "c");
    assert_eq!(reclaimed.lease_until, T0 + LEASE_MS + 1 + LEASE_MS);

    // A crashed consumer does not count against the retry budget.
    assert_eq!(queue.get("c").unwrap().unwrap().attempts, 0);
}

#[test]
fn fail_on_unknown_id_is_not_found() {
    let queue = setup();
    match queue.fail_at("ghost", "boom", T0) {
        Err(QueueError::NotFound(id)) => assert_eq!(id, "ghost"),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn fail_on_terminal_row_keeps_attempts_bounded() {
    let queue = setup();
    let input = NewJob {
        max_attempts: Some(1),
        ..crawl("d")
    };
    queue.enqueue_at(input, T0).unwrap();

    queue.dequeue_at(T0 + 1).unwrap().unwrap();
    let first = queue.fail_at("d", "e1", T0 + 2).unwrap();
    assert_eq!(
        first,
        FailOutcome::Exhausted {
            attempts: 1,
            max_attempts: 1,
        }
    );

    // A straggler report on the already-failed row must not grow the counter.
    let second = queue.fail_at("d", "e2", T0 + 3).unwrap();
    assert_eq!(
        second,
        FailOutcome::Exhausted {
            attempts: 1,
            max_attempts: 1,
        }
    );

    let job = queue.get("d").unwrap().unwrap();
    assert!(job.attempts <= job.max_attempts);
}

#[test]
fn late_failure_after_completion_clears_the_result() {
    let queue = setup();
    queue.enqueue_at(crawl("e"), T0).unwrap();
    queue.dequeue_at(T0 + 1).unwrap();
    queue
        .complete_at("e", &json!({"ok": true}), T0 + 2)
        .unwrap();

    // A failure report from a consumer that raced a reclaim arrives after
    // the ack; the row leaves done and the stale result must go with it.
    let outcome = queue.fail_at("e", "raced", T0 + 3).unwrap();
    assert_eq!(
        outcome,
        FailOutcome::Retried {
            attempts: 1,
            max_attempts: 3,
            next_run_at: T0 + 3 + 10_000,
        }
    );

    let job = queue.get("e").unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert!(job.result.is_none());
    assert_eq!(job.error.as_deref(), Some("raced"));
}

#[test]
fn failure_exhausting_a_completed_job_clears_the_result() {
    let queue = setup();
    let input = NewJob {
        max_attempts: Some(1),
        ..crawl("f")
    };
    queue.enqueue_at(input, T0).unwrap();
    queue.dequeue_at(T0 + 1).unwrap();
    queue
        .complete_at("f", &json!({"ok": true}), T0 + 2)
        .unwrap();

    let outcome = queue.fail_at("f", "raced", T0 + 3).unwrap();
    assert_eq!(
        outcome,
        FailOutcome::Exhausted {
            attempts: 1,
            max_attempts: 1,
        }
    );

    let job = queue.get("f").unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.result.is_none());
    assert_eq!(job.error.as_deref(), Some("raced"));
}

#[test]
fn retried_job_keeps_queue_position_by_created_at() {
    let queue = setup();
    queue.enqueue_at(crawl_at("old", T0), T0).unwrap();
    queue.enqueue_at(crawl_at("new", T0 + 50), T0 + 50).unwrap();

    // Fail the older job; once its backoff passes it still wins over the
    // younger queued job because selection orders by created_at.
    queue.dequeue_at(T0 + 100).unwrap().unwrap();
    queue.fail_at("old", "flaky", T0 + 101).unwrap();

    let ready = T0 + 101 + 10_000;
    let leased = queue.dequeue_at(ready).unwrap().unwrap();
    assert_eq!(leased.id, "old");
}
