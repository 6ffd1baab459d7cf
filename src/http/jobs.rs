//! Job operation HTTP handlers.
//!
//! Pure marshalling: parse the request, invoke one engine or inspector
//! operation, serialize the response. No state lives here.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::Value;
use uuid::Uuid;

use crate::queue::types::{now_ms, FailOutcome, NewJob};
use crate::queue::QueueError;

use super::types::{
    body_rejection, ApiError, AppState, CompleteRequest, CompleteResponse, DequeueResponse,
    EnqueueRequest, EnqueueResponse, FailRequest, FailResponse, GetQuery, GetResponse, JobView,
    LeasedJobView, ListQuery, ListResponse, PurgeRequest, PurgeResponse, StatsResponse,
};

/// Accept a new job. Generates `id` and `createdAt` for producers that do
/// not assign their own.
pub async fn enqueue(
    State(state): State<AppState>,
    payload: Result<Json<EnqueueRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EnqueueResponse>), ApiError> {
    let Json(req) = payload.map_err(body_rejection)?;

    let id = req
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let created_at = req.created_at.unwrap_or_else(now_ms);
    // JSON numbers may arrive as floats; only truly non-numeric values fall
    // back to the default.
    let max_attempts = req
        .max_attempts
        .as_ref()
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)));

    let job = state
        .queue
        .enqueue(NewJob {
            id,
            kind: req.kind,
            target: req.target,
            created_at,
            max_attempts,
        })
        .map_err(|e| match e {
            QueueError::Storage(e) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "enqueue_failed",
                e.to_string(),
            ),
            other => other.into(),
        })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(EnqueueResponse {
            ok: true,
            accepted: true,
            job: JobView::from(job),
        }),
    ))
}

/// Lease the oldest eligible job for this consumer.
pub async fn dequeue(State(state): State<AppState>) -> Result<Json<DequeueResponse>, ApiError> {
    let leased = state.queue.dequeue()?;
    Ok(Json(DequeueResponse {
        ok: true,
        lease_until: leased.as_ref().map(|j| j.lease_until),
        job: leased.as_ref().map(LeasedJobView::from),
    }))
}

/// Acknowledge successful completion.
pub async fn complete(
    State(state): State<AppState>,
    payload: Result<Json<CompleteRequest>, JsonRejection>,
) -> Result<Json<CompleteResponse>, ApiError> {
    let Json(req) = payload.map_err(body_rejection)?;
    let id = req
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing_id", "missing id"))?;

    let result = req.result.unwrap_or(Value::Null);
    state.queue.complete(&id, &result)?;
    Ok(Json(CompleteResponse { ok: true }))
}

/// Report a failed execution; the engine decides retry versus exhaustion.
pub async fn fail(
    State(state): State<AppState>,
    payload: Result<Json<FailRequest>, JsonRejection>,
) -> Result<Json<FailResponse>, ApiError> {
    let Json(req) = payload.map_err(body_rejection)?;
    let id = req
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing_id", "missing id"))?;

    let error = req.error.unwrap_or_else(|| "unknown error".to_string());
    let response = match state.queue.fail(&id, &error)? {
        FailOutcome::Retried {
            attempts,
            max_attempts,
            next_run_at,
        } => FailResponse {
            ok: true,
            retried: true,
            attempts,
            max_attempts,
            next_run_at: Some(next_run_at),
        },
        FailOutcome::Exhausted {
            attempts,
            max_attempts,
        } => FailResponse {
            ok: true,
            retried: false,
            attempts,
            max_attempts,
            next_run_at: None,
        },
    };
    Ok(Json(response))
}

/// Fetch one job. Unknown ids return `{job: null}` with 200.
pub async fn get_job(
    State(state): State<AppState>,
    Query(query): Query<GetQuery>,
) -> Result<Json<GetResponse>, ApiError> {
    let id = query
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing_id", "missing id"))?;

    let job = state.queue.get(&id)?;
    Ok(Json(GetResponse {
        ok: true,
        job: job.map(JobView::from),
    }))
}

/// Per-status job counts.
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.queue.stats()?;
    Ok(Json(StatsResponse {
        ok: true,
        stats: stats.into_iter().map(Into::into).collect(),
    }))
}

/// Cursor-paginated job listing.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let page = state.queue.list(
        query.status.as_deref(),
        query.limit,
        query.cursor.as_deref(),
    )?;
    Ok(Json(ListResponse {
        ok: true,
        items: page.items.into_iter().map(JobView::from).collect(),
        next_cursor: page.next_cursor,
    }))
}

/// Delete terminal jobs older than the given bound.
pub async fn purge(
    State(state): State<AppState>,
    payload: Result<Json<PurgeRequest>, JsonRejection>,
) -> Result<Json<PurgeResponse>, ApiError> {
    let Json(req) = payload.map_err(body_rejection)?;
    let before_ms = req
        .before_ms
        .ok_or_else(|| ApiError::bad_request("missing_before_ms", "missing beforeMs"))?;

    let deleted = state.queue.purge_before(before_ms)?;
    let stats_after = state.queue.stats()?;
    Ok(Json(PurgeResponse {
        ok: true,
        before_ms,
        deleted,
        stats_after: stats_after.into_iter().map(Into::into).collect(),
    }))
}
