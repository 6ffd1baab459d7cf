//! HTTP API request and response types.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::Config;
use crate::queue::types::{Job, JobKind, JobStatus, LeasedJob, StatusCount};
use crate::queue::{JobQueue, QueueError};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<JobQueue>,
    pub config: Arc<Config>,
}

/// Request id, echoed from the incoming header or freshly generated.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

// ============== Requests ==============

/// Enqueue request body. `id` and `createdAt` are producer-assigned when
/// present; otherwise the adapter generates them.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub target: String,
    /// Kept as raw JSON so a non-numeric value falls back to the default
    /// instead of rejecting the body.
    #[serde(default)]
    pub max_attempts: Option<Value>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

#[derive(Deserialize)]
pub struct CompleteRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
}

#[derive(Deserialize)]
pub struct FailRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct GetQuery {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeRequest {
    #[serde(default)]
    pub before_ms: Option<i64>,
}

// ============== Responses ==============

/// Full job view with ISO-8601 companions for every epoch-ms timestamp and
/// the result deserialized back from its stored encoding.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: JobKind,
    pub target: String,
    pub created_at: i64,
    pub created_at_iso: Option<String>,
    pub status: JobStatus,
    pub updated_at: Option<i64>,
    pub updated_at_iso: Option<String>,
    pub lease_until: Option<i64>,
    pub lease_until_iso: Option<String>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub next_run_at: Option<i64>,
    pub next_run_at_iso: Option<String>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub sort_at: i64,
    pub sort_at_iso: Option<String>,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        Self {
            created_at_iso: iso(job.created_at),
            updated_at_iso: job.updated_at.and_then(iso),
            lease_until_iso: job.lease_until.and_then(iso),
            next_run_at_iso: job.next_run_at.and_then(iso),
            sort_at_iso: iso(job.sort_at),
            // Stored results are JSON text; anything that no longer parses
            // is surfaced as the raw string.
            result: job
                .result
                .map(|raw| serde_json::from_str(&raw).unwrap_or(Value::String(raw))),
            id: job.id,
            kind: job.kind,
            target: job.target,
            created_at: job.created_at,
            status: job.status,
            updated_at: job.updated_at,
            lease_until: job.lease_until,
            attempts: job.attempts,
            max_attempts: job.max_attempts,
            next_run_at: job.next_run_at,
            error: job.error,
            sort_at: job.sort_at,
        }
    }
}

/// The dequeue response's job payload: just what a consumer needs to run it.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeasedJobView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: JobKind,
    pub target: String,
    pub created_at: i64,
}

impl From<&LeasedJob> for LeasedJobView {
    fn from(job: &LeasedJob) -> Self {
        Self {
            id: job.id.clone(),
            kind: job.kind,
            target: job.target.clone(),
            created_at: job.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct EnqueueResponse {
    pub ok: bool,
    pub accepted: bool,
    pub job: JobView,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DequeueResponse {
    pub ok: bool,
    pub job: Option<LeasedJobView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_until: Option<i64>,
}

#[derive(Serialize)]
pub struct CompleteResponse {
    pub ok: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailResponse {
    pub ok: bool,
    pub retried: bool,
    pub attempts: u32,
    pub max_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run_at: Option<i64>,
}

#[derive(Serialize)]
pub struct GetResponse {
    pub ok: bool,
    pub job: Option<JobView>,
}

#[derive(Serialize)]
pub struct StatusCountView {
    pub status: JobStatus,
    pub count: u64,
}

impl From<StatusCount> for StatusCountView {
    fn from(row: StatusCount) -> Self {
        Self {
            status: row.status,
            count: row.count,
        }
    }
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub ok: bool,
    pub stats: Vec<StatusCountView>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub ok: bool,
    pub items: Vec<JobView>,
    pub next_cursor: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeResponse {
    pub ok: bool,
    pub before_ms: i64,
    pub deleted: u64,
    pub stats_after: Vec<StatusCountView>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub env: String,
    pub request_id: String,
}

// ============== Errors ==============

/// API error with a machine-readable code, rendered as
/// `{ok: false, error: <code>, message: <detail>}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid bearer token",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "ok": false,
                "error": self.code,
                "message": self.message,
            })),
        )
            .into_response()
    }
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::InvalidPayload(msg) => Self::bad_request("invalid_body", msg),
            QueueError::Conflict(id) => Self::new(
                StatusCode::CONFLICT,
                "conflict",
                format!("job {id} already exists"),
            ),
            QueueError::NotFound(id) => Self::new(
                StatusCode::NOT_FOUND,
                "not_found",
                format!("job {id} not found"),
            ),
            QueueError::Storage(e) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                e.to_string(),
            ),
        }
    }
}

/// Map a body extraction failure: malformed JSON is `invalid_json`, a
/// well-formed body of the wrong shape is `invalid_body`.
pub fn body_rejection(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(e) => ApiError::bad_request("invalid_body", e.to_string()),
        other => ApiError::bad_request("invalid_json", other.to_string()),
    }
}

fn iso(ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}
