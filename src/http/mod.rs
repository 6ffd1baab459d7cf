//! HTTP surface of the queue.
//!
//! One path per engine or inspector operation, all bearer-authenticated
//! except `/health`. Every response carries `x-request-id`, echoing the
//! incoming header or a freshly generated UUID.

mod jobs;
mod types;


use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use uuid::Uuid;

pub use types::{ApiError, AppState, RequestId};

use types::HealthResponse;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Create the HTTP router with all API routes.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/v1/jobs/enqueue", post(jobs::enqueue))
        .route("/v1/jobs/dequeue", post(jobs::dequeue))
        .route("/v1/jobs/complete", post(jobs::complete))
        .route("/v1/jobs/fail", post(jobs::fail))
        .route("/v1/jobs/get", get(jobs::get_job))
        .route("/v1/jobs/stats", get(jobs::stats))
        .route("/v1/jobs/list", get(jobs::list))
        .route("/v1/jobs/purge", post(jobs::purge))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(protected)
        .route("/health", get(health))
        .fallback(unknown_path)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn(request_id))
        .with_state(state)
}

/// Attach a request id to the request extensions and the response headers.
async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Reject requests without the expected bearer token.
async fn require_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    match token {
        Some(token) if token == state.config.api_token => Ok(next.run(req).await),
        _ => Err(ApiError::unauthorized()),
    }
}

/// Liveness probe; the only unauthenticated route.
async fn health(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        service: env!("CARGO_PKG_NAME"),
        env: state.config.environment.clone(),
        request_id,
    })
}

async fn unknown_path() -> Response {
    ApiError::new(StatusCode::NOT_FOUND, "not_found", "unknown path").into_response()
}

async fn method_not_allowed() -> Response {
    ApiError::new(
        StatusCode::METHOD_NOT_ALLOWED,
        "method_not_allowed",
        "method not allowed for this path",
    )
    .into_response()
}
