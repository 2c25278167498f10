//! REST API handlers for the task server
//!
//! This module defines the API routes and handlers.

use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::metrics;
use crate::models::Task;
use crate::storage::StoreError;

use super::error::RestartOutcome;
use super::restart::parse_task_id;
use super::server::AppState;

// ============================================================================
// API Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub restarts_in_flight: usize,
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/tasks/{id}", get(get_task))
        .route("/api/tasks/{id}/restart", post(restart_task))
        .route("/metrics", get(metrics_endpoint))
        .fallback(fallback)
        .with_state(state)
}

fn status_from(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        restarts_in_flight: state.coordinator.lock().held_count(),
    }))
}

/// Get a single task
async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let task_id = match parse_task_id(&id) {
        Ok(task_id) => task_id,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(ApiResponse::<Task>::error(e.to_string())))
                .into_response();
        }
    };

    match state.store.load_by_id(task_id).await {
        Ok(task) => (StatusCode::OK, Json(ApiResponse::success(task))).into_response(),
        Err(StoreError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<Task>::error(format!("Task not found: {}", task_id))),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(task_id = %task_id, error = %e, "Failed to load task");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<Task>::error("Failed to load task")),
            )
                .into_response()
        }
    }
}

/// Restart a stopped recurring task
///
/// Plain-text body: `success`, the conflict message, the rejection reason
/// for a bad request, or empty for a server error.
async fn restart_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    respond_to_restart(&state, &id).await
}

async fn respond_to_restart(state: &AppState, id: &str) -> Response {
    let started = Instant::now();
    let outcome = state.coordinator.restart_raw(id).await;
    let code = outcome.status_code();

    metrics::record_api_request(
        "/api/tasks/{id}/restart",
        code,
        started.elapsed().as_secs_f64(),
    );

    let body = match &outcome {
        RestartOutcome::InternalError(_) => String::new(),
        other => other.message().to_string(),
    };

    (status_from(code), body).into_response()
}

/// Unmatched requests
///
/// `/api/tasks//restart` carries an empty id, which the `{id}` route cannot
/// capture; it is rejected like any other malformed id.
async fn fallback(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    if method == Method::POST && uri.path() == "/api/tasks//restart" {
        return respond_to_restart(&state, "").await;
    }
    StatusCode::NOT_FOUND.into_response()
}

/// Prometheus text exposition
async fn metrics_endpoint() -> Response {
    match metrics::encode_metrics() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
