//! Liveness and metrics endpoints.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub activity_log: &'static str,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    let activity_log = match &state.activity_log {
        None => "disabled",
        Some(log) if log.is_ready() => "ready",
        Some(_) => "unavailable",
    };
    Json(Health {
        status: "ok",
        activity_log,
    })
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(
                header::CONTENT_TYPE,
                "application/openmetrics-text; version=1.0.0; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
