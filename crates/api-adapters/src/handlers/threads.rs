//! `/api/threads`

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use domains::{ThreadCreationError, ThreadId, ThreadSummary};
use serde::{Deserialize, Serialize};
use services::CreateThread;

use crate::error::ApiError;
use crate::extract::ClientIp;
use crate::metrics::ThreadOutcome;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateThreadRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub user_id: Option<i64>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateThreadResponse {
    pub message: &'static str,
    pub thread_id: ThreadId,
}

/// GET /api/threads — every thread, newest first.
pub async fn list_threads(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
) -> Result<Json<Vec<ThreadSummary>>, ApiError> {
    let threads = state
        .threads
        .list_threads(&ip)
        .await
        .map_err(ApiError::ListThreads)?;
    Ok(Json(threads))
}

/// POST /api/threads — a thread and its original post, or neither.
pub async fn create_thread(
    State(state): State<AppState>,
    payload: Result<Json<CreateThreadRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateThreadResponse>), ApiError> {
    let Json(request) = payload.inspect_err(|_| state.metrics.thread_creation(ThreadOutcome::Invalid))?;

    let result = state
        .threads
        .create_thread(CreateThread {
            title: request.title,
            content: request.content,
            user_id: request.user_id,
            category_id: request.category_id,
        })
        .await;

    state.metrics.thread_creation(match &result {
        Ok(_) => ThreadOutcome::Created,
        Err(ThreadCreationError::Invalid(_)) => ThreadOutcome::Invalid,
        Err(ThreadCreationError::ThreadInsert { .. }) => ThreadOutcome::ThreadInsertFailed,
        Err(e) if e.is_orphan() => ThreadOutcome::Orphaned,
        Err(_) => ThreadOutcome::Compensated,
    });

    let created = result?;
    Ok((
        StatusCode::CREATED,
        Json(CreateThreadResponse {
            message: "Thread and original post created successfully",
            thread_id: created.thread_id(),
        }),
    ))
}
