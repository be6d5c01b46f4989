//! # API Errors
//!
//! Maps service failures onto HTTP status codes and `{error, details}` bodies.
//! Store messages are passed through as `details`; nothing else internal is.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::{AppError, StoreError, ThreadCreationError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Body was not valid JSON or had wrongly typed fields
    #[error("Invalid request body: {0}")]
    MalformedBody(#[from] JsonRejection),

    /// Reading the thread listing failed
    #[error("Failed to fetch threads from database.")]
    ListThreads(#[source] StoreError),

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<ThreadCreationError> for ApiError {
    fn from(err: ThreadCreationError) -> Self {
        ApiError::App(AppError::ThreadCreation(err))
    }
}

/// Error response body
#[derive(Debug, Serialize, Default)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compensated: Option<bool>,
}

impl ErrorBody {
    fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Default::default()
        }
    }

    fn with_details(error: impl Into<String>, details: impl ToString) -> Self {
        Self {
            error: error.into(),
            details: Some(details.to_string()),
            ..Default::default()
        }
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, ErrorBody) {
        match self {
            ApiError::MalformedBody(rejection) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::with_details("Invalid request body.", rejection.body_text()),
            ),
            ApiError::ListThreads(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::message("Failed to fetch threads from database."),
            ),
            ApiError::App(app) => app_parts(app),
        }
    }
}

fn app_parts(err: &AppError) -> (StatusCode, ErrorBody) {
    match err {
        AppError::Validation(msg) => (StatusCode::BAD_REQUEST, ErrorBody::message(msg.clone())),
        AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, ErrorBody::message(msg.clone())),
        AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorBody::message(msg.clone())),
        AppError::ThreadCreation(err) => thread_creation_parts(err),
        AppError::Store(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::with_details("Database request failed.", e),
        ),
        AppError::Auth(_) | AppError::Internal(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::message("Internal server error."),
        ),
    }
}

fn thread_creation_parts(err: &ThreadCreationError) -> (StatusCode, ErrorBody) {
    match err {
        ThreadCreationError::Invalid(msg) => {
            (StatusCode::BAD_REQUEST, ErrorBody::message(msg.clone()))
        }
        ThreadCreationError::ThreadInsert { source } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody {
                phase: Some("thread"),
                ..ErrorBody::with_details("Failed to create thread.", source)
            },
        ),
        ThreadCreationError::PostInsert {
            source,
            compensated,
            ..
        } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody {
                phase: Some("post"),
                compensated: Some(*compensated),
                ..ErrorBody::with_details("Failed to create original post.", source)
            },
        ),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.parts();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        }
        (status, Json(body)).into_response()
    }
}
