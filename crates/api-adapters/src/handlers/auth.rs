//! `/api/auth`

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use domains::{AppError, UserId};
use serde::{Deserialize, Serialize};
use services::{LoginUser, RegisterUser};

use crate::error::ApiError;
use crate::metrics::{AuthKind, AuthOutcome};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    pub user: UserView,
}

fn outcome<T>(result: &Result<T, AppError>) -> AuthOutcome {
    match result {
        Ok(_) => AuthOutcome::Success,
        Err(AppError::Validation(_) | AppError::Unauthorized(_) | AppError::Conflict(_)) => {
            AuthOutcome::Rejected
        }
        Err(_) => AuthOutcome::Error,
    }
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Json(request) = payload?;

    let result = state
        .auth
        .register(RegisterUser {
            username: request.username,
            email: request.email,
            password: request.password,
        })
        .await;
    state.metrics.auth_attempt(AuthKind::Register, outcome(&result));

    let user = result?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully",
            user_id: user.id,
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;

    let result = state
        .auth
        .login(LoginUser {
            email: request.email,
            password: request.password,
        })
        .await;
    state.metrics.auth_attempt(AuthKind::Login, outcome(&result));

    let logged_in = result?;
    Ok(Json(LoginResponse {
        message: "Login successful",
        token: logged_in.token,
        user: UserView {
            id: logged_in.user.id,
            username: logged_in.user.username,
        },
    }))
}
