//! Staff sign-in with one-time codes sent to a linked chat.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use domain::User;
use serde::{Deserialize, Serialize};

use super::MessageResponse;
use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeRequest {
    pub telegram_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub telegram_id: i64,
    pub code: String,
}

/// The bearer token for back-office routes, handed to verified staff.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

/// POST /auth/otp/request: Send a login code to the user's chat.
#[tracing::instrument(skip(state, payload))]
pub async fn request_code(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CodeRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = payload?;
    state.login.request_code(request.telegram_id).await?;
    Ok(Json(MessageResponse {
        message: "Login code sent",
    }))
}

/// POST /auth/otp/verify: Trade a valid code for the staff token.
#[tracing::instrument(skip(state, payload))]
pub async fn verify_code(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiError> {
    let Json(request) = payload?;
    let token = state
        .config
        .auth_secret
        .clone()
        .ok_or_else(|| ApiError::Internal("AUTH_SECRET is not configured".to_string()))?;

    let user = state
        .login
        .verify_code(request.telegram_id, &request.code)
        .await?;
    Ok(Json(SessionResponse { token, user }))
}
