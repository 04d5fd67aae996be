//! Bearer-token check for back-office routes.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::AppState;
use crate::error::ApiError;

const BEARER_PREFIX: &str = "Bearer ";

/// Checks the `Authorization` header against the configured secret.
///
/// Without a secret no token is ever accepted.
pub fn authorize(headers: &HeaderMap, secret: Option<&str>) -> Result<(), ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::Unauthorized("Authorization header is required"))?;

    let token = header.strip_prefix(BEARER_PREFIX).ok_or(ApiError::Unauthorized(
        "Invalid authorization format. Use 'Bearer <token>'",
    ))?;

    match secret {
        Some(secret) if token == secret => Ok(()),
        _ => Err(ApiError::Unauthorized("Invalid authorization token")),
    }
}

/// True when the request carries a valid token. Used by public routes that
/// show more to staff.
pub fn is_staff(headers: &HeaderMap, state: &AppState) -> bool {
    authorize(headers, state.config.auth_secret.as_deref()).is_ok()
}

/// Middleware rejecting requests without a valid bearer token.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Err(err) = authorize(request.headers(), state.config.auth_secret.as_deref()) {
        metrics::counter!("unauthorized_requests_total").increment(1);
        tracing::warn!(path = %request.uri().path(), "unauthorized request");
        return Err(err);
    }
    Ok(next.run(request).await)
}
