//! API error types with HTTP response mapping.
//!
//! Every failure leaves the server as
//! `{"error": {"code", "message", "details"?}}`. Handlers never decide
//! whether `details` is shown: [`ApiError`] stashes the full body in the
//! response extensions and [`expose_details`] writes it back unless the
//! server runs in production mode.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::ErrorKind;
use serde::Serialize;
use workflow::WorkflowError;

use crate::AppState;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request: bad JSON, bad path id, bad query value.
    BadRequest(String),
    /// Missing or wrong bearer token.
    Unauthorized(&'static str),
    /// Resource not found.
    NotFound(String),
    /// Anything raised by a workflow.
    Workflow(WorkflowError),
    /// Internal server error.
    Internal(String),
}

/// The `error` member of the response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Serialize)]
struct Envelope<'a> {
    error: &'a ErrorBody,
}

impl ApiError {
    fn kind(&self) -> ErrorKind {
        match self {
            ApiError::BadRequest(_) => ErrorKind::InvalidInput,
            ApiError::Unauthorized(_) => ErrorKind::Unauthorized,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Workflow(err) => err.kind(),
            ApiError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        status_for(self.kind())
    }

    /// Builds the full body, details included.
    pub fn body(&self) -> ErrorBody {
        let code = self.kind().code();
        match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => ErrorBody {
                code,
                message: msg.clone(),
                details: None,
            },
            ApiError::Unauthorized(msg) => ErrorBody {
                code,
                message: (*msg).to_string(),
                details: None,
            },
            ApiError::Workflow(err) if err.kind() == ErrorKind::Internal => ErrorBody {
                code,
                message: "Internal server error".to_string(),
                details: Some(err.to_string()),
            },
            ApiError::Workflow(err) => ErrorBody {
                code,
                message: err.to_string(),
                details: None,
            },
            ApiError::Internal(msg) => ErrorBody {
                code,
                message: "Internal server error".to_string(),
                details: Some(msg.clone()),
            },
        }
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn envelope_response(status: StatusCode, body: &ErrorBody) -> Response {
    (status, Json(Envelope { error: body })).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();

        if status.is_server_error() {
            tracing::error!(
                code = body.code,
                details = body.details.as_deref().unwrap_or_default(),
                "internal server error"
            );
        } else {
            tracing::debug!(code = body.code, message = %body.message, "request rejected");
        }

        let public = ErrorBody {
            details: None,
            ..body.clone()
        };
        let mut response = envelope_response(status, &public);
        response.extensions_mut().insert(body);
        response
    }
}

/// Response middleware restoring error details outside production.
pub async fn expose_details(State(state): State<Arc<AppState>>, mut response: Response) -> Response {
    let Some(body) = response.extensions_mut().remove::<ErrorBody>() else {
        return response;
    };
    if state.config.is_prod || body.details.is_none() {
        return response;
    }
    envelope_response(response.status(), &body)
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        ApiError::Workflow(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
