//! HTTP handlers, one module per resource.

pub mod auth;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;

use std::str::FromStr;

use serde::Serialize;

use crate::error::ApiError;

/// Plain acknowledgement body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Parses a path identifier, naming the resource in the error.
pub(crate) fn parse_id<T: FromStr>(raw: &str, resource: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid {resource} ID: {raw}")))
}
