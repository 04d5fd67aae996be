//! Domain error types.

use common::ErrorKind;
use thiserror::Error;

use crate::order::OrderError;
use crate::product::ProductError;

/// Errors raised by the pure domain layer.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The cart or an order mutation was rejected.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// A product payload was rejected.
    #[error(transparent)]
    Product(#[from] ProductError),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Order(err) => err.kind(),
            DomainError::Product(err) => err.kind(),
        }
    }
}
