//! Workflow error types.

use common::ErrorKind;
use domain::{DomainError, OrderError, ProductError};
use store::StoreError;
use thiserror::Error;

use crate::notification::Channel;

/// Errors raised while running order, catalog or notification workflows.
///
/// Item numbers are 1-based positions in the submitted cart.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("product not found for item {item} (product_id: {product_id})")]
    ProductNotFound { item: usize, product_id: String },

    #[error("product is not active for item {item}")]
    ProductInactive { item: usize },

    #[error("variant not found for item {item} (variant_id: {variant_id})")]
    VariantNotFound { item: usize, variant_id: String },

    #[error("insufficient stock for item {item}: requested {requested}, available {available}")]
    InsufficientStock {
        item: usize,
        requested: i32,
        available: i32,
    },

    /// The cart or product payload broke a domain rule.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The channel is part of the vocabulary but has no transport.
    #[error("{} notifications not implemented", .0.label())]
    ChannelNotImplemented(Channel),

    /// The chat service refused a message.
    #[error("chat {chat_id} rejected the message: {reason}")]
    ChatRejected { chat_id: i64, reason: String },

    #[error("chat request failed: {0}")]
    ChatTransport(#[from] reqwest::Error),

    #[error("chat channel is not configured")]
    ChatUnavailable,

    #[error("no user is linked to chat {chat_id}")]
    UnknownChat { chat_id: i64 },

    #[error("invalid OTP code")]
    InvalidCode,

    /// A background step panicked or was aborted.
    #[error("workflow task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::ProductNotFound { .. }
            | WorkflowError::VariantNotFound { .. }
            | WorkflowError::UnknownChat { .. } => ErrorKind::NotFound,
            WorkflowError::ProductInactive { .. } | WorkflowError::InsufficientStock { .. } => {
                ErrorKind::InvalidInput
            }
            WorkflowError::Domain(err) => err.kind(),
            WorkflowError::Store(err) => err.kind(),
            WorkflowError::InvalidCode => ErrorKind::Unauthorized,
            WorkflowError::ChannelNotImplemented(_)
            | WorkflowError::ChatRejected { .. }
            | WorkflowError::ChatTransport(_)
            | WorkflowError::ChatUnavailable
            | WorkflowError::Task(_) => ErrorKind::Internal,
        }
    }
}

impl From<OrderError> for WorkflowError {
    fn from(err: OrderError) -> Self {
        WorkflowError::Domain(err.into())
    }
}

impl From<ProductError> for WorkflowError {
    fn from(err: ProductError) -> Self {
        WorkflowError::Domain(err.into())
    }
}

/// Convenience type alias for workflow results.
pub type Result<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_validation_messages() {
        let err = WorkflowError::InsufficientStock {
            item: 1,
            requested: 5,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for item 1: requested 5, available 3"
        );
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = WorkflowError::ProductNotFound {
            item: 2,
            product_id: "abc".into(),
        };
        assert_eq!(err.to_string(), "product not found for item 2 (product_id: abc)");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn wrapped_errors_keep_their_kind() {
        let err = WorkflowError::from(OrderError::EmptyCart);
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = WorkflowError::from(StoreError::not_found("order", "x"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn unimplemented_channels_are_named() {
        assert_eq!(
            WorkflowError::ChannelNotImplemented(Channel::Email).to_string(),
            "email notifications not implemented"
        );
        assert_eq!(
            WorkflowError::ChannelNotImplemented(Channel::Sms).to_string(),
            "SMS notifications not implemented"
        );
    }
}
