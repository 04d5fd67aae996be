//! Order aggregate and related types.

mod aggregate;
mod cart;
mod number;
mod status;
mod value_objects;

pub use aggregate::{Order, OrderItem, OrderParts};
pub use cart::{CartItem, CustomerInfoInput, DeliveryInfoInput, NewOrder};
pub use number::generate_order_number;
pub use status::OrderStatus;
pub use value_objects::{CustomerInfo, DeliveryInfo, DeliveryType};

use common::ErrorKind;
use thiserror::Error;

/// Reasons a cart or status value is rejected.
///
/// Item positions are 1-based, matching what a customer sees in their cart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("order must contain at least one item")]
    EmptyCart,

    #[error("phone number is required")]
    PhoneRequired,

    #[error("either full name or both first and last name are required")]
    NameRequired,

    #[error("country is required")]
    CountryRequired,

    #[error("city is required")]
    CityRequired,

    #[error("post office is required for post office delivery")]
    PostOfficeRequired,

    #[error("address is required for {delivery} delivery")]
    AddressRequired { delivery: DeliveryType },

    #[error("invalid delivery type")]
    InvalidDeliveryType,

    #[error("product ID is required for item {item}")]
    ProductIdRequired { item: usize },

    #[error("invalid product ID for item {item}")]
    InvalidProductId { item: usize },

    #[error("variant ID is required for item {item}")]
    VariantIdRequired { item: usize },

    #[error("invalid variant ID for item {item}")]
    InvalidVariantId { item: usize },

    #[error("quantity must be greater than 0 for item {item}")]
    InvalidQuantity { item: usize },

    #[error("unit price must be greater than 0 for item {item}")]
    InvalidUnitPrice { item: usize },

    #[error("currency is required for item {item}")]
    CurrencyRequired { item: usize },

    #[error("all items must have the same currency")]
    CurrencyMismatch,

    #[error("order total is too large for item {item}")]
    TotalOverflow { item: usize },

    #[error("invalid order status: {status}")]
    InvalidStatus { status: String },
}

impl OrderError {
    /// Every cart rejection is an input problem.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}
