//! Domain layer for the caviar shop.
//!
//! This crate holds the pure parts of the system:
//! - Product catalog records and their validation rules
//! - The order aggregate, built from a customer cart by [`Order::from_cart`]
//! - The order status vocabulary and its transition table
//! - Back-office users that receive order notifications
//!
//! Nothing in here performs I/O; stores and workflows live in other crates.

pub mod error;
pub mod order;
pub mod product;
pub mod user;

pub use common::{Money, OrderId, OrderItemId, ProductId, UserId, VariantId};
pub use error::DomainError;
pub use order::{
    CartItem, CustomerInfo, CustomerInfoInput, DeliveryInfo, DeliveryInfoInput, DeliveryType,
    NewOrder, Order, OrderError, OrderItem, OrderParts, OrderStatus, generate_order_number,
};
pub use product::{
    CaviarDetails, NewProduct, NewVariant, Product, ProductError, ProductUpdate, ShelfLife,
    TemperatureRange, Variant, VariantUpdate,
};
pub use user::User;
