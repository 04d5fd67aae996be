//! Shared building blocks for the shop backend.
//!
//! Everything here is plain data: strongly typed identifiers, the [`Money`]
//! value type and the [`ErrorKind`] discriminant every crate maps its errors to.

pub mod error;
pub mod money;
pub mod types;

pub use error::ErrorKind;
pub use money::Money;
pub use types::{IdParseError, OrderId, OrderItemId, ProductId, UserId, VariantId};
