//! Catalog products and their variants.

mod input;
mod model;

pub use input::{NewProduct, NewVariant, ProductUpdate, VariantUpdate};
pub use model::{CaviarDetails, Product, ShelfLife, TemperatureRange, Variant};

use common::{ErrorKind, VariantId};
use thiserror::Error;

/// Reasons a product payload is rejected.
///
/// Variant positions are 0-based, as they index the submitted list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("slug is required")]
    SlugRequired,

    #[error("name is required")]
    NameRequired,

    #[error("subtitle is required")]
    SubtitleRequired,

    #[error("at least one variant is required")]
    VariantsRequired,

    #[error("variant mass must be > 0 (index {index})")]
    InvalidMass { index: usize },

    #[error("variant stock cannot be negative (index {index})")]
    NegativeStock { index: usize },

    #[error("variant must have at least one price (index {index})")]
    PricesRequired { index: usize },

    #[error("price amount must be > 0 for region {region}")]
    InvalidPrice { region: String },

    #[error("currency is required for region {region}")]
    CurrencyRequired { region: String },

    #[error("{field} is required in details")]
    DetailRequired { field: &'static str },

    #[error("shelf life duration is required")]
    ShelfLifeRequired,

    #[error("variant {id} does not belong to this product")]
    UnknownVariant { id: VariantId },
}

impl ProductError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProductError::UnknownVariant { .. } => ErrorKind::NotFound,
            _ => ErrorKind::InvalidInput,
        }
    }
}
