use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{Money, ProductId, VariantId};
use serde::{Deserialize, Serialize};

/// A catalog product. Owns its variants; deleting a product deletes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub subtitle: String,
    #[serde(default)]
    pub description: String,
    pub variants: Vec<Variant>,
    pub details: CaviarDetails,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn variant(&self, variant_id: VariantId) -> Option<&Variant> {
        self.variants.iter().find(|variant| variant.id == variant_id)
    }

    pub fn variant_mut(&mut self, variant_id: VariantId) -> Option<&mut Variant> {
        self.variants
            .iter_mut()
            .find(|variant| variant.id == variant_id)
    }

    /// Sum of stock across all variants.
    pub fn total_stock(&self) -> i64 {
        self.variants
            .iter()
            .map(|variant| i64::from(variant.stock))
            .sum()
    }
}

/// A purchasable package size of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    /// Net mass in grams.
    pub mass: i32,
    /// Units on hand. Only changed by relative deltas once created.
    pub stock: i32,
    /// Region code to price.
    pub prices: BTreeMap<String, Money>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Variant {
    pub fn price_for(&self, region: &str) -> Option<&Money> {
        self.prices.get(region)
    }

    pub fn has_stock(&self, quantity: i32) -> bool {
        self.stock >= quantity
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaviarDetails {
    pub fish_age: String,
    pub grain_size: String,
    pub color: String,
    pub taste: String,
    pub texture: String,
    pub shelf_life: ShelfLife,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShelfLife {
    pub duration: String,
    pub temp_range: TemperatureRange,
}

/// Storage temperature bounds in degrees Celsius.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemperatureRange {
    pub min_c: f64,
    pub max_c: f64,
}
