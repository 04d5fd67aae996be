//! Unvalidated cart payloads as submitted by a customer.
//!
//! Every field defaults when absent so that a sparse payload reaches
//! [`Order::from_cart`](super::Order::from_cart) and is rejected with a
//! precise message instead of a generic decoding error.

use common::Money;
use serde::{Deserialize, Serialize};

/// A cart submitted for checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewOrder {
    pub customer_info: CustomerInfoInput,
    pub delivery_info: DeliveryInfoInput,
    pub items: Vec<CartItem>,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerInfoInput {
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeliveryInfoInput {
    #[serde(rename = "type")]
    pub delivery_type: String,
    pub country: String,
    pub city: String,
    pub address: String,
    pub post_office: String,
    pub instructions: String,
}

/// One cart line. Identifiers stay textual until validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CartItem {
    pub product_id: String,
    pub variant_id: String,
    pub quantity: i32,
    pub unit_price: Money,
}

impl Default for CartItem {
    fn default() -> Self {
        Self {
            product_id: String::new(),
            variant_id: String::new(),
            quantity: 0,
            unit_price: Money::zero(""),
        }
    }
}

impl CartItem {
    pub fn new(
        product_id: impl ToString,
        variant_id: impl ToString,
        quantity: i32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id: product_id.to_string(),
            variant_id: variant_id.to_string(),
            quantity,
            unit_price,
        }
    }
}
