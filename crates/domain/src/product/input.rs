//! Product payloads from the back office and the rules applied to them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{Money, ProductId, VariantId};
use serde::{Deserialize, Serialize};

use super::{CaviarDetails, Product, ProductError, Variant};

/// Payload for creating a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewProduct {
    pub slug: String,
    pub name: String,
    pub subtitle: String,
    pub description: String,
    pub variants: Vec<NewVariant>,
    pub details: CaviarDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewVariant {
    pub mass: i32,
    pub stock: i32,
    pub prices: BTreeMap<String, Money>,
}

/// Partial update of a product. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductUpdate {
    pub slug: Option<String>,
    pub name: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub details: Option<CaviarDetails>,
    /// Variants with an id replace that variant's fields; variants without one are added.
    /// Variants not listed are kept.
    pub variants: Option<Vec<VariantUpdate>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VariantUpdate {
    pub id: Option<VariantId>,
    pub mass: i32,
    pub stock: i32,
    pub prices: BTreeMap<String, Money>,
}

impl CaviarDetails {
    pub fn validate(&self) -> Result<(), ProductError> {
        let required = [
            ("fish age", &self.fish_age),
            ("grain size", &self.grain_size),
            ("color", &self.color),
            ("taste", &self.taste),
            ("texture", &self.texture),
        ];
        if let Some((field, _)) = required
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
        {
            return Err(ProductError::DetailRequired { field });
        }
        if self.shelf_life.duration.trim().is_empty() {
            return Err(ProductError::ShelfLifeRequired);
        }
        Ok(())
    }
}

fn validate_variant(
    index: usize,
    mass: i32,
    stock: i32,
    prices: &BTreeMap<String, Money>,
) -> Result<(), ProductError> {
    if mass <= 0 {
        return Err(ProductError::InvalidMass { index });
    }
    if stock < 0 {
        return Err(ProductError::NegativeStock { index });
    }
    if prices.is_empty() {
        return Err(ProductError::PricesRequired { index });
    }
    for (region, price) in prices {
        if !price.is_positive() {
            return Err(ProductError::InvalidPrice {
                region: region.clone(),
            });
        }
        if price.currency.trim().is_empty() {
            return Err(ProductError::CurrencyRequired {
                region: region.clone(),
            });
        }
    }
    Ok(())
}

fn require(value: &str, err: ProductError) -> Result<(), ProductError> {
    if value.trim().is_empty() {
        Err(err)
    } else {
        Ok(())
    }
}

impl Product {
    /// Validates a payload and builds an inactive product.
    pub fn create(input: NewProduct, now: DateTime<Utc>) -> Result<Self, ProductError> {
        require(&input.slug, ProductError::SlugRequired)?;
        require(&input.name, ProductError::NameRequired)?;
        require(&input.subtitle, ProductError::SubtitleRequired)?;
        if input.variants.is_empty() {
            return Err(ProductError::VariantsRequired);
        }
        for (index, variant) in input.variants.iter().enumerate() {
            validate_variant(index, variant.mass, variant.stock, &variant.prices)?;
        }
        input.details.validate()?;

        let id = ProductId::new();
        let variants = input
            .variants
            .into_iter()
            .map(|variant| Variant {
                id: VariantId::new(),
                product_id: id,
                mass: variant.mass,
                stock: variant.stock,
                prices: variant.prices,
                created_at: now,
                updated_at: now,
            })
            .collect();

        Ok(Self {
            id,
            slug: input.slug,
            name: input.name,
            subtitle: input.subtitle,
            description: input.description,
            variants,
            details: input.details,
            is_active: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a partial update. Nothing changes if any part is invalid.
    pub fn apply_update(
        &mut self,
        update: ProductUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), ProductError> {
        if let Some(slug) = &update.slug {
            require(slug, ProductError::SlugRequired)?;
        }
        if let Some(name) = &update.name {
            require(name, ProductError::NameRequired)?;
        }
        if let Some(subtitle) = &update.subtitle {
            require(subtitle, ProductError::SubtitleRequired)?;
        }
        if let Some(details) = &update.details {
            details.validate()?;
        }
        if let Some(variants) = &update.variants {
            for (index, variant) in variants.iter().enumerate() {
                validate_variant(index, variant.mass, variant.stock, &variant.prices)?;
                if let Some(id) = variant.id
                    && self.variant(id).is_none()
                {
                    return Err(ProductError::UnknownVariant { id });
                }
            }
        }

        if let Some(slug) = update.slug {
            self.slug = slug;
        }
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(subtitle) = update.subtitle {
            self.subtitle = subtitle;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(details) = update.details {
            self.details = details;
        }
        for change in update.variants.unwrap_or_default() {
            match change.id.and_then(|id| self.variant_mut(id)) {
                Some(variant) => {
                    variant.mass = change.mass;
                    variant.stock = change.stock;
                    variant.prices = change.prices;
                    variant.updated_at = now;
                }
                None => self.variants.push(Variant {
                    id: VariantId::new(),
                    product_id: self.id,
                    mass: change.mass,
                    stock: change.stock,
                    prices: change.prices,
                    created_at: now,
                    updated_at: now,
                }),
            }
        }
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{ShelfLife, TemperatureRange};

    fn details() -> CaviarDetails {
        CaviarDetails {
            fish_age: "8 years".into(),
            grain_size: "3 mm".into(),
            color: "dark grey".into(),
            taste: "nutty".into(),
            texture: "firm".into(),
            shelf_life: ShelfLife {
                duration: "6 months".into(),
                temp_range: TemperatureRange {
                    min_c: -4.0,
                    max_c: 2.0,
                },
            },
        }
    }

    fn variant(mass: i32, stock: i32) -> NewVariant {
        NewVariant {
            mass,
            stock,
            prices: BTreeMap::from([("ua".to_string(), Money::new(250_000, "UAH"))]),
        }
    }

    fn payload() -> NewProduct {
        NewProduct {
            slug: "sturgeon-classic".into(),
            name: "Sturgeon caviar".into(),
            subtitle: "Classic".into(),
            description: String::new(),
            variants: vec![variant(50, 10), variant(100, 4)],
            details: details(),
        }
    }

    #[test]
    fn created_products_start_inactive() {
        let product = Product::create(payload(), Utc::now()).unwrap();
        assert!(!product.is_active);
        assert_eq!(product.variants.len(), 2);
        assert!(product.variants.iter().all(|v| v.product_id == product.id));
        assert_eq!(product.total_stock(), 14);
    }

    #[test]
    fn rejects_missing_fields_in_order() {
        let mut input = payload();
        input.slug.clear();
        input.name.clear();
        assert_eq!(
            Product::create(input, Utc::now()).unwrap_err(),
            ProductError::SlugRequired
        );
    }

    #[test]
    fn rejects_bad_variants() {
        let mut input = payload();
        input.variants = vec![];
        assert_eq!(
            Product::create(input, Utc::now()).unwrap_err(),
            ProductError::VariantsRequired
        );

        let mut input = payload();
        input.variants[1].mass = 0;
        let err = Product::create(input, Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "variant mass must be > 0 (index 1)");

        let mut input = payload();
        input.variants[0].stock = -1;
        assert_eq!(
            Product::create(input, Utc::now()).unwrap_err(),
            ProductError::NegativeStock { index: 0 }
        );

        let mut input = payload();
        input.variants[0]
            .prices
            .insert("eu".into(), Money::new(100, ""));
        let err = Product::create(input, Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "currency is required for region eu");
    }

    #[test]
    fn details_must_be_complete() {
        let mut input = payload();
        input.details.texture.clear();
        let err = Product::create(input, Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "texture is required in details");

        let mut input = payload();
        input.details.shelf_life.duration.clear();
        assert_eq!(
            Product::create(input, Utc::now()).unwrap_err(),
            ProductError::ShelfLifeRequired
        );
    }

    #[test]
    fn update_changes_only_given_fields() {
        let mut product = Product::create(payload(), Utc::now()).unwrap();
        let existing = product.variants[0].id;

        product
            .apply_update(
                ProductUpdate {
                    name: Some("Beluga".into()),
                    is_active: Some(true),
                    variants: Some(vec![
                        VariantUpdate {
                            id: Some(existing),
                            mass: 50,
                            stock: 25,
                            prices: BTreeMap::from([("ua".into(), Money::new(260_000, "UAH"))]),
                        },
                        VariantUpdate {
                            id: None,
                            mass: 250,
                            stock: 2,
                            prices: BTreeMap::from([("ua".into(), Money::new(900_000, "UAH"))]),
                        },
                    ]),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();

        assert_eq!(product.name, "Beluga");
        assert_eq!(product.slug, "sturgeon-classic");
        assert!(product.is_active);
        assert_eq!(product.variants.len(), 3);
        assert_eq!(product.variant(existing).unwrap().stock, 25);
    }

    #[test]
    fn invalid_update_leaves_product_untouched() {
        let mut product = Product::create(payload(), Utc::now()).unwrap();
        let before = product.clone();

        let err = product
            .apply_update(
                ProductUpdate {
                    name: Some("Renamed".into()),
                    variants: Some(vec![VariantUpdate {
                        id: Some(VariantId::new()),
                        mass: 10,
                        stock: 1,
                        prices: BTreeMap::from([("ua".into(), Money::new(1, "UAH"))]),
                    }]),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap_err();

        assert!(matches!(err, ProductError::UnknownVariant { .. }));
        assert_eq!(product, before);
    }
}
