//! Catalog management.

use std::sync::Arc;

use chrono::Utc;
use common::ProductId;
use domain::{NewProduct, Product, ProductUpdate};
use store::{CatalogStore, ProductFilter};

use crate::error::Result;

/// Product CRUD on top of a [`CatalogStore`].
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogStore>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    /// Validates and stores a new product. Products start inactive.
    #[tracing::instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create_product(&self, input: NewProduct) -> Result<Product> {
        let product = Product::create(input, Utc::now())?;
        self.catalog.create_product(&product).await?;

        metrics::counter!("products_created_total").increment(1);
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Searches the catalog. Anonymous callers never see inactive products.
    #[tracing::instrument(skip(self, filter))]
    pub async fn list_products(
        &self,
        mut filter: ProductFilter,
        authenticated: bool,
    ) -> Result<Vec<Product>> {
        if !authenticated {
            filter.show_all = false;
        }
        Ok(self.catalog.list_products(&filter).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        Ok(self.catalog.get_product(id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_product_by_slug(&self, slug: &str) -> Result<Product> {
        Ok(self.catalog.get_product_by_slug(slug).await?)
    }

    /// Applies a partial update and returns the stored product.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product> {
        let mut product = self.catalog.get_product(id).await?;
        product.apply_update(update, Utc::now())?;
        self.catalog.update_product(&product).await?;

        tracing::info!(product_id = %id, "product updated");
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<()> {
        self.catalog.delete_product(id).await?;
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }
}
