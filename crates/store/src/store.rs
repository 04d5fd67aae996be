use async_trait::async_trait;
use common::{OrderId, ProductId, UserId, VariantId};
use domain::{Order, OrderStatus, Product, User, Variant};

use crate::{OrderFilter, OrderStatistics, ProductFilter, Result};

/// Product and variant persistence.
///
/// All implementations must be thread-safe (Send + Sync); one instance is
/// shared by every request.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Inserts a product together with its variants.
    ///
    /// Fails with `Duplicate` if the slug is taken.
    async fn create_product(&self, product: &Product) -> Result<()>;

    /// Loads a product with its variants.
    async fn get_product(&self, id: ProductId) -> Result<Product>;

    async fn get_product_by_slug(&self, slug: &str) -> Result<Product>;

    /// Lists products matching the filter, honouring its sort and window.
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>>;

    /// Overwrites a product's fields and upserts its variants.
    ///
    /// Variants missing from `product` are left in place.
    async fn update_product(&self, product: &Product) -> Result<()>;

    /// Deletes a product and its variants.
    async fn delete_product(&self, id: ProductId) -> Result<()>;

    /// Loads a variant, which must belong to `product_id`.
    async fn get_variant(&self, product_id: ProductId, variant_id: VariantId) -> Result<Variant>;

    /// Applies `stock := stock + delta` to one variant as a single atomic step.
    ///
    /// Does not enforce non-negative stock; callers check availability first.
    async fn update_variant_stock(&self, variant_id: VariantId, delta: i32) -> Result<()>;
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts an order and all of its items atomically.
    async fn create(&self, order: &Order) -> Result<()>;

    async fn get_by_id(&self, id: OrderId) -> Result<Order>;

    async fn get_by_order_number(&self, order_number: &str) -> Result<Order>;

    /// Returns one page of matching orders, newest first, and the total match count.
    async fn list(&self, filter: &OrderFilter) -> Result<(Vec<Order>, u64)>;

    /// Sets the status and stamps `updated_at` with the current time.
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()>;

    /// Deletes an order and its items.
    async fn delete(&self, id: OrderId) -> Result<()>;

    async fn statistics(&self) -> Result<OrderStatistics>;
}

/// Read access to back-office users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns every user with a linked chat account.
    async fn users_with_chat_id(&self) -> Result<Vec<User>>;

    async fn get_user(&self, id: UserId) -> Result<User>;
}
