//! In-memory store implementations.
//!
//! They follow the same contracts as the PostgreSQL backend and add a few
//! switches for injecting failures in tests.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, ProductId, UserId, VariantId};
use domain::{Order, OrderStatus, Product, User, Variant};
use tokio::sync::RwLock;

use crate::{
    CatalogStore, OrderFilter, OrderStatistics, OrderStore, ProductFilter, ProductSort, Result,
    SortOrder, StoreError, UserStore,
};

#[derive(Debug, Default)]
struct CatalogState {
    products: HashMap<ProductId, Product>,
    failing_variants: HashSet<VariantId>,
    stock_updates: Vec<(VariantId, i32)>,
    unavailable: bool,
}

impl CatalogState {
    fn check_available(&self, operation: &'static str) -> Result<()> {
        if self.unavailable {
            return Err(StoreError::Unavailable { operation });
        }
        Ok(())
    }

    fn slug_taken(&self, slug: &str, except: ProductId) -> bool {
        self.products
            .values()
            .any(|product| product.slug == slug && product.id != except)
    }

    fn variant_mut(&mut self, variant_id: VariantId) -> Option<&mut Variant> {
        self.products
            .values_mut()
            .find_map(|product| product.variant_mut(variant_id))
    }
}

/// In-memory catalog for tests and database-less runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogStore {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every stock update of `variant_id` fail until cleared.
    pub async fn fail_stock_updates_for(&self, variant_id: VariantId) {
        self.state.write().await.failing_variants.insert(variant_id);
    }

    pub async fn clear_stock_failures(&self) {
        self.state.write().await.failing_variants.clear();
    }

    /// Makes every operation fail while set.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    /// Returns every successful stock delta in the order applied.
    pub async fn stock_updates(&self) -> Vec<(VariantId, i32)> {
        self.state.read().await.stock_updates.clone()
    }

    pub async fn product_count(&self) -> usize {
        self.state.read().await.products.len()
    }
}

fn compare_products(a: &Product, b: &Product, filter: &ProductFilter) -> Ordering {
    let ordering = match filter.sort_by {
        ProductSort::CreatedAt => a.created_at.cmp(&b.created_at),
        ProductSort::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        ProductSort::Name => a.name.cmp(&b.name),
    }
    .then_with(|| a.id.cmp(&b.id));

    match filter.sort_order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn create_product(&self, product: &Product) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_available("create product")?;

        if state.slug_taken(&product.slug, product.id) {
            return Err(StoreError::Duplicate {
                entity: "product",
                field: "slug",
                value: product.slug.clone(),
            });
        }
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Product> {
        let state = self.state.read().await;
        state.check_available("load product")?;
        state
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("product", id))
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Product> {
        let state = self.state.read().await;
        state.check_available("load product by slug")?;
        state
            .products
            .values()
            .find(|product| product.slug == slug)
            .cloned()
            .ok_or_else(|| StoreError::not_found("product", format!("with slug {slug:?}")))
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        state.check_available("list products")?;

        let mut products: Vec<_> = state
            .products
            .values()
            .filter(|product| filter.matches(product))
            .cloned()
            .collect();
        products.sort_by(|a, b| compare_products(a, b, filter));

        Ok(products
            .into_iter()
            .skip(filter.effective_offset() as usize)
            .take(filter.effective_limit() as usize)
            .collect())
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_available("update product")?;

        if state.slug_taken(&product.slug, product.id) {
            return Err(StoreError::Duplicate {
                entity: "product",
                field: "slug",
                value: product.slug.clone(),
            });
        }
        let stored = state
            .products
            .get_mut(&product.id)
            .ok_or_else(|| StoreError::not_found("product", product.id))?;

        let mut variants = std::mem::take(&mut stored.variants);
        for variant in &product.variants {
            match variants.iter_mut().find(|v| v.id == variant.id) {
                Some(existing) => *existing = variant.clone(),
                None => variants.push(variant.clone()),
            }
        }
        *stored = Product {
            variants,
            ..product.clone()
        };
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_available("delete product")?;
        state
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("product", id))
    }

    async fn get_variant(&self, product_id: ProductId, variant_id: VariantId) -> Result<Variant> {
        let state = self.state.read().await;
        state.check_available("load variant")?;
        let product = state
            .products
            .get(&product_id)
            .ok_or_else(|| StoreError::not_found("product", product_id))?;
        product
            .variant(variant_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("variant", variant_id))
    }

    async fn update_variant_stock(&self, variant_id: VariantId, delta: i32) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_available("update variant stock")?;

        if state.failing_variants.contains(&variant_id) {
            return Err(StoreError::Unavailable {
                operation: "update variant stock",
            });
        }
        let variant = state
            .variant_mut(variant_id)
            .ok_or_else(|| StoreError::not_found("variant", variant_id))?;
        variant.stock = variant.stock.saturating_add(delta);
        variant.updated_at = Utc::now();
        state.stock_updates.push((variant_id, delta));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct OrderState {
    orders: HashMap<OrderId, Order>,
    fail_on_create: bool,
    unavailable: bool,
}

impl OrderState {
    fn check_available(&self, operation: &'static str) -> Result<()> {
        if self.unavailable {
            return Err(StoreError::Unavailable { operation });
        }
        Ok(())
    }
}

/// In-memory order store for tests and database-less runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<OrderState>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail every create call while set.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.write().await.fail_on_create = fail;
    }

    /// Makes every operation fail while set.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_available("create order")?;

        if state.fail_on_create {
            return Err(StoreError::Unavailable {
                operation: "create order",
            });
        }
        if state
            .orders
            .values()
            .any(|existing| existing.order_number() == order.order_number())
        {
            return Err(StoreError::Conflict {
                entity: "order",
                key: order.order_number().to_string(),
            });
        }
        state.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: OrderId) -> Result<Order> {
        let state = self.state.read().await;
        state.check_available("load order")?;
        state
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("order", id))
    }

    async fn get_by_order_number(&self, order_number: &str) -> Result<Order> {
        let state = self.state.read().await;
        state.check_available("load order by number")?;
        state
            .orders
            .values()
            .find(|order| order.order_number() == order_number)
            .cloned()
            .ok_or_else(|| StoreError::not_found("order", order_number))
    }

    async fn list(&self, filter: &OrderFilter) -> Result<(Vec<Order>, u64)> {
        let state = self.state.read().await;
        state.check_available("list orders")?;

        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|order| filter.matches(order))
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });

        let total = orders.len() as u64;
        let offset = filter.offset.unwrap_or(0) as usize;
        let page: Vec<_> = match filter.limit {
            Some(limit) => orders
                .into_iter()
                .skip(offset)
                .take(limit as usize)
                .collect(),
            None => orders.into_iter().skip(offset).collect(),
        };
        Ok((page, total))
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_available("update order status")?;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("order", id))?;
        order.set_status(status, Utc::now());
        Ok(())
    }

    async fn delete(&self, id: OrderId) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_available("delete order")?;
        state
            .orders
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("order", id))
    }

    async fn statistics(&self) -> Result<OrderStatistics> {
        let state = self.state.read().await;
        state.check_available("compute order statistics")?;

        let mut stats = OrderStatistics {
            total_orders: state.orders.len() as u64,
            ..Default::default()
        };
        for order in state.orders.values() {
            *stats.status_counts.entry(order.status()).or_default() += 1;
            *stats
                .country_counts
                .entry(order.delivery_info().country.clone())
                .or_default() += 1;
        }
        Ok(stats)
    }
}

/// In-memory user directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn users_with_chat_id(&self) -> Result<Vec<User>> {
        let users = self.users.read().await;
        let mut linked: Vec<_> = users
            .values()
            .filter(|user| user.chat_id().is_some())
            .cloned()
            .collect();
        linked.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(linked)
    }

    async fn get_user(&self, id: UserId) -> Result<User> {
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", id))
    }
}
