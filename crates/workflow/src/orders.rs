//! Order workflow: placement with stock reservation, and back-office
//! operations on placed orders.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use common::{OrderId, ProductId, VariantId};
use domain::{CartItem, NewOrder, Order, OrderStatus};
use serde::Serialize;
use store::{CatalogStore, OrderFilter, OrderStatistics, OrderStore, Pagination};

use crate::error::{Result, WorkflowError};
use crate::notification::NotificationDispatcher;

/// One page of an order listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

/// Why reserved stock is being given back.
#[derive(Debug, Clone, Copy)]
enum Release {
    /// The order could not be saved after its stock was reserved.
    FailedPersist,
    /// The order was cancelled or deleted.
    Refund,
}

impl Release {
    fn as_str(&self) -> &'static str {
        match self {
            Release::FailedPersist => "failed_persist",
            Release::Refund => "refund",
        }
    }
}

/// Coordinates the catalog and order stores for everything that happens to
/// an order.
///
/// Placement runs in four sequential steps: live validation against the
/// catalog, construction, stock reservation and persistence. If persistence
/// fails, every reservation is released again before the error is returned.
/// A successful placement fires a detached notification.
#[derive(Clone)]
pub struct OrderWorkflow {
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    notifier: Option<Arc<NotificationDispatcher>>,
}

impl OrderWorkflow {
    pub fn new(catalog: Arc<dyn CatalogStore>, orders: Arc<dyn OrderStore>) -> Self {
        Self {
            catalog,
            orders,
            notifier: None,
        }
    }

    /// Announces every placed order through `notifier`.
    pub fn with_notifier(mut self, notifier: Arc<NotificationDispatcher>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Places an order for `cart`.
    #[tracing::instrument(skip(self, cart), fields(items = cart.items.len()))]
    pub async fn create_order(&self, cart: NewOrder) -> Result<Order> {
        let started = std::time::Instant::now();
        let result = self.place(cart).await;
        metrics::histogram!("order_creation_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!(
                    order_id = %order.id(),
                    order_number = order.order_number(),
                    total = %order.total_amount(),
                    "order created"
                );
                self.notify_created(&order);
                Ok(order)
            }
            Err(err) => {
                metrics::counter!("order_creation_failed_total", "kind" => err.kind().code())
                    .increment(1);
                tracing::warn!(error = %err, "order rejected");
                Err(err)
            }
        }
    }

    async fn place(&self, cart: NewOrder) -> Result<Order> {
        let mut requested = HashMap::new();
        for (index, item) in cart.items.iter().enumerate() {
            self.check_item(index + 1, item, &mut requested).await?;
        }

        let order = Order::from_cart(cart)?;

        // Reservation and persistence run to completion on their own task,
        // so a dropped request cannot leave stock reserved without an order.
        let catalog = Arc::clone(&self.catalog);
        let orders = Arc::clone(&self.orders);
        tokio::spawn(reserve_and_persist(catalog, orders, order)).await?
    }

    /// Checks one cart line against the live catalog. `item` is 1-based.
    ///
    /// `requested` accumulates quantities per variant, so repeated lines for
    /// one variant are checked against its stock together.
    async fn check_item(
        &self,
        item: usize,
        line: &CartItem,
        requested: &mut HashMap<VariantId, i32>,
    ) -> Result<()> {
        let product_not_found = || WorkflowError::ProductNotFound {
            item,
            product_id: line.product_id.clone(),
        };
        let product_id = ProductId::parse(&line.product_id).map_err(|_| product_not_found())?;
        let product = match self.catalog.get_product(product_id).await {
            Ok(product) => product,
            Err(err) if err.is_not_found() => return Err(product_not_found()),
            Err(err) => return Err(err.into()),
        };
        if !product.is_active {
            return Err(WorkflowError::ProductInactive { item });
        }

        let variant_not_found = || WorkflowError::VariantNotFound {
            item,
            variant_id: line.variant_id.clone(),
        };
        let variant_id = VariantId::parse(&line.variant_id).map_err(|_| variant_not_found())?;
        let variant = match self.catalog.get_variant(product.id, variant_id).await {
            Ok(variant) => variant,
            Err(err) if err.is_not_found() => return Err(variant_not_found()),
            Err(err) => return Err(err.into()),
        };

        let total = requested.entry(variant.id).or_insert(0);
        *total = total.saturating_add(line.quantity);
        if !variant.has_stock(*total) {
            return Err(WorkflowError::InsufficientStock {
                item,
                requested: *total,
                available: variant.stock,
            });
        }
        Ok(())
    }

    async fn release(&self, order: &Order, reason: Release) {
        release_stock(Arc::clone(&self.catalog), order, reason).await;
    }

    fn notify_created(&self, order: &Order) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };
        let order = order.clone();
        tokio::spawn(async move {
            for report in notifier.send_order_created(&order).await {
                if !report.is_success() {
                    tracing::warn!(
                        order_id = %order.id(),
                        channel = %report.channel,
                        sent = report.sent,
                        failed = report.failed,
                        error = report.error.as_ref().map(tracing::field::display),
                        "order notification incomplete"
                    );
                }
            }
        });
    }

    /// Loads an order with product snapshots attached to its items.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, id: OrderId) -> Result<Order> {
        let order = self.orders.get_by_id(id).await?;
        Ok(self.with_products(order).await)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_order_by_number(&self, order_number: &str) -> Result<Order> {
        let order = self.orders.get_by_order_number(order_number).await?;
        Ok(self.with_products(order).await)
    }

    /// Products that no longer exist are left off.
    async fn with_products(&self, mut order: Order) -> Order {
        let product_ids: BTreeSet<ProductId> =
            order.items().iter().map(|item| item.product_id).collect();
        for product_id in product_ids {
            match self.catalog.get_product(product_id).await {
                Ok(product) => order.attach_product(&product),
                Err(err) => {
                    tracing::warn!(order_id = %order.id(), %product_id, error = %err, "failed to load ordered product")
                }
            }
        }
        order
    }

    /// Lists matching orders, newest first.
    #[tracing::instrument(skip(self, filter))]
    pub async fn list_orders(&self, filter: OrderFilter, page: Pagination) -> Result<OrderPage> {
        let (orders, total) = self.orders.list(&filter.paginate(page)).await?;
        Ok(OrderPage {
            orders,
            total,
            page: page.page,
            limit: page.limit,
            total_pages: page.total_pages(total),
        })
    }

    /// Sets the status of an order.
    ///
    /// Moving an order into `cancelled` gives its stock back once; any other
    /// move, including out of `cancelled`, leaves stock alone. Transitions are
    /// not checked against [`OrderStatus::can_transition_to`].
    #[tracing::instrument(skip(self))]
    pub async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
        let order = self.orders.get_by_id(id).await?;
        if status.is_cancelled() && !order.status().is_cancelled() {
            self.release(&order, Release::Refund).await;
        }
        self.orders.update_status(id, status).await?;

        tracing::info!(order_id = %id, from = %order.status(), to = %status, "order status updated");
        Ok(())
    }

    /// Deletes an order, giving its stock back unless it was cancelled.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, id: OrderId) -> Result<()> {
        let order = self.orders.get_by_id(id).await?;
        if !order.status().is_cancelled() {
            self.release(&order, Release::Refund).await;
        }
        self.orders.delete(id).await?;

        tracing::info!(order_id = %id, "order deleted");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn order_statistics(&self) -> Result<OrderStatistics> {
        Ok(self.orders.statistics().await?)
    }
}

/// Decrements stock for every item, then saves the order. If saving fails,
/// every reservation is released before the error is returned.
///
/// A failed decrement is returned as is; decrements already applied for
/// earlier items stay in place.
async fn reserve_and_persist(
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    order: Order,
) -> Result<Order> {
    for item in order.items() {
        catalog
            .update_variant_stock(item.variant_id, -item.quantity)
            .await?;
    }

    if let Err(err) = orders.create(&order).await {
        tracing::error!(order_id = %order.id(), error = %err, "failed to save order, releasing stock");
        release_stock(catalog, &order, Release::FailedPersist).await;
        return Err(err.into());
    }
    Ok(order)
}

/// Gives every item's quantity back to its variant.
///
/// Runs on its own task so that dropping the caller does not interrupt it.
/// Failures are logged and counted, never returned.
async fn release_stock(catalog: Arc<dyn CatalogStore>, order: &Order, reason: Release) {
    let order_id = order.id();
    let lines: Vec<(VariantId, i32)> = order
        .items()
        .iter()
        .map(|item| (item.variant_id, item.quantity))
        .collect();

    let task = tokio::spawn(async move {
        let mut failed = 0usize;
        for (variant_id, quantity) in lines {
            match catalog.update_variant_stock(variant_id, quantity).await {
                Ok(()) => {
                    metrics::counter!("stock_compensations_total", "reason" => reason.as_str())
                        .increment(1);
                }
                Err(err) => {
                    failed += 1;
                    metrics::counter!("stock_compensation_failures_total", "reason" => reason.as_str())
                        .increment(1);
                    tracing::error!(
                        %order_id,
                        %variant_id,
                        quantity,
                        reason = reason.as_str(),
                        error = %err,
                        "failed to release stock"
                    );
                }
            }
        }
        failed
    });

    match task.await {
        Ok(0) => tracing::debug!(%order_id, reason = reason.as_str(), "stock released"),
        Ok(failed) => {
            tracing::warn!(%order_id, failed, reason = reason.as_str(), "stock partially released")
        }
        Err(err) => tracing::error!(%order_id, error = %err, "stock release task failed"),
    }
}
