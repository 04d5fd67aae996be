//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, OrderItemId, ProductId, VariantId};
use serde::{Deserialize, Serialize};

use crate::product::Product;

use super::{
    CartItem, CustomerInfo, CustomerInfoInput, DeliveryInfo, DeliveryInfoInput, DeliveryType,
    NewOrder, OrderError, OrderStatus, generate_order_number,
};

/// Order aggregate root.
///
/// Built once from a validated cart and immutable afterwards, except for its
/// status and `updated_at`. Stores rebuild it through [`Order::restore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    order_number: String,
    customer_info: CustomerInfo,
    delivery_info: DeliveryInfo,
    items: Vec<OrderItem>,
    total_amount: Money,
    status: OrderStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// A single order line with its price snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: i32,
    pub unit_price: Money,
    /// `unit_price × quantity` in the order currency.
    pub total_price: Money,
    /// Filled in for responses only; never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
    pub created_at: DateTime<Utc>,
}

/// Every stored field of an order, used by stores to rebuild the aggregate.
#[derive(Debug, Clone)]
pub struct OrderParts {
    pub id: OrderId,
    pub order_number: String,
    pub customer_info: CustomerInfo,
    pub delivery_info: DeliveryInfo,
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Construction
impl Order {
    /// Validates a cart and assembles a pending order stamped with the current time.
    pub fn from_cart(cart: NewOrder) -> Result<Self, OrderError> {
        Self::from_cart_at(cart, Utc::now())
    }

    /// Same as [`Order::from_cart`] with an explicit construction instant.
    ///
    /// Checks run in a fixed order and stop at the first failure: item
    /// presence, customer, delivery, then each item in cart order.
    pub fn from_cart_at(cart: NewOrder, now: DateTime<Utc>) -> Result<Self, OrderError> {
        if cart.items.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let customer_info = validate_customer(cart.customer_info)?;
        let delivery_info = validate_delivery(cart.delivery_info)?;

        let order_id = OrderId::new();
        let mut currency: Option<String> = None;
        let mut total: i64 = 0;
        let mut items = Vec::with_capacity(cart.items.len());

        for (index, line) in cart.items.into_iter().enumerate() {
            let position = index + 1;
            let (product_id, variant_id) = validate_line(&line, position)?;

            let order_currency = currency
                .get_or_insert_with(|| line.unit_price.currency.clone())
                .clone();
            if order_currency != line.unit_price.currency {
                return Err(OrderError::CurrencyMismatch);
            }

            let line_total = line
                .unit_price
                .amount
                .checked_mul(i64::from(line.quantity))
                .ok_or(OrderError::TotalOverflow { item: position })?;
            total = total
                .checked_add(line_total)
                .ok_or(OrderError::TotalOverflow { item: position })?;

            items.push(OrderItem {
                id: OrderItemId::new(),
                order_id,
                product_id,
                variant_id,
                quantity: line.quantity,
                total_price: Money::new(line_total, order_currency),
                unit_price: line.unit_price,
                product: None,
                created_at: now,
            });
        }

        let currency = currency.unwrap_or_default();

        Ok(Self {
            id: order_id,
            order_number: generate_order_number(now),
            customer_info,
            delivery_info,
            items,
            total_amount: Money::new(total, currency),
            status: OrderStatus::Pending,
            notes: cart.notes,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuilds an order from stored fields without re-validating them.
    pub fn restore(parts: OrderParts) -> Self {
        Self {
            id: parts.id,
            order_number: parts.order_number,
            customer_info: parts.customer_info,
            delivery_info: parts.delivery_info,
            items: parts.items,
            total_amount: parts.total_amount,
            status: parts.status,
            notes: parts.notes,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        }
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn customer_info(&self) -> &CustomerInfo {
        &self.customer_info
    }

    pub fn delivery_info(&self) -> &DeliveryInfo {
        &self.delivery_info
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the total number of units across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|item| i64::from(item.quantity)).sum()
    }

    pub fn total_amount(&self) -> &Money {
        &self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

// Mutation
impl Order {
    /// Records a new status. Any member of the vocabulary is accepted.
    pub fn set_status(&mut self, status: OrderStatus, at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = at;
    }

    /// Attaches a product snapshot to every line referencing it.
    pub fn attach_product(&mut self, product: &Product) {
        for item in self.items.iter_mut().filter(|item| item.product_id == product.id) {
            item.product = Some(product.clone());
        }
    }

    /// Splits the order back into its stored fields.
    pub fn into_parts(self) -> OrderParts {
        OrderParts {
            id: self.id,
            order_number: self.order_number,
            customer_info: self.customer_info,
            delivery_info: self.delivery_info,
            items: self.items,
            total_amount: self.total_amount,
            status: self.status,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn non_blank(value: String) -> Option<String> {
    if is_blank(&value) { None } else { Some(value) }
}

fn validate_customer(input: CustomerInfoInput) -> Result<CustomerInfo, OrderError> {
    if is_blank(&input.phone) {
        return Err(OrderError::PhoneRequired);
    }

    let (full_name, first_name, last_name) = if !is_blank(&input.full_name) {
        (input.full_name, String::new(), String::new())
    } else if !is_blank(&input.first_name) && !is_blank(&input.last_name) {
        (String::new(), input.first_name, input.last_name)
    } else {
        return Err(OrderError::NameRequired);
    };

    Ok(CustomerInfo {
        first_name,
        last_name,
        full_name,
        phone: input.phone,
        email: non_blank(input.email),
    })
}

fn validate_delivery(input: DeliveryInfoInput) -> Result<DeliveryInfo, OrderError> {
    if is_blank(&input.country) {
        return Err(OrderError::CountryRequired);
    }
    if is_blank(&input.city) {
        return Err(OrderError::CityRequired);
    }

    let delivery_type =
        DeliveryType::parse(&input.delivery_type).ok_or(OrderError::InvalidDeliveryType)?;
    match delivery_type {
        DeliveryType::PostOffice if is_blank(&input.post_office) => {
            return Err(OrderError::PostOfficeRequired);
        }
        DeliveryType::Courier | DeliveryType::Address if is_blank(&input.address) => {
            return Err(OrderError::AddressRequired {
                delivery: delivery_type,
            });
        }
        _ => {}
    }

    Ok(DeliveryInfo {
        delivery_type,
        country: input.country,
        city: input.city,
        address: non_blank(input.address),
        post_office: non_blank(input.post_office),
        instructions: non_blank(input.instructions),
    })
}

fn validate_line(line: &CartItem, position: usize) -> Result<(ProductId, VariantId), OrderError> {
    if is_blank(&line.product_id) {
        return Err(OrderError::ProductIdRequired { item: position });
    }
    let product_id = ProductId::parse(&line.product_id)
        .map_err(|_| OrderError::InvalidProductId { item: position })?;

    if is_blank(&line.variant_id) {
        return Err(OrderError::VariantIdRequired { item: position });
    }
    let variant_id = VariantId::parse(&line.variant_id)
        .map_err(|_| OrderError::InvalidVariantId { item: position })?;

    if line.quantity <= 0 {
        return Err(OrderError::InvalidQuantity { item: position });
    }
    if !line.unit_price.is_positive() {
        return Err(OrderError::InvalidUnitPrice { item: position });
    }
    if is_blank(&line.unit_price.currency) {
        return Err(OrderError::CurrencyRequired { item: position });
    }

    Ok((product_id, variant_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cart(items: Vec<CartItem>) -> NewOrder {
        NewOrder {
            customer_info: CustomerInfoInput {
                full_name: "Taras Shevchuk".into(),
                phone: "+380671234567".into(),
                ..Default::default()
            },
            delivery_info: DeliveryInfoInput {
                delivery_type: "post_office".into(),
                country: "UA".into(),
                city: "Kyiv".into(),
                post_office: "25".into(),
                ..Default::default()
            },
            items,
            notes: String::new(),
        }
    }

    fn line(quantity: i32, amount: i64, currency: &str) -> CartItem {
        CartItem::new(
            ProductId::new(),
            VariantId::new(),
            quantity,
            Money::new(amount, currency),
        )
    }

    #[test]
    fn builds_pending_order_with_totals() {
        let order = Order::from_cart(cart(vec![line(2, 150, "USD"), line(1, 150, "USD")])).unwrap();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.total_amount(), &Money::new(450, "USD"));
        assert_eq!(order.items()[0].total_price, Money::new(300, "USD"));
        assert_eq!(order.items()[1].total_price, Money::new(150, "USD"));
        assert_eq!(order.created_at(), order.updated_at());
        assert!(order.items().iter().all(|item| item.order_id == order.id()));
    }

    #[test]
    fn items_keep_cart_order() {
        let first = line(1, 10, "EUR");
        let second = line(3, 20, "EUR");
        let order = Order::from_cart(cart(vec![first.clone(), second.clone()])).unwrap();

        assert_eq!(order.items()[0].product_id.to_string(), first.product_id);
        assert_eq!(order.items()[1].variant_id.to_string(), second.variant_id);
        assert_eq!(order.total_quantity(), 4);
    }

    #[test]
    fn rejects_empty_cart_before_customer() {
        let mut input = cart(vec![]);
        input.customer_info.phone.clear();
        assert_eq!(Order::from_cart(input).unwrap_err(), OrderError::EmptyCart);
    }

    #[test]
    fn full_name_drops_split_names() {
        let mut input = cart(vec![line(1, 10, "USD")]);
        input.customer_info.first_name = "A".into();
        input.customer_info.last_name = "B".into();

        let order = Order::from_cart(input).unwrap();
        assert_eq!(order.customer_info().full_name, "Taras Shevchuk");
        assert!(order.customer_info().first_name.is_empty());
    }

    #[test]
    fn courier_requires_address() {
        let mut input = cart(vec![line(1, 10, "USD")]);
        input.delivery_info.delivery_type = "courier".into();
        let err = Order::from_cart(input).unwrap_err();
        assert_eq!(err.to_string(), "address is required for courier delivery");
    }

    #[test]
    fn malformed_variant_id_is_rejected() {
        let mut item = line(1, 10, "USD");
        item.variant_id = "variant-1".into();
        let err = Order::from_cart(cart(vec![item])).unwrap_err();
        assert_eq!(err, OrderError::InvalidVariantId { item: 1 });
    }

    #[test]
    fn overflow_is_input_error() {
        let err = Order::from_cart(cart(vec![line(2, i64::MAX, "USD")])).unwrap_err();
        assert_eq!(err, OrderError::TotalOverflow { item: 1 });
    }

    #[test]
    fn status_change_bumps_updated_at() {
        let mut order = Order::from_cart(cart(vec![line(1, 10, "USD")])).unwrap();
        let later = order.created_at() + chrono::Duration::seconds(5);

        order.set_status(OrderStatus::Confirmed, later);

        assert_eq!(order.status(), OrderStatus::Confirmed);
        assert_eq!(order.updated_at(), later);
        assert!(order.created_at() < later);
    }

    #[test]
    fn restore_round_trips_parts() {
        let order = Order::from_cart(cart(vec![line(1, 10, "USD")])).unwrap();
        let restored = Order::restore(order.clone().into_parts());
        assert_eq!(order, restored);
    }
}
