use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use domain::{Order, OrderStatus, Product};
use serde::{Deserialize, Serialize};

/// Builder for order listing queries.
///
/// Results are always ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Filter by exact status.
    pub status: Option<OrderStatus>,

    /// Case-insensitive substring of the customer phone.
    pub customer_phone: Option<String>,

    /// Exact delivery country.
    pub country: Option<String>,

    /// Created at or after this instant.
    pub created_from: Option<DateTime<Utc>>,

    /// Created at or before this instant.
    pub created_to: Option<DateTime<Utc>>,

    /// Maximum number of orders to return.
    pub limit: Option<u32>,

    /// Number of orders to skip.
    pub offset: Option<u32>,
}

impl OrderFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn customer_phone(mut self, phone: impl Into<String>) -> Self {
        self.customer_phone = Some(phone.into());
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn created_from(mut self, from: DateTime<Utc>) -> Self {
        self.created_from = Some(from);
        self
    }

    pub fn created_to(mut self, to: DateTime<Utc>) -> Self {
        self.created_to = Some(to);
        self
    }

    /// Applies a page window to the query.
    pub fn paginate(mut self, page: Pagination) -> Self {
        self.limit = Some(page.limit);
        self.offset = Some(page.offset());
        self
    }

    /// Returns true if the order passes every criterion except the window.
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(status) = self.status
            && order.status() != status
        {
            return false;
        }
        if let Some(ref phone) = self.customer_phone
            && !order
                .customer_info()
                .phone
                .to_lowercase()
                .contains(&phone.to_lowercase())
        {
            return false;
        }
        if let Some(ref country) = self.country
            && order.delivery_info().country != *country
        {
            return false;
        }
        if let Some(from) = self.created_from
            && order.created_at() < from
        {
            return false;
        }
        if let Some(to) = self.created_to
            && order.created_at() > to
        {
            return false;
        }
        true
    }
}

/// A page window over a listing.
///
/// Pages start at 1. Out-of-range limits fall back to the default rather
/// than being clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        let page = page.filter(|page| *page >= 1).unwrap_or(1);
        let limit = limit
            .filter(|limit| (1..=Self::MAX_LIMIT).contains(limit))
            .unwrap_or(Self::DEFAULT_LIMIT);
        Self { page, limit }
    }

    pub fn offset(&self) -> u32 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Number of pages needed for `total` rows.
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.limit))
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Aggregate order counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatistics {
    pub total_orders: u64,
    pub status_counts: BTreeMap<OrderStatus, u64>,
    pub country_counts: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductSort {
    #[default]
    CreatedAt,
    UpdatedAt,
    Name,
}

impl ProductSort {
    pub fn column(&self) -> &'static str {
        match self {
            ProductSort::CreatedAt => "created_at",
            ProductSort::UpdatedAt => "updated_at",
            ProductSort::Name => "name",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Catalog search criteria, decoded straight from query strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductFilter {
    /// Exact slug.
    pub slug: Option<String>,
    /// Case-insensitive substrings of the matching field.
    pub name: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    /// Case-insensitive substring of slug, name, subtitle or description.
    pub search: Option<String>,
    /// Include inactive products. Only honoured for authenticated callers.
    pub show_all: bool,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub updated_after: Option<DateTime<Utc>>,
    pub updated_before: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub sort_by: ProductSort,
    pub sort_order: SortOrder,
}

impl ProductFilter {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn show_all(mut self, show_all: bool) -> Self {
        self.show_all = show_all;
        self
    }

    pub fn sorted(mut self, sort_by: ProductSort, sort_order: SortOrder) -> Self {
        self.sort_by = sort_by;
        self.sort_order = sort_order;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Limit after defaulting and capping.
    pub fn effective_limit(&self) -> u32 {
        match self.limit {
            None | Some(0) => Self::DEFAULT_LIMIT,
            Some(limit) => limit.min(Self::MAX_LIMIT),
        }
    }

    pub fn effective_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }

    /// Returns true if the product passes every criterion except the window.
    pub fn matches(&self, product: &Product) -> bool {
        fn contains(haystack: &str, needle: &str) -> bool {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        }

        if !self.show_all && !product.is_active {
            return false;
        }
        if let Some(ref slug) = self.slug
            && product.slug != *slug
        {
            return false;
        }
        if let Some(ref name) = self.name
            && !contains(&product.name, name)
        {
            return false;
        }
        if let Some(ref subtitle) = self.subtitle
            && !contains(&product.subtitle, subtitle)
        {
            return false;
        }
        if let Some(ref description) = self.description
            && !contains(&product.description, description)
        {
            return false;
        }
        if let Some(ref term) = self.search
            && ![
                &product.slug,
                &product.name,
                &product.subtitle,
                &product.description,
            ]
            .iter()
            .any(|field| contains(field, term))
        {
            return false;
        }
        if let Some(after) = self.created_after
            && product.created_at < after
        {
            return false;
        }
        if let Some(before) = self.created_before
            && product.created_at > before
        {
            return false;
        }
        if let Some(after) = self.updated_after
            && product.updated_at < after
        {
            return false;
        }
        if let Some(before) = self.updated_before
            && product.updated_at > before
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults() {
        let page = Pagination::new(None, None);
        assert_eq!(page, Pagination { page: 1, limit: 10 });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn pagination_falls_back_on_bad_values() {
        assert_eq!(Pagination::new(Some(0), Some(0)), Pagination { page: 1, limit: 10 });
        assert_eq!(Pagination::new(Some(3), Some(101)).limit, 10);
        assert_eq!(Pagination::new(Some(3), Some(100)).limit, 100);
    }

    #[test]
    fn pagination_offset_and_pages() {
        let page = Pagination::new(Some(3), Some(25));
        assert_eq!(page.offset(), 50);
        assert_eq!(page.total_pages(0), 0);
        assert_eq!(page.total_pages(50), 2);
        assert_eq!(page.total_pages(51), 3);
    }

    #[test]
    fn product_limit_is_defaulted_and_capped() {
        assert_eq!(ProductFilter::new().effective_limit(), 20);
        assert_eq!(ProductFilter::new().limit(0).effective_limit(), 20);
        assert_eq!(ProductFilter::new().limit(500).effective_limit(), 100);
        assert_eq!(ProductFilter::new().limit(7).effective_limit(), 7);
    }

    #[test]
    fn product_filter_decodes_from_query_style_json() {
        let filter: ProductFilter = serde_json::from_value(serde_json::json!({
            "search": "beluga",
            "showAll": true,
            "sortBy": "name",
            "sortOrder": "asc",
        }))
        .unwrap();

        assert_eq!(filter.search.as_deref(), Some("beluga"));
        assert!(filter.show_all);
        assert_eq!(filter.sort_by, ProductSort::Name);
        assert_eq!(filter.sort_order, SortOrder::Asc);
    }

    #[test]
    fn statistics_serialize_status_keys_as_names() {
        let stats = OrderStatistics {
            total_orders: 2,
            status_counts: BTreeMap::from([(OrderStatus::Pending, 2)]),
            country_counts: BTreeMap::from([("UA".to_string(), 2)]),
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["status_counts"]["pending"], 2);
        assert_eq!(json["country_counts"]["UA"], 2);
    }
}
