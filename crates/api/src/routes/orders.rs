//! Checkout and back-office order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{NewOrder, Order, OrderStatus};
use serde::{Deserialize, Serialize};
use store::{OrderFilter, OrderStatistics, Pagination};
use workflow::{OrderPage, WorkflowError};

use super::{MessageResponse, parse_id};
use crate::AppState;
use crate::error::ApiError;

// -- Request types --

/// Query string of `GET /orders`. Values stay textual so that bad numbers
/// and dates fall back instead of failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
    pub customer_phone: Option<String>,
    pub country: Option<String>,
    pub created_from: Option<String>,
    pub created_to: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    non_empty(value)
        .and_then(|value| DateTime::parse_from_rfc3339(&value).ok())
        .map(|at| at.with_timezone(&Utc))
}

impl ListOrdersQuery {
    pub fn into_filter(self) -> Result<(OrderFilter, Pagination), ApiError> {
        let mut filter = OrderFilter::new();
        if let Some(status) = non_empty(self.status) {
            let status: OrderStatus = status.parse().map_err(WorkflowError::from)?;
            filter = filter.status(status);
        }
        if let Some(phone) = non_empty(self.customer_phone) {
            filter = filter.customer_phone(phone);
        }
        if let Some(country) = non_empty(self.country) {
            filter = filter.country(country);
        }
        if let Some(from) = parse_timestamp(self.created_from) {
            filter = filter.created_from(from);
        }
        if let Some(to) = parse_timestamp(self.created_to) {
            filter = filter.created_to(to);
        }

        let page = Pagination::new(
            self.page.and_then(|page| page.parse().ok()),
            self.limit.and_then(|limit| limit.parse().ok()),
        );
        Ok((filter, page))
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct StatusUpdatedResponse {
    pub message: &'static str,
    pub status: OrderStatus,
}

// -- Handlers --

/// POST /orders: Place an order from a customer cart.
#[tracing::instrument(skip(state, payload))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewOrder>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let Json(cart) = payload?;
    let order = state.orders.create_order(cart).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders: Filtered, paginated listing.
#[tracing::instrument(skip(state, query))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListOrdersQuery>, QueryRejection>,
) -> Result<Json<OrderPage>, ApiError> {
    let Query(query) = query?;
    let (filter, page) = query.into_filter()?;
    Ok(Json(state.orders.list_orders(filter, page).await?))
}

/// GET /orders/statistics: Order counts by status and country.
#[tracing::instrument(skip(state))]
pub async fn statistics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<OrderStatistics>, ApiError> {
    Ok(Json(state.orders.order_statistics().await?))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let id: OrderId = parse_id(&id, "order")?;
    Ok(Json(state.orders.get_order(id).await?))
}

/// GET /orders/number/{order_number}
#[tracing::instrument(skip(state))]
pub async fn get_by_number(
    State(state): State<Arc<AppState>>,
    Path(order_number): Path<String>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.orders.get_order_by_number(&order_number).await?))
}

/// PUT /orders/{id}/status: Set the status; cancelling gives stock back.
#[tracing::instrument(skip(state, payload))]
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<StatusUpdatedResponse>, ApiError> {
    let id: OrderId = parse_id(&id, "order")?;
    let Json(request) = payload?;
    let status: OrderStatus = request.status.parse().map_err(WorkflowError::from)?;

    state.orders.update_order_status(id, status).await?;

    Ok(Json(StatusUpdatedResponse {
        message: "Order status updated successfully",
        status,
    }))
}

/// DELETE /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id: OrderId = parse_id(&id, "order")?;
    state.orders.delete_order(id).await?;
    Ok(Json(MessageResponse {
        message: "Order deleted successfully",
    }))
}
