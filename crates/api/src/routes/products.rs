//! Catalog endpoints. Search and lookups are public; anonymous callers only
//! ever see active products.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use common::ProductId;
use domain::{NewProduct, Product, ProductUpdate};
use store::ProductFilter;

use super::{MessageResponse, parse_id};
use crate::AppState;
use crate::auth::is_staff;
use crate::error::ApiError;

/// Decodes a search body. An empty body means "no criteria".
fn decode_filter(body: &[u8]) -> Result<ProductFilter, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ProductFilter::default());
    }
    serde_json::from_slice(body)
        .map_err(|err| ApiError::BadRequest(format!("invalid product filter: {err}")))
}

fn visible(product: Product, staff: bool) -> Result<Product, ApiError> {
    if product.is_active || staff {
        Ok(product)
    } else {
        Err(ApiError::NotFound(format!("product {} not found", product.id)))
    }
}

/// POST /products/search: Filter the catalog with a JSON body.
#[tracing::instrument(skip(state, headers, body))]
pub async fn search(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Vec<Product>>, ApiError> {
    let filter = decode_filter(&body)?;
    let staff = is_staff(&headers, &state);
    Ok(Json(state.catalog.list_products(filter, staff).await?))
}

/// GET /products/{id}
#[tracing::instrument(skip(state, headers))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let id: ProductId = parse_id(&id, "product")?;
    let product = state.catalog.get_product(id).await?;
    Ok(Json(visible(product, is_staff(&headers, &state))?))
}

/// GET /products/slug/{slug}
#[tracing::instrument(skip(state, headers))]
pub async fn get_by_slug(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product = state.catalog.get_product_by_slug(&slug).await?;
    Ok(Json(visible(product, is_staff(&headers, &state))?))
}

/// POST /products: Create an inactive product with its variants.
#[tracing::instrument(skip(state, payload))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> Result<Json<Product>, ApiError> {
    let Json(input) = payload?;
    Ok(Json(state.catalog.create_product(input).await?))
}

/// PUT /products/{id}: Partial update.
#[tracing::instrument(skip(state, payload))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<ProductUpdate>, JsonRejection>,
) -> Result<Json<Product>, ApiError> {
    let id: ProductId = parse_id(&id, "product")?;
    let Json(update) = payload?;
    Ok(Json(state.catalog.update_product(id, update).await?))
}

/// DELETE /products/{id}: Removes the product and its variants.
#[tracing::instrument(skip(state))]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id: ProductId = parse_id(&id, "product")?;
    state.catalog.delete_product(id).await?;
    Ok(Json(MessageResponse {
        message: "Product deleted successfully",
    }))
}
