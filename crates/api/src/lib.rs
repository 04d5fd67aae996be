//! HTTP API server for the caviar shop.
//!
//! Exposes checkout, order back office, catalog and staff login under
//! `/api/v1`, with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{
    CatalogStore, InMemoryCatalogStore, InMemoryOrderStore, InMemoryUserStore, OrderStore,
    PostgresStore, UserStore,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use workflow::{
    CatalogService, ChatChannel, LoginService, NotificationDispatcher, OrderWorkflow, OtpStore,
};

use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub orders: OrderWorkflow,
    pub catalog: CatalogService,
    pub login: LoginService,
    pub config: Config,
}

/// The storage backends the workflows run against.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogStore>,
    pub orders: Arc<dyn OrderStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    /// Empty in-memory stores, used when no database is configured.
    pub fn in_memory() -> Self {
        Self {
            catalog: Arc::new(InMemoryCatalogStore::new()),
            orders: Arc::new(InMemoryOrderStore::new()),
            users: Arc::new(InMemoryUserStore::new()),
        }
    }

    pub fn postgres(store: PostgresStore) -> Self {
        let store = Arc::new(store);
        Self {
            catalog: store.clone(),
            orders: store.clone(),
            users: store,
        }
    }
}

/// Wires the workflows over `stores`.
///
/// Without a chat channel, placed orders notify nobody and login codes
/// cannot be requested.
pub fn create_state(
    config: Config,
    stores: Stores,
    chat: Option<Arc<dyn ChatChannel>>,
    codes: Arc<dyn OtpStore>,
) -> Arc<AppState> {
    let mut orders = OrderWorkflow::new(stores.catalog.clone(), stores.orders.clone());
    if let Some(chat) = chat.clone() {
        let dispatcher = NotificationDispatcher::new(stores.users.clone(), chat);
        orders = orders.with_notifier(Arc::new(dispatcher));
    }

    Arc::new(AppState {
        orders,
        catalog: CatalogService::new(stores.catalog),
        login: LoginService::new(stores.users, codes, chat),
        config,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let public = Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create))
        .route("/products/search", post(routes::products::search))
        .route("/products/{id}", get(routes::products::get))
        .route("/products/slug/{slug}", get(routes::products::get_by_slug))
        .route("/auth/otp/request", post(routes::auth::request_code))
        .route("/auth/otp/verify", post(routes::auth::verify_code));

    let staff = Router::new()
        .route("/orders", get(routes::orders::list))
        .route("/orders/statistics", get(routes::orders::statistics))
        .route(
            "/orders/{id}",
            get(routes::orders::get).delete(routes::orders::delete),
        )
        .route(
            "/orders/number/{order_number}",
            get(routes::orders::get_by_number),
        )
        .route("/orders/{id}/status", put(routes::orders::update_status))
        .route("/products", post(routes::products::create))
        .route(
            "/products/{id}",
            put(routes::products::update).delete(routes::products::delete),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    let timeout = state.config.request_timeout;

    Router::new()
        .nest("/api/v1", public.merge(staff))
        .with_state(state.clone())
        .merge(metrics_router)
        .layer(middleware::map_response_with_state(
            state,
            error::expose_details,
        ))
        .layer(TimeoutLayer::new(timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
