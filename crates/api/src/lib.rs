//! HTTP API server for the storefront order core.
//!
//! Provides REST endpoints for products, carts, checkout and orders,
//! with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use doc_store::DocumentStore;
use domain::{
    CartService, CheckoutService, EventPublisher, OrderService, StockLedger, StoreProductCatalog,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: DocumentStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health))
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::create::<S>),
        )
        .route("/orders/history", get(routes::orders::history::<S>))
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>)
                .put(routes::orders::update_status::<S>)
                .delete(routes::orders::remove::<S>),
        )
        .route(
            "/orders/{id}/return",
            post(routes::orders::request_return::<S>),
        )
        .route("/cart", get(routes::carts::items::<S>))
        .route("/cart/items", post(routes::carts::add_item::<S>))
        .route(
            "/cart/items/{line_id}",
            put(routes::carts::update_item::<S>).delete(routes::carts::remove_item::<S>),
        )
        .route("/cart/total", get(routes::carts::total::<S>))
        .route("/cart/checkout", post(routes::carts::checkout::<S>))
        .route("/products", post(routes::products::create::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the domain services over a document store.
///
/// Order events go to `publisher`; policies come from `config`.
pub fn create_default_state<S: DocumentStore + Clone + 'static>(
    store: S,
    config: &Config,
    publisher: Arc<dyn EventPublisher>,
) -> Arc<AppState<S>> {
    let catalog = StoreProductCatalog::new(store.clone());
    let lookup = Arc::new(catalog.clone());

    let carts = CartService::new(store.clone(), lookup.clone());
    let orders = OrderService::new(store.clone(), lookup.clone())
        .with_publisher(publisher)
        .with_policy(config.order_policy())
        .with_transitions(config.transition_table());
    let ledger = StockLedger::new(store, config.stock_policy());
    let checkout = CheckoutService::new(carts.clone(), orders.clone(), ledger, lookup);

    Arc::new(AppState {
        catalog,
        carts,
        orders,
        checkout,
    })
}
