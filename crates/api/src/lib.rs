//! HTTP facade with observability for the checkout engine.
//!
//! Exposes the cart, checkout step machine, payment sessions, and shipping
//! quotes over REST, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use cart::{CartStorage, CartStore, InMemoryCartStorage};
use metrics_exporter_prometheus::PrometheusHandle;
use orchestrator::{
    CheckoutFlow, FlowConfig, InMemoryPaymentGateway, InMemoryRateProvider,
    InMemorySuggestionProvider,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: CartStorage + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/cart", get(routes::cart::get_cart::<S>))
        .route("/cart", delete(routes::cart::clear::<S>))
        .route("/cart/open", post(routes::cart::open::<S>))
        .route("/cart/items", post(routes::cart::add_item::<S>))
        .route("/cart/items/{id}", delete(routes::cart::remove_item::<S>))
        .route("/cart/items/{id}/increment", post(routes::cart::increment::<S>))
        .route("/cart/items/{id}/decrement", post(routes::cart::decrement::<S>))
        .route("/checkout", get(routes::checkout::get_state::<S>))
        .route("/checkout/customer", put(routes::checkout::set_customer::<S>))
        .route(
            "/checkout/fulfillment",
            put(routes::checkout::set_fulfillment::<S>),
        )
        .route(
            "/checkout/appointment",
            put(routes::checkout::set_appointment::<S>),
        )
        .route(
            "/checkout/shipping-option",
            put(routes::checkout::select_shipping::<S>),
        )
        .route("/checkout/advance", post(routes::checkout::advance::<S>))
        .route("/checkout/complete", post(routes::checkout::complete::<S>))
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

/// Creates application state over the given cart storage, wiring the flow
/// and spawning its cart listener.
pub fn create_state<S: CartStorage + 'static>(
    storage: S,
    config: &Config,
) -> (Arc<AppState<S>>, tokio::task::JoinHandle<()>) {
    let cart = Arc::new(CartStore::new(storage));
    let gateway = InMemoryPaymentGateway::new();
    let rates = InMemoryRateProvider::new();
    let suggestions = InMemorySuggestionProvider::new();

    let flow = Arc::new(CheckoutFlow::new(
        cart,
        gateway.clone(),
        rates.clone(),
        suggestions.clone(),
        FlowConfig {
            locale: config.locale.clone(),
            free_shipping_threshold: config.free_shipping_threshold,
            quote_debounce: config.quote_debounce,
        },
    ));
    let listener = flow.spawn_cart_listener();

    let state = Arc::new(AppState {
        flow,
        gateway,
        rates,
        suggestions,
    });

    (state, listener)
}

/// Creates the default application state over in-memory cart storage.
pub fn create_default_state(
    config: &Config,
) -> (
    Arc<AppState<InMemoryCartStorage>>,
    tokio::task::JoinHandle<()>,
) {
    create_state(InMemoryCartStorage::new(), config)
}
