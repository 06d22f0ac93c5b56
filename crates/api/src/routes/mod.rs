//! Route handlers and shared application state.

pub mod cart;
pub mod checkout;
pub mod health;
pub mod metrics;

use std::sync::Arc;

use ::cart::CartStorage;
use orchestrator::{
    CheckoutFlow, InMemoryPaymentGateway, InMemoryRateProvider, InMemorySuggestionProvider,
};

/// The flow type the HTTP facade drives: pluggable cart storage, in-memory
/// collaborators for the external services.
pub type EngineFlow<S> =
    CheckoutFlow<S, InMemoryPaymentGateway, InMemoryRateProvider, InMemorySuggestionProvider>;

/// Shared application state accessible from all handlers.
pub struct AppState<S: CartStorage> {
    pub flow: Arc<EngineFlow<S>>,
    pub gateway: InMemoryPaymentGateway,
    pub rates: InMemoryRateProvider,
    pub suggestions: InMemorySuggestionProvider,
}
