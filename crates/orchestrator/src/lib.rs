//! Checkout orchestration: payment sessions, shipping quotes, and the flow
//! that keeps them consistent with the cart.
//!
//! Three asynchronous, mutually-dependent processes have to stay coherent
//! under rapid edits: the persisted cart, a payment session tied to one cart
//! snapshot, and an address-dependent shipping quote. The pieces here keep
//! them honest:
//! - [`PaymentSessionOrchestrator`] owns at most one gateway session per
//!   cart-fingerprint/locale key, with a speculative prefetch path and an
//!   atomic in-flight guard against duplicate charge sessions,
//! - [`ShippingQuoteEngine`] debounces rate lookups and discards every
//!   response whose generation was superseded,
//! - [`RecommendationFetcher`] fetches a single upsell suggestion,
//! - [`CheckoutFlow`] subscribes to cart signals and drives all of the
//!   above plus the step machine.

pub mod error;
pub mod flow;
pub mod recommend;
pub mod services;
pub mod session;
pub mod shipping;

pub use error::{OrchestratorError, Result};
pub use flow::{CheckoutFlow, FlowConfig};
pub use recommend::RecommendationFetcher;
pub use services::{
    ConfirmationRequest, GatewayError, InMemoryPaymentGateway, InMemoryRateProvider,
    InMemorySuggestionProvider, PaymentGateway, PaymentSession, RateError, RateProvider,
    RateQuote, SessionRequest, ShippingOption, ShippingOptionId, Suggestion, SuggestionError,
    SuggestionProvider,
};
pub use session::{
    PaymentSessionOrchestrator, SessionContext, SessionKey, SessionOptions, SessionOutcome,
};
pub use shipping::{QuoteInputs, QuoteSnapshot, ShippingQuoteEngine};
