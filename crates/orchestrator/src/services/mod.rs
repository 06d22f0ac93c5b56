//! External collaborator contracts and their in-memory test doubles.

pub mod gateway;
pub mod rates;
pub mod suggestions;

pub use gateway::{
    ConfirmationRequest, GatewayError, InMemoryPaymentGateway, PaymentGateway, PaymentSession,
    SessionRequest,
};
pub use rates::{
    InMemoryRateProvider, RateError, RateProvider, RateQuote, ShippingOption, ShippingOptionId,
};
pub use suggestions::{InMemorySuggestionProvider, Suggestion, SuggestionError, SuggestionProvider};
