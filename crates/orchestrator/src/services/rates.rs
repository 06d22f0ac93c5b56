//! Shipping-rate collaborator contract and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use checkout::ShippingAddress;
use common::{CurrencyCode, Money};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a shipping method offered by the rate collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShippingOptionId(String);

impl ShippingOptionId {
    /// Creates a new option ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the option ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ShippingOptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ShippingOptionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One shipping method in a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingOption {
    pub id: ShippingOptionId,
    pub name: String,
    pub amount: Money,
    pub currency: CurrencyCode,
    pub delivery_estimate: String,
}

/// A quote returned by the rate collaborator: the aggregate amount plus the
/// method list the shopper can pick from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuote {
    pub amount: Money,
    pub currency: CurrencyCode,
    pub options: Vec<ShippingOption>,
}

/// Errors from the rate collaborator.
#[derive(Debug, Clone, Error)]
pub enum RateError {
    /// Response did not match the expected contract.
    #[error("Malformed rate response: {0}")]
    Shape(String),

    /// Transport-level failure.
    #[error("Rate request failed: {0}")]
    Network(String),
}

/// Trait for the external shipping-rate collaborator.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Quotes shipping for an address and physical-items subtotal.
    async fn quote(&self, address: &ShippingAddress, subtotal: Money)
    -> Result<RateQuote, RateError>;
}

#[derive(Debug)]
struct RateState {
    options: Vec<ShippingOption>,
    fail_on_quote: bool,
    quote_calls: usize,
}

/// In-memory rate provider for testing.
#[derive(Debug, Clone)]
pub struct InMemoryRateProvider {
    state: Arc<RwLock<RateState>>,
}

impl InMemoryRateProvider {
    /// Creates a provider with a standard and an express method.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(RateState {
                options: vec![
                    ShippingOption {
                        id: ShippingOptionId::new("standard"),
                        name: "Standard".to_string(),
                        amount: Money::from_cents(495),
                        currency: CurrencyCode::eur(),
                        delivery_estimate: "2-4 business days".to_string(),
                    },
                    ShippingOption {
                        id: ShippingOptionId::new("express"),
                        name: "Express".to_string(),
                        amount: Money::from_cents(995),
                        currency: CurrencyCode::eur(),
                        delivery_estimate: "1-2 business days".to_string(),
                    },
                ],
                fail_on_quote: false,
                quote_calls: 0,
            })),
        }
    }

    /// Replaces the offered methods.
    pub fn set_options(&self, options: Vec<ShippingOption>) {
        self.state.write().unwrap().options = options;
    }

    /// Configures the provider to fail quote calls.
    pub fn set_fail_on_quote(&self, fail: bool) {
        self.state.write().unwrap().fail_on_quote = fail;
    }

    /// Returns how many quote calls were made.
    pub fn quote_calls(&self) -> usize {
        self.state.read().unwrap().quote_calls
    }
}

impl Default for InMemoryRateProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateProvider for InMemoryRateProvider {
    async fn quote(
        &self,
        _address: &ShippingAddress,
        _subtotal: Money,
    ) -> Result<RateQuote, RateError> {
        let mut state = self.state.write().unwrap();
        state.quote_calls += 1;

        if state.fail_on_quote {
            return Err(RateError::Network("rate service unavailable".to_string()));
        }

        let options = state.options.clone();
        let amount = options
            .first()
            .map(|option| option.amount)
            .unwrap_or_default();
        let currency = options
            .first()
            .map(|option| option.currency.clone())
            .unwrap_or_default();

        Ok(RateQuote {
            amount,
            currency,
            options,
        })
    }
}
