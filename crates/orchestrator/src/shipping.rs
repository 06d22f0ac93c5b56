//! Debounced, cancellable shipping-quote integration.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cart::CartItem;
use checkout::{CustomerSnapshot, FulfillmentMode, ShippingAddress};
use common::{CurrencyCode, Money};

use crate::services::rates::{RateProvider, RateQuote, ShippingOption, ShippingOptionId};

/// How long an input must stay stable before the rate collaborator is
/// called.
pub const QUOTE_DEBOUNCE: Duration = Duration::from_millis(400);

/// The inputs a quote depends on, captured at refresh time.
#[derive(Debug, Clone)]
pub struct QuoteInputs {
    pub fulfillment: FulfillmentMode,
    pub address: Option<ShippingAddress>,
    pub item_count: u32,
    pub has_physical_items: bool,
    pub physical_subtotal: Money,
}

impl QuoteInputs {
    /// Captures quote inputs from the live cart and customer snapshot.
    pub fn from_cart(
        items: &[CartItem],
        customer: &CustomerSnapshot,
        fulfillment: FulfillmentMode,
    ) -> Self {
        Self {
            fulfillment,
            address: customer.shipping_address(),
            item_count: cart::item_count(items),
            has_physical_items: cart::has_physical_items(items),
            physical_subtotal: cart::physical_subtotal(items),
        }
    }

    /// True when a quote is both needed and computable: shipping
    /// fulfillment with at least one physical item, a complete address, a
    /// non-empty cart, and a positive physical subtotal.
    pub fn requires_quote(&self) -> bool {
        self.fulfillment == FulfillmentMode::Shipping
            && self.has_physical_items
            && self.address.is_some()
            && self.item_count > 0
            && self.physical_subtotal.is_positive()
    }
}

/// The quote state observers render from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuoteSnapshot {
    /// Aggregate shipping amount; `None` means "no quote".
    pub amount: Option<Money>,

    /// Currency of the aggregate amount.
    pub currency: Option<CurrencyCode>,

    /// Methods the shopper can pick from.
    pub options: Vec<ShippingOption>,

    /// Selected method; survives refreshes only while its id is present.
    pub selected: Option<ShippingOptionId>,
}

/// Keeps the shipping amount and method list consistent with the current
/// address and physical subtotal without over-calling the rate collaborator.
///
/// Every [`Self::refresh`] bumps a generation counter; pending debounces and
/// in-flight requests belonging to older generations discard their result,
/// so only the response to the most recent inputs is ever applied.
pub struct ShippingQuoteEngine<R: RateProvider> {
    provider: Arc<R>,
    state: Arc<Mutex<QuoteSnapshot>>,
    generation: Arc<AtomicU64>,
    debounce: Duration,
}

impl<R: RateProvider> Clone for ShippingQuoteEngine<R> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            state: self.state.clone(),
            generation: self.generation.clone(),
            debounce: self.debounce,
        }
    }
}

impl<R: RateProvider + 'static> ShippingQuoteEngine<R> {
    /// Creates an engine with the default debounce.
    pub fn new(provider: Arc<R>) -> Self {
        Self::with_debounce(provider, QUOTE_DEBOUNCE)
    }

    /// Creates an engine with a custom debounce window.
    pub fn with_debounce(provider: Arc<R>, debounce: Duration) -> Self {
        Self {
            provider,
            state: Arc::new(Mutex::new(QuoteSnapshot::default())),
            generation: Arc::new(AtomicU64::new(0)),
            debounce,
        }
    }

    /// Reacts to a dependency change.
    ///
    /// Supersedes any pending debounce or in-flight request. When the
    /// trigger condition fails the state resets to "no quote" immediately,
    /// with no collaborator call; otherwise a debounced refresh is spawned.
    pub fn refresh(&self, inputs: QuoteInputs) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if !inputs.requires_quote() {
            let mut state = self.state.lock().unwrap();
            if *state != QuoteSnapshot::default() {
                tracing::debug!("shipping quote reset, trigger condition no longer holds");
                metrics::counter!("shipping_quote_resets_total").increment(1);
            }
            *state = QuoteSnapshot::default();
            return;
        }

        let engine = self.clone();
        tokio::spawn(async move {
            engine.run_refresh(generation, inputs).await;
        });
    }

    /// Selects a method; refused when the id is not in the current list.
    pub fn select(&self, id: &ShippingOptionId) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.options.iter().any(|option| &option.id == id) {
            state.selected = Some(id.clone());
            true
        } else {
            false
        }
    }

    /// The current quote state.
    pub fn snapshot(&self) -> QuoteSnapshot {
        self.state.lock().unwrap().clone()
    }

    async fn run_refresh(&self, generation: u64, inputs: QuoteInputs) {
        tokio::time::sleep(self.debounce).await;
        if self.generation.load(Ordering::SeqCst) != generation {
            // Superseded mid-debounce.
            return;
        }

        let Some(address) = inputs.address else {
            return;
        };

        metrics::counter!("shipping_quote_requests_total").increment(1);
        let result = self
            .provider
            .quote(&address, inputs.physical_subtotal)
            .await;

        match result {
            Ok(quote) => self.commit(generation, Some(quote)),
            Err(error) => {
                tracing::warn!(%error, "shipping quote failed, resetting to no quote");
                self.commit(generation, None);
            }
        }
    }

    /// Applies a refresh outcome, unless a newer generation superseded it.
    fn commit(&self, generation: u64, outcome: Option<RateQuote>) {
        let mut state = self.state.lock().unwrap();
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("discarding superseded shipping quote response");
            return;
        }

        match outcome {
            Some(quote) => {
                let keep = state
                    .selected
                    .take()
                    .filter(|id| quote.options.iter().any(|option| &option.id == id));
                state.selected = keep.or_else(|| quote.options.first().map(|o| o.id.clone()));
                state.amount = Some(quote.amount);
                state.currency = Some(quote.currency);
                state.options = quote.options;
            }
            None => *state = QuoteSnapshot::default(),
        }
    }
}
