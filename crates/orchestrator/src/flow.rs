//! The checkout flow: wires the cart, step machine, payment sessions,
//! shipping quotes, and suggestions together.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cart::{CartItem, CartSignal, CartStorage, CartStore, FreeShippingProgress};
use checkout::{
    AppointmentPreference, CheckoutMessage, CheckoutStep, CustomerSnapshot, FulfillmentMode,
    StepContext, StepIntent, Transition, transition,
};
use common::{Locale, Money};
use tokio::sync::broadcast::error::RecvError;

use crate::error::Result;
use crate::recommend::RecommendationFetcher;
use crate::services::gateway::{ConfirmationRequest, PaymentGateway, PaymentSession};
use crate::services::rates::{RateProvider, ShippingOptionId};
use crate::services::suggestions::{Suggestion, SuggestionProvider};
use crate::session::{PaymentSessionOrchestrator, SessionContext, SessionKey, SessionOptions};
use crate::shipping::{QUOTE_DEBOUNCE, QuoteInputs, QuoteSnapshot, ShippingQuoteEngine};

/// Flow-level configuration.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Locale forwarded to every collaborator request.
    pub locale: Locale,

    /// Physical-subtotal threshold that unlocks free shipping.
    pub free_shipping_threshold: Money,

    /// Debounce window for shipping-quote refreshes.
    pub quote_debounce: Duration,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            free_shipping_threshold: Money::from_major(60),
            quote_debounce: QUOTE_DEBOUNCE,
        }
    }
}

#[derive(Debug, Default)]
struct FlowState {
    step: CheckoutStep,
    customer: CustomerSnapshot,
    fulfillment: FulfillmentMode,
    appointment: AppointmentPreference,
}

/// Drives one shopper's checkout over a shared cart.
///
/// Reacts to every cart change by re-keying the session orchestrator,
/// refreshing the quote engine and the suggestion fetcher, and attempting
/// the speculative session prefetch; [`Self::advance`] runs the step
/// machine and performs the session side effects the transitions call for.
pub struct CheckoutFlow<S, G, R, P>
where
    S: CartStorage,
    G: PaymentGateway,
    R: RateProvider + 'static,
    P: SuggestionProvider + 'static,
{
    cart: Arc<CartStore<S>>,
    gateway: Arc<G>,
    sessions: PaymentSessionOrchestrator<G>,
    quotes: ShippingQuoteEngine<R>,
    suggestions: RecommendationFetcher<P>,
    state: Mutex<FlowState>,
    config: FlowConfig,
}

impl<S, G, R, P> CheckoutFlow<S, G, R, P>
where
    S: CartStorage,
    G: PaymentGateway,
    R: RateProvider + 'static,
    P: SuggestionProvider + 'static,
{
    /// Creates a flow over the given cart and collaborators.
    pub fn new(
        cart: Arc<CartStore<S>>,
        gateway: G,
        rates: R,
        suggestions: P,
        config: FlowConfig,
    ) -> Self {
        let gateway = Arc::new(gateway);
        Self {
            sessions: PaymentSessionOrchestrator::new(gateway.clone()),
            quotes: ShippingQuoteEngine::with_debounce(Arc::new(rates), config.quote_debounce),
            suggestions: RecommendationFetcher::new(Arc::new(suggestions)),
            cart,
            gateway,
            state: Mutex::new(FlowState::default()),
            config,
        }
    }

    /// The shared cart store this flow observes.
    pub fn cart(&self) -> &Arc<CartStore<S>> {
        &self.cart
    }

    /// The step the shopper is on.
    pub fn step(&self) -> CheckoutStep {
        self.state.lock().unwrap().step
    }

    /// The current customer snapshot.
    pub fn customer(&self) -> CustomerSnapshot {
        self.state.lock().unwrap().customer.clone()
    }

    /// The active payment session, if any.
    pub fn session(&self) -> Option<PaymentSession> {
        self.sessions.session()
    }

    /// The error from the last explicit session attempt, if any.
    pub fn session_error(&self) -> Option<CheckoutMessage> {
        self.sessions.surfaced_error()
    }

    /// The error from the last silent prefetch attempt, if any.
    pub fn prefetch_error(&self) -> Option<CheckoutMessage> {
        self.sessions.prefetch_error()
    }

    /// True when the express payment path can render: still on the
    /// information step with a prefetched session in hand.
    pub fn express_ready(&self) -> bool {
        self.step() == CheckoutStep::Information && self.sessions.session().is_some()
    }

    /// The current shipping-quote state.
    pub fn quote(&self) -> QuoteSnapshot {
        self.quotes.snapshot()
    }

    /// The current upsell suggestion, if any.
    pub fn suggestion(&self) -> Option<Suggestion> {
        self.suggestions.current()
    }

    /// Progress toward free shipping, from the physical subtotal.
    pub async fn free_shipping(&self) -> Result<Option<FreeShippingProgress>> {
        let items = self.cart.read().await?;
        Ok(cart::free_shipping_progress(
            &items,
            self.config.free_shipping_threshold,
        ))
    }

    /// Updates the customer snapshot; address edits re-trigger quoting.
    pub async fn set_customer(&self, customer: CustomerSnapshot) -> Result<()> {
        {
            self.state.lock().unwrap().customer = customer;
        }
        self.refresh_quotes().await
    }

    /// Updates the fulfillment mode; pickup drops the quote immediately.
    pub async fn set_fulfillment(&self, mode: FulfillmentMode) -> Result<()> {
        {
            self.state.lock().unwrap().fulfillment = mode;
        }
        self.refresh_quotes().await
    }

    /// Updates the service-appointment preference.
    pub fn set_appointment(&self, preference: AppointmentPreference) {
        self.state.lock().unwrap().appointment = preference;
    }

    /// Selects a shipping method from the quoted list.
    pub fn select_shipping_option(&self, id: &ShippingOptionId) -> bool {
        self.quotes.select(id)
    }

    /// Runs the step machine and performs session side effects.
    ///
    /// Entering `payment` triggers an explicit session creation (unless a
    /// prefetched session for the current snapshot survived); returning to
    /// `information` discards the active session.
    #[tracing::instrument(skip(self))]
    pub async fn advance(&self, intent: StepIntent) -> Result<Transition> {
        let items = self.cart.read().await?;
        let current = self.step();
        let ctx = StepContext {
            is_form_complete: self.customer().is_complete(),
            item_count: cart::item_count(&items),
            busy: self.sessions.is_in_flight(),
        };

        let result = transition(current, intent, &ctx);
        if result.error.is_some() || result.next == current {
            return Ok(result);
        }

        {
            self.state.lock().unwrap().step = result.next;
        }
        tracing::info!(from = %current, to = %result.next, "checkout step changed");
        self.sessions.handle_step_change(result.next);

        if result.next == CheckoutStep::Payment && self.sessions.session().is_none() {
            let ctx = self.session_context(items);
            self.sessions
                .create_session(&ctx, SessionOptions::explicit())
                .await;
        }

        Ok(result)
    }

    /// Reconciles every reactive component with the live cart. Called from
    /// the cart listener on each change signal.
    pub async fn on_cart_changed(&self) -> Result<()> {
        let items = self.cart.read().await?;

        let key = SessionKey::derive(&items, &self.config.locale);
        self.sessions.sync_key(&key);

        let (customer, fulfillment) = {
            let state = self.state.lock().unwrap();
            (state.customer.clone(), state.fulfillment)
        };
        self.quotes
            .refresh(QuoteInputs::from_cart(&items, &customer, fulfillment));
        self.suggestions
            .refresh(items.first().map(|item| item.id.clone()));

        let ctx = self.session_context(items);
        self.sessions.maybe_prefetch(&ctx).await;
        Ok(())
    }

    /// Subscribes to cart signals and keeps the flow in sync until the
    /// store is dropped.
    pub fn spawn_cart_listener(self: &Arc<Self>) -> tokio::task::JoinHandle<()>
    where
        S: 'static,
        G: 'static,
    {
        let flow = Arc::clone(self);
        let mut signals = flow.cart.subscribe();

        tokio::spawn(async move {
            loop {
                match signals.recv().await {
                    Ok(CartSignal::Changed) => {
                        if let Err(error) = flow.on_cart_changed().await {
                            tracing::warn!(%error, "cart refresh failed");
                        }
                    }
                    Ok(CartSignal::OpenRequested) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "cart listener lagged, re-reading");
                        if let Err(error) = flow.on_cart_changed().await {
                            tracing::warn!(%error, "cart refresh failed");
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Finishes the order after gateway-side payment success: best-effort
    /// confirmation, cart clear, and reset to the information step.
    #[tracing::instrument(skip(self, payment_intent_id))]
    pub async fn complete_order(&self, payment_intent_id: &str) -> Result<()> {
        if let Some(order_id) = self.sessions.session().and_then(|session| session.order_id) {
            let request = ConfirmationRequest {
                order_id,
                payment_intent_id: payment_intent_id.to_string(),
                locale: self.config.locale.clone(),
            };
            if let Err(error) = self.gateway.confirm(request).await {
                // Tolerated: the order system has a server-side fallback.
                tracing::warn!(%error, "order confirmation failed");
            }
        }

        self.sessions.reset();
        {
            self.state.lock().unwrap().step = CheckoutStep::Information;
        }
        self.cart.clear().await?;

        metrics::counter!("orders_completed_total").increment(1);
        tracing::info!("order completed, cart cleared");
        Ok(())
    }

    fn session_context(&self, items: Vec<CartItem>) -> SessionContext {
        let state = self.state.lock().unwrap();
        SessionContext {
            step: state.step,
            customer: state.customer.clone(),
            items,
            locale: self.config.locale.clone(),
            shipping_option: self.quotes.snapshot().selected,
            fulfillment: state.fulfillment,
            appointment: state.appointment,
        }
    }

    async fn refresh_quotes(&self) -> Result<()> {
        let items = self.cart.read().await?;
        let (customer, fulfillment) = {
            let state = self.state.lock().unwrap();
            (state.customer.clone(), state.fulfillment)
        };
        self.quotes
            .refresh(QuoteInputs::from_cart(&items, &customer, fulfillment));
        Ok(())
    }
}
