//! Payment-session ownership and the speculative prefetch path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use cart::CartItem;
use checkout::{
    AppointmentPreference, CheckoutMessage, CheckoutStep, CustomerSnapshot, FulfillmentMode,
};
use common::Locale;

use crate::services::gateway::{PaymentGateway, PaymentSession, SessionRequest};
use crate::services::rates::ShippingOptionId;

/// Identity of the cart snapshot a session was built for.
///
/// A cached session is valid only while the fingerprint/locale pair it was
/// created under still matches the live cart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub fingerprint: String,
    pub locale: Locale,
}

impl SessionKey {
    /// Derives the key for the given cart contents and locale.
    pub fn derive(items: &[CartItem], locale: &Locale) -> Self {
        Self {
            fingerprint: cart::fingerprint(items),
            locale: locale.clone(),
        }
    }
}

/// The checkout snapshot a session request is built from.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub step: CheckoutStep,
    pub customer: CustomerSnapshot,
    pub items: Vec<CartItem>,
    pub locale: Locale,
    pub shipping_option: Option<ShippingOptionId>,
    pub fulfillment: FulfillmentMode,
    pub appointment: AppointmentPreference,
}

impl SessionContext {
    /// The fingerprint/locale key of this snapshot.
    pub fn key(&self) -> SessionKey {
        SessionKey::derive(&self.items, &self.locale)
    }

    fn to_request(&self) -> SessionRequest {
        SessionRequest {
            locale: self.locale.clone(),
            customer: self.customer.clone(),
            items: self.items.clone(),
            shipping_option: self.shipping_option.clone(),
            fulfillment: self.fulfillment,
            appointment: self.appointment,
        }
    }
}

/// Entry mode for session creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionOptions {
    /// Failures land in the prefetch slot instead of the surfaced slot.
    pub silent: bool,

    /// Skip the form-completeness guard (express path renders before the
    /// shopper finishes the form).
    pub allow_incomplete_form: bool,
}

impl SessionOptions {
    /// Explicit creation triggered by a step transition.
    pub fn explicit() -> Self {
        Self::default()
    }

    /// Background creation for the express payment path.
    pub fn speculative() -> Self {
        Self {
            silent: true,
            allow_incomplete_form: true,
        }
    }
}

/// What a creation attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// A fresh session is now stored.
    Created,

    /// Another request was already in flight; state untouched.
    AlreadyInFlight,

    /// A local guard refused the attempt before any network call.
    Rejected(CheckoutMessage),

    /// The gateway call failed; the message landed in the slot the entry
    /// mode selects.
    Failed(CheckoutMessage),

    /// Prefetch preconditions not met; nothing happened.
    Skipped,
}

#[derive(Debug, Default)]
struct SessionState {
    session: Option<(SessionKey, PaymentSession)>,
    surfaced_error: Option<CheckoutMessage>,
    prefetch_error: Option<CheckoutMessage>,
    prefetch_attempted: Option<SessionKey>,
}

/// Owns at most one valid gateway session per cart snapshot.
///
/// Concurrency model: a single atomic in-flight flag. Session creation has
/// no true cancellation, so a second call while one is pending is rejected
/// outright rather than racing toward a duplicate charge session.
pub struct PaymentSessionOrchestrator<G: PaymentGateway> {
    gateway: Arc<G>,
    state: Arc<Mutex<SessionState>>,
    in_flight: Arc<AtomicBool>,
}

impl<G: PaymentGateway> Clone for PaymentSessionOrchestrator<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            state: self.state.clone(),
            in_flight: self.in_flight.clone(),
        }
    }
}

/// Clears the in-flight flag when a creation attempt leaves scope.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<G: PaymentGateway> PaymentSessionOrchestrator<G> {
    /// Creates an orchestrator over the given gateway.
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            state: Arc::new(Mutex::new(SessionState::default())),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Attempts to create a session for the given snapshot.
    ///
    /// At most one request runs at a time; local guards resolve before any
    /// network call; failures are stored, never returned as hard errors.
    #[tracing::instrument(skip(self, ctx), fields(silent = options.silent))]
    pub async fn create_session(
        &self,
        ctx: &SessionContext,
        options: SessionOptions,
    ) -> SessionOutcome {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!("session creation already in flight, ignoring");
            return SessionOutcome::AlreadyInFlight;
        }
        let _guard = InFlightGuard(self.in_flight.clone());

        if !options.allow_incomplete_form && !ctx.customer.is_complete() {
            return self.refuse(options, CheckoutMessage::CompleteRequiredFields);
        }
        if ctx.items.is_empty() {
            return self.refuse(options, CheckoutMessage::CartEmpty);
        }

        let key = ctx.key();
        if options.silent {
            // The attempt counts for this key whether or not it succeeds.
            self.state.lock().unwrap().prefetch_attempted = Some(key.clone());
        }

        metrics::counter!("payment_sessions_requested_total").increment(1);
        let started = std::time::Instant::now();

        match self.gateway.create_session(ctx.to_request()).await {
            Ok(session) => {
                metrics::histogram!("payment_session_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                metrics::counter!("payment_sessions_created").increment(1);
                tracing::info!(order = ?session.order_number, "payment session created");

                let mut state = self.state.lock().unwrap();
                state.session = Some((key, session));
                state.surfaced_error = None;
                state.prefetch_error = None;
                SessionOutcome::Created
            }
            Err(error) => {
                metrics::counter!("payment_session_failures").increment(1);
                tracing::warn!(%error, silent = options.silent, "payment session creation failed");

                let message = error.to_message();
                let mut state = self.state.lock().unwrap();
                if options.silent {
                    state.prefetch_error = Some(message.clone());
                } else {
                    state.surfaced_error = Some(message.clone());
                }
                SessionOutcome::Failed(message)
            }
        }
    }

    /// Runs the speculative prefetch when its preconditions hold: on the
    /// information step, cart non-empty, no session, nothing in flight, and
    /// no prior attempt for the current key.
    pub async fn maybe_prefetch(&self, ctx: &SessionContext) -> SessionOutcome {
        if ctx.step != CheckoutStep::Information || ctx.items.is_empty() || self.is_in_flight() {
            return SessionOutcome::Skipped;
        }

        let key = ctx.key();
        {
            let state = self.state.lock().unwrap();
            if state.session.is_some() || state.prefetch_attempted.as_ref() == Some(&key) {
                return SessionOutcome::Skipped;
            }
        }

        metrics::counter!("payment_session_prefetch_total").increment(1);
        self.create_session(ctx, SessionOptions::speculative()).await
    }

    /// Reconciles stored state with the live fingerprint/locale key: a
    /// stale session is discarded and the prefetch slot re-arms.
    pub fn sync_key(&self, key: &SessionKey) {
        let mut state = self.state.lock().unwrap();

        if state.session.as_ref().is_some_and(|(held, _)| held != key) {
            tracing::debug!("discarding payment session for stale cart snapshot");
            state.session = None;
        }
        if state.prefetch_attempted.as_ref().is_some_and(|held| held != key) {
            state.prefetch_attempted = None;
            state.prefetch_error = None;
        }
    }

    /// Applies step-change side effects: returning to the information step
    /// discards the active session.
    pub fn handle_step_change(&self, step: CheckoutStep) {
        if step == CheckoutStep::Information {
            let mut state = self.state.lock().unwrap();
            if state.session.take().is_some() {
                tracing::debug!("discarding payment session on return to information step");
            }
        }
    }

    /// Drops all session state, e.g. after order completion.
    pub fn reset(&self) {
        *self.state.lock().unwrap() = SessionState::default();
    }

    /// The currently held session, if any.
    pub fn session(&self) -> Option<PaymentSession> {
        self.state
            .lock()
            .unwrap()
            .session
            .as_ref()
            .map(|(_, session)| session.clone())
    }

    /// The error from the last explicit attempt, if any.
    pub fn surfaced_error(&self) -> Option<CheckoutMessage> {
        self.state.lock().unwrap().surfaced_error.clone()
    }

    /// The error from the last silent prefetch attempt, if any.
    pub fn prefetch_error(&self) -> Option<CheckoutMessage> {
        self.state.lock().unwrap().prefetch_error.clone()
    }

    /// True while a creation request is pending.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn refuse(&self, options: SessionOptions, message: CheckoutMessage) -> SessionOutcome {
        if !options.silent {
            self.state.lock().unwrap().surfaced_error = Some(message.clone());
        }
        SessionOutcome::Rejected(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::gateway::{GatewayError, InMemoryPaymentGateway};
    use cart::{CartItemDraft, normalize_list};

    fn items() -> Vec<CartItem> {
        normalize_list(vec![CartItemDraft {
            unit_price: Some(25.0),
            quantity: Some(2.0),
            ..CartItemDraft::new("sku-1", "Widget")
        }])
    }

    fn complete_customer() -> CustomerSnapshot {
        CustomerSnapshot {
            email: "ana@example.com".to_string(),
            first_name: "Ana".to_string(),
            last_name: "García".to_string(),
            address: "Calle Mayor 1".to_string(),
            postal_code: "28001".to_string(),
            city: "Madrid".to_string(),
            province: "Madrid".to_string(),
            phone: "+34 600 000 000".to_string(),
        }
    }

    fn ctx(step: CheckoutStep, customer: CustomerSnapshot, items: Vec<CartItem>) -> SessionContext {
        SessionContext {
            step,
            customer,
            items,
            locale: Locale::default(),
            shipping_option: None,
            fulfillment: FulfillmentMode::Shipping,
            appointment: AppointmentPreference::follow_up(),
        }
    }

    fn orchestrator() -> (
        PaymentSessionOrchestrator<InMemoryPaymentGateway>,
        InMemoryPaymentGateway,
    ) {
        let gateway = InMemoryPaymentGateway::new();
        (
            PaymentSessionOrchestrator::new(Arc::new(gateway.clone())),
            gateway,
        )
    }

    #[tokio::test]
    async fn test_explicit_creation_stores_session() {
        let (orchestrator, gateway) = orchestrator();
        let ctx = ctx(CheckoutStep::Payment, complete_customer(), items());

        let outcome = orchestrator
            .create_session(&ctx, SessionOptions::explicit())
            .await;

        assert_eq!(outcome, SessionOutcome::Created);
        assert!(orchestrator.session().is_some());
        assert!(orchestrator.surfaced_error().is_none());
        assert_eq!(gateway.create_calls(), 1);
        assert!(!orchestrator.is_in_flight());
    }

    #[tokio::test]
    async fn test_incomplete_form_is_rejected_locally() {
        let (orchestrator, gateway) = orchestrator();
        let ctx = ctx(CheckoutStep::Payment, CustomerSnapshot::default(), items());

        let outcome = orchestrator
            .create_session(&ctx, SessionOptions::explicit())
            .await;

        assert_eq!(
            outcome,
            SessionOutcome::Rejected(CheckoutMessage::CompleteRequiredFields)
        );
        assert_eq!(
            orchestrator.surfaced_error(),
            Some(CheckoutMessage::CompleteRequiredFields)
        );
        // Local guards never reach the network layer.
        assert_eq!(gateway.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected_locally() {
        let (orchestrator, gateway) = orchestrator();
        let ctx = ctx(CheckoutStep::Payment, complete_customer(), vec![]);

        let outcome = orchestrator
            .create_session(&ctx, SessionOptions::explicit())
            .await;

        assert_eq!(outcome, SessionOutcome::Rejected(CheckoutMessage::CartEmpty));
        assert_eq!(gateway.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_silent_rejection_stays_silent() {
        let (orchestrator, _) = orchestrator();
        let ctx = ctx(CheckoutStep::Information, complete_customer(), vec![]);

        let outcome = orchestrator
            .create_session(&ctx, SessionOptions::speculative())
            .await;

        assert_eq!(outcome, SessionOutcome::Rejected(CheckoutMessage::CartEmpty));
        assert!(orchestrator.surfaced_error().is_none());
        assert!(orchestrator.prefetch_error().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_creation_leaves_state_untouched() {
        let (orchestrator, gateway) = orchestrator();
        gateway.hold_create();

        let first = tokio::spawn({
            let orchestrator = orchestrator.clone();
            let ctx = ctx(CheckoutStep::Payment, complete_customer(), items());
            async move { orchestrator.create_session(&ctx, SessionOptions::explicit()).await }
        });
        tokio::task::yield_now().await;
        assert!(orchestrator.is_in_flight());

        // A second call while one is pending is a pure no-op.
        let second = orchestrator
            .create_session(
                &ctx(CheckoutStep::Payment, complete_customer(), items()),
                SessionOptions::explicit(),
            )
            .await;
        assert_eq!(second, SessionOutcome::AlreadyInFlight);
        assert!(orchestrator.session().is_none());

        gateway.release_create();
        assert_eq!(first.await.unwrap(), SessionOutcome::Created);
        assert_eq!(gateway.create_calls(), 1);
        assert!(orchestrator.session().is_some());
    }

    #[tokio::test]
    async fn test_prefetch_runs_once_per_key() {
        let (orchestrator, gateway) = orchestrator();
        let ctx = ctx(CheckoutStep::Information, CustomerSnapshot::default(), items());

        assert_eq!(
            orchestrator.maybe_prefetch(&ctx).await,
            SessionOutcome::Created
        );
        assert_eq!(gateway.create_calls(), 1);

        // Session exists now; same key never prefetches again.
        orchestrator.handle_step_change(CheckoutStep::Information);
        assert_eq!(
            orchestrator.maybe_prefetch(&ctx).await,
            SessionOutcome::Skipped
        );
        assert_eq!(gateway.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_prefetch_allows_incomplete_form() {
        let (orchestrator, _) = orchestrator();
        let ctx = ctx(CheckoutStep::Information, CustomerSnapshot::default(), items());

        assert_eq!(
            orchestrator.maybe_prefetch(&ctx).await,
            SessionOutcome::Created
        );
    }

    #[tokio::test]
    async fn test_prefetch_skips_off_information_step() {
        let (orchestrator, gateway) = orchestrator();
        let ctx = ctx(CheckoutStep::Shipping, complete_customer(), items());

        assert_eq!(
            orchestrator.maybe_prefetch(&ctx).await,
            SessionOutcome::Skipped
        );
        assert_eq!(gateway.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_prefetch_rearms_on_key_change() {
        let (orchestrator, gateway) = orchestrator();
        gateway.set_fail_on_create(Some(GatewayError::Network("down".to_string())));

        let first = ctx(CheckoutStep::Information, CustomerSnapshot::default(), items());
        let outcome = orchestrator.maybe_prefetch(&first).await;
        assert_eq!(
            outcome,
            SessionOutcome::Failed(CheckoutMessage::PaymentUnavailable)
        );
        assert_eq!(
            orchestrator.prefetch_error(),
            Some(CheckoutMessage::PaymentUnavailable)
        );
        // Failed prefetch never surfaces.
        assert!(orchestrator.surfaced_error().is_none());

        // Same key: attempted already, no retry.
        assert_eq!(
            orchestrator.maybe_prefetch(&first).await,
            SessionOutcome::Skipped
        );
        assert_eq!(gateway.create_calls(), 1);

        // Changed cart: flag and error reset, prefetch re-arms.
        let mut changed_items = items();
        changed_items[0].quantity = 5;
        let second = ctx(
            CheckoutStep::Information,
            CustomerSnapshot::default(),
            changed_items,
        );
        orchestrator.sync_key(&second.key());
        assert!(orchestrator.prefetch_error().is_none());

        gateway.set_fail_on_create(None);
        assert_eq!(
            orchestrator.maybe_prefetch(&second).await,
            SessionOutcome::Created
        );
    }

    #[tokio::test]
    async fn test_failed_prefetch_does_not_block_explicit_retry() {
        let (orchestrator, gateway) = orchestrator();
        gateway.set_fail_on_create(Some(GatewayError::Network("down".to_string())));

        let info = ctx(CheckoutStep::Information, CustomerSnapshot::default(), items());
        orchestrator.maybe_prefetch(&info).await;
        assert!(orchestrator.prefetch_error().is_some());

        gateway.set_fail_on_create(None);
        let payment = ctx(CheckoutStep::Payment, complete_customer(), items());
        let outcome = orchestrator
            .create_session(&payment, SessionOptions::explicit())
            .await;

        assert_eq!(outcome, SessionOutcome::Created);
        assert!(orchestrator.prefetch_error().is_none());
        assert!(orchestrator.surfaced_error().is_none());
    }

    #[tokio::test]
    async fn test_conflict_classification_reaches_surfaced_slot() {
        let (orchestrator, gateway) = orchestrator();
        gateway.set_fail_on_create(Some(GatewayError::InsufficientStock {
            available: 1,
            requested: 3,
            message: None,
        }));

        let payment = ctx(CheckoutStep::Payment, complete_customer(), items());
        let outcome = orchestrator
            .create_session(&payment, SessionOptions::explicit())
            .await;

        match outcome {
            SessionOutcome::Failed(CheckoutMessage::InsufficientStock {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available, 1);
                assert_eq!(requested, 3);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(orchestrator.surfaced_error().is_some());
        assert!(orchestrator.prefetch_error().is_none());
    }

    #[tokio::test]
    async fn test_session_discarded_on_key_change() {
        let (orchestrator, _) = orchestrator();
        let payment = ctx(CheckoutStep::Payment, complete_customer(), items());
        orchestrator
            .create_session(&payment, SessionOptions::explicit())
            .await;
        assert!(orchestrator.session().is_some());

        // Same key: nothing happens.
        orchestrator.sync_key(&payment.key());
        assert!(orchestrator.session().is_some());

        // Locale change invalidates too.
        let other_key = SessionKey::derive(&payment.items, &Locale::new("es"));
        orchestrator.sync_key(&other_key);
        assert!(orchestrator.session().is_none());
    }

    #[tokio::test]
    async fn test_session_discarded_on_return_to_information() {
        let (orchestrator, _) = orchestrator();
        let payment = ctx(CheckoutStep::Payment, complete_customer(), items());
        orchestrator
            .create_session(&payment, SessionOptions::explicit())
            .await;

        orchestrator.handle_step_change(CheckoutStep::Shipping);
        assert!(orchestrator.session().is_some());

        orchestrator.handle_step_change(CheckoutStep::Information);
        assert!(orchestrator.session().is_none());
    }
}
