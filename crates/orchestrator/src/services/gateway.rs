//! Payment gateway collaborator contract and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use cart::CartItem;
use checkout::{AppointmentPreference, CheckoutMessage, CustomerSnapshot, FulfillmentMode};
use common::Locale;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Notify;
use uuid::Uuid;

use super::rates::ShippingOptionId;

/// Everything the gateway needs to open a checkout session for one cart
/// snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRequest {
    pub locale: Locale,
    pub customer: CustomerSnapshot,
    pub items: Vec<CartItem>,
    pub shipping_option: Option<ShippingOptionId>,
    pub fulfillment: FulfillmentMode,
    pub appointment: AppointmentPreference,
}

/// A checkout session issued by the gateway.
///
/// Immutable once issued; the orchestrator discards and re-creates rather
/// than mutating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub client_secret: String,
    pub publishable_key: String,
    pub order_id: Option<String>,
    pub order_number: Option<String>,
}

/// Best-effort confirmation fired after gateway-side payment success.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmationRequest {
    pub order_id: String,
    pub payment_intent_id: String,
    pub locale: Locale,
}

/// Errors from the payment gateway collaborator.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// 409 with a non-empty `missing` list: items no longer sold.
    #[error("Items unavailable: {missing:?}")]
    ItemsUnavailable { missing: Vec<String> },

    /// 409 with `available`/`requested` numbers: not enough stock.
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        available: u32,
        requested: u32,
        message: Option<String>,
    },

    /// Response body did not match the expected contract. Non-retryable and
    /// deliberately distinct from a network failure.
    #[error("Malformed gateway response: {0}")]
    Shape(String),

    /// Transport-level or otherwise unclassified failure.
    #[error("Gateway request failed: {0}")]
    Network(String),
}

impl GatewayError {
    /// Classifies a raw gateway response into the error taxonomy.
    ///
    /// The single place wire status codes and body shapes are interpreted;
    /// everything downstream deals in typed errors only.
    pub fn from_response(status: u16, body: &serde_json::Value) -> Self {
        if status == 409 {
            if let Some(missing) = body.get("missing").and_then(|value| value.as_array()) {
                let missing: Vec<String> = missing
                    .iter()
                    .filter_map(|value| value.as_str().map(String::from))
                    .collect();
                if !missing.is_empty() {
                    return GatewayError::ItemsUnavailable { missing };
                }
            }

            let available = body.get("available").and_then(|value| value.as_u64());
            let requested = body.get("requested").and_then(|value| value.as_u64());
            if let (Some(available), Some(requested)) = (available, requested) {
                return GatewayError::InsufficientStock {
                    available: available.min(u32::MAX as u64) as u32,
                    requested: requested.min(u32::MAX as u64) as u32,
                    message: body
                        .get("message")
                        .and_then(|value| value.as_str())
                        .map(String::from),
                };
            }

            return GatewayError::Shape("conflict body matches no known shape".to_string());
        }

        GatewayError::Network(format!("gateway returned status {status}"))
    }

    /// Translates the error into the user-facing message taxonomy.
    pub fn to_message(&self) -> CheckoutMessage {
        match self {
            GatewayError::ItemsUnavailable { missing } => CheckoutMessage::ItemsUnavailable {
                missing: missing.clone(),
            },
            GatewayError::InsufficientStock {
                available,
                requested,
                message,
            } => CheckoutMessage::InsufficientStock {
                available: *available,
                requested: *requested,
                message: message.clone(),
            },
            GatewayError::Shape(_) | GatewayError::Network(_) => {
                CheckoutMessage::PaymentUnavailable
            }
        }
    }
}

/// Trait for the external payment gateway collaborator.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a checkout session for the given cart snapshot.
    async fn create_session(&self, request: SessionRequest)
    -> Result<PaymentSession, GatewayError>;

    /// Notifies the order system of a gateway-side payment success.
    async fn confirm(&self, request: ConfirmationRequest) -> Result<(), GatewayError>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    fail_on_create: Option<GatewayError>,
    fail_on_confirm: bool,
    hold_create: Option<Arc<Notify>>,
    create_calls: usize,
    confirm_calls: usize,
    next_order: u32,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail session creation with the given error.
    pub fn set_fail_on_create(&self, error: Option<GatewayError>) {
        self.state.write().unwrap().fail_on_create = error;
    }

    /// Configures the gateway to fail confirmations.
    pub fn set_fail_on_confirm(&self, fail: bool) {
        self.state.write().unwrap().fail_on_confirm = fail;
    }

    /// Makes the next session creations block until [`Self::release_create`].
    pub fn hold_create(&self) {
        self.state.write().unwrap().hold_create = Some(Arc::new(Notify::new()));
    }

    /// Releases a held session creation.
    pub fn release_create(&self) {
        let gate = self.state.write().unwrap().hold_create.take();
        if let Some(gate) = gate {
            gate.notify_one();
        }
    }

    /// Returns how many session creations were attempted.
    pub fn create_calls(&self) -> usize {
        self.state.read().unwrap().create_calls
    }

    /// Returns how many confirmations were attempted.
    pub fn confirm_calls(&self) -> usize {
        self.state.read().unwrap().confirm_calls
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_session(
        &self,
        _request: SessionRequest,
    ) -> Result<PaymentSession, GatewayError> {
        let (gate, failure) = {
            let mut state = self.state.write().unwrap();
            state.create_calls += 1;
            (state.hold_create.clone(), state.fail_on_create.clone())
        };

        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(error) = failure {
            return Err(error);
        }

        let order = {
            let mut state = self.state.write().unwrap();
            state.next_order += 1;
            state.next_order
        };

        Ok(PaymentSession {
            client_secret: format!("cs_{}", Uuid::new_v4().simple()),
            publishable_key: "pk_test_storefront".to_string(),
            order_id: Some(Uuid::new_v4().to_string()),
            order_number: Some(format!("ORD-{order:04}")),
        })
    }

    async fn confirm(&self, _request: ConfirmationRequest) -> Result<(), GatewayError> {
        let mut state = self.state.write().unwrap();
        state.confirm_calls += 1;

        if state.fail_on_confirm {
            return Err(GatewayError::Network(
                "confirmation endpoint unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SessionRequest {
        SessionRequest {
            locale: Locale::default(),
            customer: CustomerSnapshot::default(),
            items: vec![],
            shipping_option: None,
            fulfillment: FulfillmentMode::Shipping,
            appointment: AppointmentPreference::follow_up(),
        }
    }

    #[tokio::test]
    async fn test_create_session_issues_order_numbers() {
        let gateway = InMemoryPaymentGateway::new();

        let first = gateway.create_session(request()).await.unwrap();
        let second = gateway.create_session(request()).await.unwrap();

        assert!(first.client_secret.starts_with("cs_"));
        assert_eq!(first.order_number.as_deref(), Some("ORD-0001"));
        assert_eq!(second.order_number.as_deref(), Some("ORD-0002"));
        assert_eq!(gateway.create_calls(), 2);
    }

    #[tokio::test]
    async fn test_fail_on_create() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail_on_create(Some(GatewayError::Network("down".to_string())));

        let result = gateway.create_session(request()).await;
        assert!(matches!(result, Err(GatewayError::Network(_))));
    }

    #[tokio::test]
    async fn test_hold_and_release_create() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.hold_create();

        let pending = tokio::spawn({
            let gateway = gateway.clone();
            async move { gateway.create_session(request()).await }
        });

        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        gateway.release_create();
        let session = pending.await.unwrap().unwrap();
        assert!(session.order_id.is_some());
    }

    #[test]
    fn test_classify_conflict_with_missing_list() {
        let body = serde_json::json!({ "missing": ["sku-1", "sku-2"] });
        let error = GatewayError::from_response(409, &body);

        assert!(matches!(
            &error,
            GatewayError::ItemsUnavailable { missing } if missing.len() == 2
        ));
        assert_eq!(error.to_message().key(), "itemsUnavailable");
    }

    #[test]
    fn test_classify_conflict_with_quantities() {
        let body = serde_json::json!({
            "available": 1,
            "requested": 3,
            "message": "only one left"
        });
        let error = GatewayError::from_response(409, &body);

        match &error {
            GatewayError::InsufficientStock {
                available,
                requested,
                message,
            } => {
                assert_eq!(*available, 1);
                assert_eq!(*requested, 3);
                assert_eq!(message.as_deref(), Some("only one left"));
            }
            other => panic!("unexpected classification: {other:?}"),
        }
        assert_eq!(error.to_message().key(), "insufficientStock");
    }

    #[test]
    fn test_classify_unrecognized_conflict_as_shape_error() {
        let body = serde_json::json!({ "status": "conflict" });
        let error = GatewayError::from_response(409, &body);

        assert!(matches!(error, GatewayError::Shape(_)));
        assert_eq!(error.to_message().key(), "genericFailure");
    }

    #[test]
    fn test_classify_other_statuses_as_network() {
        let error = GatewayError::from_response(502, &serde_json::json!({}));
        assert!(matches!(error, GatewayError::Network(_)));
        assert_eq!(error.to_message().key(), "genericFailure");
    }

    #[test]
    fn test_empty_missing_list_is_not_items_unavailable() {
        let body = serde_json::json!({ "missing": [], "available": 2, "requested": 5 });
        let error = GatewayError::from_response(409, &body);
        assert!(matches!(error, GatewayError::InsufficientStock { .. }));
    }
}
