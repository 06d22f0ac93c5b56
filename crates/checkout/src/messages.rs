//! User-facing checkout messages.
//!
//! Remote failures are translated into this small fixed set before they
//! reach a shopper; raw status codes and gateway payloads never surface.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The fixed set of messages checkout can surface to the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "key", rename_all = "camelCase")]
pub enum CheckoutMessage {
    /// Contact or shipping form is incomplete.
    #[error("Please complete the required fields")]
    CompleteRequiredFields,

    /// The cart holds no items.
    #[error("Your cart is empty")]
    CartEmpty,

    /// One or more items are no longer available.
    #[error("Some items in your cart are no longer available")]
    ItemsUnavailable {
        /// Identifiers of the unavailable items.
        missing: Vec<String>,
    },

    /// Requested quantity exceeds available stock.
    #[error("The requested quantity is not available")]
    InsufficientStock {
        /// Units the collaborator reports as available.
        available: u32,
        /// Units the cart requested.
        requested: u32,
        /// Optional server-supplied detail, kept for support tooling.
        message: Option<String>,
    },

    /// Anything else: network trouble, malformed responses, gateway outages.
    #[error("Payment is temporarily unavailable, please try again")]
    PaymentUnavailable,
}

impl CheckoutMessage {
    /// Stable message key consumed by presentation layers.
    pub fn key(&self) -> &'static str {
        match self {
            CheckoutMessage::CompleteRequiredFields => "completeRequiredFields",
            CheckoutMessage::CartEmpty => "cartEmptyError",
            CheckoutMessage::ItemsUnavailable { .. } => "itemsUnavailable",
            CheckoutMessage::InsufficientStock { .. } => "insufficientStock",
            CheckoutMessage::PaymentUnavailable => "genericFailure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_keys_are_stable() {
        assert_eq!(
            CheckoutMessage::CompleteRequiredFields.key(),
            "completeRequiredFields"
        );
        assert_eq!(CheckoutMessage::CartEmpty.key(), "cartEmptyError");
        assert_eq!(
            CheckoutMessage::ItemsUnavailable { missing: vec![] }.key(),
            "itemsUnavailable"
        );
        assert_eq!(
            CheckoutMessage::InsufficientStock {
                available: 1,
                requested: 2,
                message: None
            }
            .key(),
            "insufficientStock"
        );
        assert_eq!(CheckoutMessage::PaymentUnavailable.key(), "genericFailure");
    }

    #[test]
    fn test_display_never_leaks_technical_detail() {
        let message = CheckoutMessage::InsufficientStock {
            available: 1,
            requested: 5,
            message: Some("pg deadlock on stock row".to_string()),
        };
        assert!(!message.to_string().contains("deadlock"));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let message = CheckoutMessage::ItemsUnavailable {
            missing: vec!["sku-1".to_string()],
        };
        let json = serde_json::to_string(&message).unwrap();
        let deserialized: CheckoutMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(message, deserialized);
    }
}
