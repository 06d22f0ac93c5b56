//! Checkout step machine.

use serde::{Deserialize, Serialize};

use crate::messages::CheckoutMessage;

/// The step the shopper is on.
///
/// Step transitions:
/// ```text
/// Information ──► Shipping ──► Payment
///      ▲  ▲           │  ▲        │
///      │  └───────────┘  └────────┤
///      └──────────────────────────┘
/// ```
/// Process-local; re-entering checkout always starts at `Information`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStep {
    /// Contact and shipping details form.
    #[default]
    Information,

    /// Shipping method selection.
    Shipping,

    /// Payment element and order confirmation.
    Payment,
}

impl CheckoutStep {
    /// Returns the step name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::Information => "information",
            CheckoutStep::Shipping => "shipping",
            CheckoutStep::Payment => "payment",
        }
    }
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Navigation intent raised by the checkout surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepIntent {
    /// Submit the information form and move forward.
    NextFromInformation,

    /// Return to the information step.
    BackToInformation,

    /// Confirm the shipping method and move forward.
    NextFromShipping,

    /// Return to the shipping step.
    BackToShipping,
}

/// Inputs the transition function is judged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepContext {
    /// True when the contact/shipping form is completely filled in.
    pub is_form_complete: bool,

    /// Total quantity across cart lines.
    pub item_count: u32,

    /// True while a submission is already in flight; forward intents are
    /// suppressed without an error so the surface can simply disable itself.
    pub busy: bool,
}

/// Result of a transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The step to render next.
    pub next: CheckoutStep,

    /// Message to surface when the intent was refused.
    pub error: Option<CheckoutMessage>,
}

impl Transition {
    fn to(next: CheckoutStep) -> Self {
        Self { next, error: None }
    }

    fn refused(current: CheckoutStep, error: CheckoutMessage) -> Self {
        Self {
            next: current,
            error: Some(error),
        }
    }

    fn stay(current: CheckoutStep) -> Self {
        Self {
            next: current,
            error: None,
        }
    }
}

/// Pure transition function over the checkout steps.
///
/// Performs no I/O. The caller triggers payment-session creation after a
/// successful transition into [`CheckoutStep::Payment`] and clears any
/// active session after transitioning back to [`CheckoutStep::Information`].
pub fn transition(current: CheckoutStep, intent: StepIntent, ctx: &StepContext) -> Transition {
    match intent {
        StepIntent::BackToInformation => Transition::to(CheckoutStep::Information),
        StepIntent::BackToShipping => Transition::to(CheckoutStep::Shipping),

        StepIntent::NextFromInformation => {
            if current != CheckoutStep::Information || ctx.busy {
                return Transition::stay(current);
            }
            if !ctx.is_form_complete {
                return Transition::refused(current, CheckoutMessage::CompleteRequiredFields);
            }
            if ctx.item_count == 0 {
                return Transition::refused(current, CheckoutMessage::CartEmpty);
            }
            Transition::to(CheckoutStep::Shipping)
        }

        StepIntent::NextFromShipping => {
            if current != CheckoutStep::Shipping || ctx.busy {
                return Transition::stay(current);
            }
            if ctx.item_count == 0 {
                return Transition::refused(current, CheckoutMessage::CartEmpty);
            }
            Transition::to(CheckoutStep::Payment)
        }
    }
}
