//! Checkout domain vocabulary: the step machine, the customer snapshot, and
//! the fixed set of user-facing messages.
//!
//! Everything in this crate is pure — no I/O, no clocks, no collaborators.
//! The orchestration layer drives [`transition`] and performs the side
//! effects (session creation and disposal) the step changes call for.

pub mod customer;
pub mod fulfillment;
pub mod messages;
pub mod step;

pub use customer::{CustomerSnapshot, ShippingAddress};
pub use fulfillment::{AppointmentMode, AppointmentPreference, FulfillmentMode};
pub use messages::CheckoutMessage;
pub use step::{CheckoutStep, StepContext, StepIntent, Transition, transition};
