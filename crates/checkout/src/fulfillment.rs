//! Fulfillment and service-appointment preferences.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// How physical items reach the shopper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentMode {
    /// Items are shipped to the customer address.
    #[default]
    Shipping,

    /// Items are picked up in person.
    Pickup,
}

impl FulfillmentMode {
    /// Returns the mode name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentMode::Shipping => "shipping",
            FulfillmentMode::Pickup => "pickup",
        }
    }
}

impl std::fmt::Display for FulfillmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a booked service gets scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentMode {
    /// The shop contacts the customer afterwards to agree on a slot.
    #[default]
    FollowUp,

    /// The customer requested a concrete slot at checkout.
    RequestedSlot,
}

impl AppointmentMode {
    /// Returns the mode name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentMode::FollowUp => "follow_up",
            AppointmentMode::RequestedSlot => "requested_slot",
        }
    }
}

/// The appointment preference attached to a checkout with service items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AppointmentPreference {
    /// Scheduling mode.
    pub mode: AppointmentMode,

    /// Requested date, meaningful only for [`AppointmentMode::RequestedSlot`].
    pub date: Option<NaiveDate>,

    /// Requested time, meaningful only for [`AppointmentMode::RequestedSlot`].
    pub time: Option<NaiveTime>,
}

impl AppointmentPreference {
    /// A follow-up contact preference with no slot attached.
    pub fn follow_up() -> Self {
        Self::default()
    }

    /// A concrete requested slot.
    pub fn requested_slot(date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            mode: AppointmentMode::RequestedSlot,
            date: Some(date),
            time: Some(time),
        }
    }
}
