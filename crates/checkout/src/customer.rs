//! Customer contact and shipping snapshot.

use serde::{Deserialize, Serialize};

/// Contact and shipping fields as entered by the shopper.
///
/// No invariants at the type level: completeness is a checkout-step
/// precondition, not a data invariant, so partially-filled snapshots are a
/// normal state while the form is being edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CustomerSnapshot {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub postal_code: String,
    pub city: String,
    pub province: String,
    pub phone: String,
}

impl CustomerSnapshot {
    /// True when every contact and shipping field is filled in.
    pub fn is_complete(&self) -> bool {
        [
            &self.email,
            &self.first_name,
            &self.last_name,
            &self.address,
            &self.postal_code,
            &self.city,
            &self.province,
            &self.phone,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }

    /// True when the address fields needed for a shipping quote are filled.
    pub fn has_complete_address(&self) -> bool {
        self.shipping_address().is_some()
    }

    /// Extracts the shipping address once all of its fields are present.
    pub fn shipping_address(&self) -> Option<ShippingAddress> {
        let fields = [&self.address, &self.postal_code, &self.city, &self.province];
        if fields.iter().any(|field| field.trim().is_empty()) {
            return None;
        }
        Some(ShippingAddress {
            address: self.address.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            city: self.city.trim().to_string(),
            province: self.province.trim().to_string(),
        })
    }
}

/// A complete shipping address, as required by the rate collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub address: String,
    pub postal_code: String,
    pub city: String,
    pub province: String,
}
