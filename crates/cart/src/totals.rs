//! Derived cart totals and free-shipping progress.

use common::Money;

use crate::item::CartItem;

/// Sum of line totals, treating pending prices as zero.
pub fn subtotal(items: &[CartItem]) -> Money {
    items
        .iter()
        .fold(Money::zero(), |acc, item| acc + item.line_total())
}

/// Total quantity across all lines.
pub fn item_count(items: &[CartItem]) -> u32 {
    items
        .iter()
        .fold(0u32, |acc, item| acc.saturating_add(item.quantity))
}

/// Sum of line totals over physically-fulfilled items only.
pub fn physical_subtotal(items: &[CartItem]) -> Money {
    items
        .iter()
        .filter(|item| item.is_physical())
        .fold(Money::zero(), |acc, item| acc + item.line_total())
}

/// Returns true if any line needs physical fulfillment.
pub fn has_physical_items(items: &[CartItem]) -> bool {
    items.iter().any(|item| item.is_physical())
}

/// Returns true if any line books a service appointment.
pub fn has_service_items(items: &[CartItem]) -> bool {
    items.iter().any(|item| item.is_service())
}

/// Progress toward a free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeShippingProgress {
    /// Amount still missing to unlock free shipping (zero once reached).
    pub remaining: Money,

    /// Progress percentage, clamped to 0..=100.
    pub percent: u8,
}

impl FreeShippingProgress {
    /// Returns true once the threshold is reached.
    pub fn unlocked(&self) -> bool {
        self.remaining.is_zero()
    }
}

/// Computes free-shipping progress from the physical-items subtotal.
///
/// The physical subtotal is the single authoritative input: service-only
/// carts (nothing to ship) and non-positive thresholds report no progress.
pub fn free_shipping_progress(items: &[CartItem], threshold: Money) -> Option<FreeShippingProgress> {
    if !threshold.is_positive() || !has_physical_items(items) {
        return None;
    }

    let progress = physical_subtotal(items);
    let remaining = threshold.saturating_sub_to_zero(progress);
    let percent = ((progress.cents() * 100) / threshold.cents()).clamp(0, 100) as u8;

    Some(FreeShippingProgress { remaining, percent })
}
