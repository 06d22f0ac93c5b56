//! Canonical cart fingerprinting.

use crate::item::CartItem;

/// Derives a canonical summary of cart contents.
///
/// `identifier:quantity` pairs joined with `|`, sorted by identifier so two
/// carts holding the same items in different storage order produce the same
/// fingerprint. Consumers pair this with the locale to decide whether a
/// cached payment session is still valid.
pub fn fingerprint(items: &[CartItem]) -> String {
    let mut pairs: Vec<(&str, u32)> = items
        .iter()
        .map(|item| (item.id.as_str(), item.quantity))
        .collect();
    pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));

    pairs
        .iter()
        .map(|(id, quantity)| format!("{id}:{quantity}"))
        .collect::<Vec<_>>()
        .join("|")
}
