//! Cart normalization: the only path from raw drafts to well-formed items.
//!
//! Every list that reaches storage or an observer goes through
//! [`normalize_list`], so a malformed persisted cart (truncated fields,
//! negative prices, duplicate identifiers) can never propagate past a read.

use std::collections::HashMap;

use common::{CurrencyCode, Money};

use crate::item::{CartItem, CartItemDraft, ItemId};

/// Normalizes a single draft into a well-formed item.
///
/// Returns `None` when the identifier or title is empty after trimming.
/// Quantity is coerced to `max(1, floor(value))` and defaults to 1 when
/// missing or non-finite. A negative or non-finite price is dropped rather
/// than rejected (price pending). Currency is uppercased and truncated to 3
/// characters, defaulting to `EUR`.
pub fn normalize_item(draft: CartItemDraft) -> Option<CartItem> {
    let id = draft.id.trim();
    if id.is_empty() {
        return None;
    }
    let title = draft.title.trim();
    if title.is_empty() {
        return None;
    }

    let quantity = match draft.quantity {
        Some(q) if q.is_finite() => q.floor().max(1.0) as u32,
        _ => 1,
    };

    let unit_price = draft
        .unit_price
        .and_then(Money::try_from_decimal)
        .filter(|p| !p.is_negative());

    let currency = CurrencyCode::normalize(draft.currency.as_deref().unwrap_or(""));

    Some(CartItem {
        id: ItemId::new(id),
        title: title.to_string(),
        slug: non_empty(draft.slug),
        unit_price,
        currency,
        brand: non_empty(draft.brand),
        cover_image: non_empty(draft.cover_image),
        quantity,
        kind: draft.kind.unwrap_or_default(),
    })
}

/// Normalizes a draft list and merges entries sharing an identifier.
///
/// Quantities sum (saturating); for the scalar fields (price, currency,
/// cover image, brand, slug) the later entry's value wins when present,
/// otherwise the earlier value is kept. Output order is first-seen order of
/// surviving identifiers. Idempotent: normalizing an already-normalized
/// list is a no-op.
pub fn normalize_list(drafts: Vec<CartItemDraft>) -> Vec<CartItem> {
    let mut items: Vec<CartItem> = Vec::new();
    let mut positions: HashMap<ItemId, usize> = HashMap::new();

    for draft in drafts {
        let Some(item) = normalize_item(draft) else {
            continue;
        };

        match positions.get(&item.id) {
            Some(&at) => merge_into(&mut items[at], item),
            None => {
                positions.insert(item.id.clone(), items.len());
                items.push(item);
            }
        }
    }

    items
}

/// Folds a later duplicate into the first-seen entry.
fn merge_into(existing: &mut CartItem, later: CartItem) {
    existing.quantity = existing.quantity.saturating_add(later.quantity);
    // Currency is always present after normalization, so the later entry
    // unconditionally wins; the remaining scalars win only when set.
    existing.currency = later.currency;
    if later.unit_price.is_some() {
        existing.unit_price = later.unit_price;
    }
    if later.slug.is_some() {
        existing.slug = later.slug;
    }
    if later.brand.is_some() {
        existing.brand = later.brand;
    }
    if later.cover_image.is_some() {
        existing.cover_image = later.cover_image;
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
