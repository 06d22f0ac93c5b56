//! Cart item model.

use common::{CurrencyCode, Money};
use serde::{Deserialize, Serialize};

/// Opaque cart item identifier.
///
/// Uniqueness key within a cart. The identifier carries no meaning beyond
/// identity; classification lives in [`ItemKind`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Creates a new item ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the item ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Classification of a cart item, assigned once at item creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A physical product, shipped or picked up.
    #[default]
    Product,

    /// A bookable service with an appointment.
    Service,

    /// A bundle of products and services, fulfilled like a product.
    Package,
}

impl ItemKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Product => "product",
            ItemKind::Service => "service",
            ItemKind::Package => "package",
        }
    }

    /// Parses a stored kind name, returning `None` for unknown values.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "product" => Some(ItemKind::Product),
            "service" => Some(ItemKind::Service),
            "package" => Some(ItemKind::Package),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A well-formed cart line item.
///
/// Only the normalizer produces these; callers and storage backends deal in
/// [`CartItemDraft`]s. Invariants: non-empty id and title, quantity >= 1,
/// price (when present) non-negative and rounded to cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Stable uniqueness key within the cart.
    pub id: ItemId,

    /// Display title.
    pub title: String,

    /// Optional catalog slug.
    pub slug: Option<String>,

    /// Unit price; absent means "price pending", a valid state.
    pub unit_price: Option<Money>,

    /// Normalized 3-letter currency code.
    pub currency: CurrencyCode,

    /// Optional brand label.
    pub brand: Option<String>,

    /// Optional cover-image reference.
    pub cover_image: Option<String>,

    /// Quantity, always >= 1.
    pub quantity: u32,

    /// Explicit classification discriminant.
    pub kind: ItemKind,
}

impl CartItem {
    /// Returns the line total (unit price x quantity), treating a pending
    /// price as zero.
    pub fn line_total(&self) -> Money {
        self.unit_price
            .map(|p| p.multiply(self.quantity))
            .unwrap_or_default()
    }

    /// Returns true if this item needs physical fulfillment.
    ///
    /// Packages bundle goods with services and ship like products.
    pub fn is_physical(&self) -> bool {
        !matches!(self.kind, ItemKind::Service)
    }

    /// Returns true if this item books a service appointment.
    pub fn is_service(&self) -> bool {
        matches!(self.kind, ItemKind::Service | ItemKind::Package)
    }
}

/// The loosely-typed cart entry shape read from durable storage or supplied
/// by callers.
///
/// Every field a caller could plausibly omit or corrupt is optional or
/// wider than its normalized counterpart; [`crate::normalize_item`] is the
/// only path from a draft to a [`CartItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CartItemDraft {
    /// Raw identifier, trimmed and required by normalization.
    pub id: String,

    /// Raw display title, trimmed and required by normalization.
    pub title: String,

    /// Optional catalog slug.
    #[serde(default)]
    pub slug: Option<String>,

    /// Raw unit price; negative or non-finite values are dropped.
    #[serde(default)]
    pub unit_price: Option<f64>,

    /// Raw currency string; defaulted to `EUR` when missing or too short.
    #[serde(default)]
    pub currency: Option<String>,

    /// Optional brand label.
    #[serde(default)]
    pub brand: Option<String>,

    /// Optional cover-image reference.
    #[serde(default)]
    pub cover_image: Option<String>,

    /// Raw quantity; coerced to `max(1, floor(value))`, default 1.
    #[serde(default)]
    pub quantity: Option<f64>,

    /// Classification; defaults to `product` when missing.
    #[serde(default)]
    pub kind: Option<ItemKind>,
}

impl CartItemDraft {
    /// Creates a minimal draft with the given identifier and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Self::default()
        }
    }
}

impl From<&CartItem> for CartItemDraft {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id.as_str().to_string(),
            title: item.title.clone(),
            slug: item.slug.clone(),
            unit_price: item.unit_price.map(|p| p.as_decimal()),
            currency: Some(item.currency.as_str().to_string()),
            brand: item.brand.clone(),
            cover_image: item.cover_image.clone(),
            quantity: Some(item.quantity as f64),
            kind: Some(item.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, price: Option<i64>, quantity: u32, kind: ItemKind) -> CartItem {
        CartItem {
            id: ItemId::new(id),
            title: format!("Item {id}"),
            slug: None,
            unit_price: price.map(Money::from_cents),
            currency: CurrencyCode::eur(),
            brand: None,
            cover_image: None,
            quantity,
            kind,
        }
    }

    #[test]
    fn test_item_id_string_conversion() {
        let id = ItemId::new("sku-001");
        assert_eq!(id.as_str(), "sku-001");

        let id2: ItemId = "sku-002".into();
        assert_eq!(id2.as_str(), "sku-002");
    }

    #[test]
    fn test_kind_parse_roundtrip() {
        for kind in [ItemKind::Product, ItemKind::Service, ItemKind::Package] {
            assert_eq!(ItemKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ItemKind::parse("bundle"), None);
    }

    #[test]
    fn test_line_total_with_pending_price() {
        let pending = item("p1", None, 3, ItemKind::Product);
        assert_eq!(pending.line_total(), Money::zero());

        let priced = item("p2", Some(1050), 2, ItemKind::Product);
        assert_eq!(priced.line_total().cents(), 2100);
    }

    #[test]
    fn test_physical_and_service_classification() {
        assert!(item("p", Some(100), 1, ItemKind::Product).is_physical());
        assert!(!item("s", Some(100), 1, ItemKind::Service).is_physical());
        assert!(item("k", Some(100), 1, ItemKind::Package).is_physical());

        assert!(!item("p", Some(100), 1, ItemKind::Product).is_service());
        assert!(item("s", Some(100), 1, ItemKind::Service).is_service());
        assert!(item("k", Some(100), 1, ItemKind::Package).is_service());
    }

    #[test]
    fn test_draft_roundtrip_preserves_fields() {
        let original = item("p1", Some(999), 2, ItemKind::Package);
        let draft = CartItemDraft::from(&original);

        assert_eq!(draft.id, "p1");
        assert_eq!(draft.unit_price, Some(9.99));
        assert_eq!(draft.quantity, Some(2.0));
        assert_eq!(draft.kind, Some(ItemKind::Package));
    }

    #[test]
    fn test_draft_deserializes_with_missing_fields() {
        let draft: CartItemDraft =
            serde_json::from_str(r#"{"id":"p1","title":"Widget"}"#).unwrap();
        assert_eq!(draft.id, "p1");
        assert!(draft.unit_price.is_none());
        assert!(draft.quantity.is_none());
        assert!(draft.kind.is_none());
    }

    #[test]
    fn test_item_serialization_roundtrip() {
        let original = item("p1", Some(1000), 2, ItemKind::Service);
        let json = serde_json::to_string(&original).unwrap();
        let deserialized: CartItem = serde_json::from_str(&json).unwrap();
        assert_eq!(original, deserialized);
    }
}
