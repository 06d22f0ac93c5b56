//! Durable cart storage contract.

use async_trait::async_trait;

use crate::error::Result;
use crate::item::{CartItem, CartItemDraft};

/// Backend holding the ordered cart entry list.
///
/// Backends return loosely-typed drafts on load: storage contents are
/// untrusted and always pass through normalization before reaching any
/// consumer. Saves receive well-formed items only.
#[async_trait]
pub trait CartStorage: Send + Sync {
    /// Loads the stored entry list in persisted order.
    async fn load(&self) -> Result<Vec<CartItemDraft>>;

    /// Replaces the stored entry list.
    async fn save(&self, items: &[CartItem]) -> Result<()>;
}
