//! In-memory cart storage for testing and single-process deployments.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{CartError, Result};
use crate::item::{CartItem, CartItemDraft};
use crate::storage::CartStorage;

#[derive(Debug, Default)]
struct MemoryState {
    drafts: Vec<CartItemDraft>,
    fail_on_load: bool,
    fail_on_save: bool,
    save_count: usize,
}

/// In-memory cart storage.
///
/// Seedable with raw drafts so tests can simulate malformed persisted
/// carts, with failure switches mirroring an unavailable backend.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartStorage {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryCartStorage {
    /// Creates a new empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored drafts without normalization, simulating
    /// whatever a previous (possibly buggy) writer left behind.
    pub fn seed_raw(&self, drafts: Vec<CartItemDraft>) {
        self.state.write().unwrap().drafts = drafts;
    }

    /// Configures the storage to fail loads.
    pub fn set_fail_on_load(&self, fail: bool) {
        self.state.write().unwrap().fail_on_load = fail;
    }

    /// Configures the storage to fail saves.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.state.write().unwrap().fail_on_save = fail;
    }

    /// Returns how many saves have been performed.
    pub fn save_count(&self) -> usize {
        self.state.read().unwrap().save_count
    }

    /// Returns a copy of the raw stored drafts.
    pub fn raw(&self) -> Vec<CartItemDraft> {
        self.state.read().unwrap().drafts.clone()
    }
}

#[async_trait]
impl CartStorage for InMemoryCartStorage {
    async fn load(&self) -> Result<Vec<CartItemDraft>> {
        let state = self.state.read().unwrap();
        if state.fail_on_load {
            return Err(CartError::Storage("cart storage unavailable".to_string()));
        }
        Ok(state.drafts.clone())
    }

    async fn save(&self, items: &[CartItem]) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_save {
            return Err(CartError::Storage("cart storage unavailable".to_string()));
        }
        state.drafts = items.iter().map(CartItemDraft::from).collect();
        state.save_count += 1;
        Ok(())
    }
}
