//! Upsell-suggestion collaborator contract and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use cart::ItemId;
use common::{CurrencyCode, Money};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single upsell suggestion derived from a seed cart item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: ItemId,
    pub title: String,
    pub slug: Option<String>,
    pub unit_price: Option<Money>,
    pub currency: CurrencyCode,
    pub cover_image: Option<String>,
}

/// Errors from the suggestion collaborator.
#[derive(Debug, Clone, Error)]
pub enum SuggestionError {
    /// Transport-level failure.
    #[error("Suggestion request failed: {0}")]
    Network(String),
}

/// Trait for the external suggestion collaborator.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// Returns a suggestion related to the seed item, if any.
    async fn related_to(&self, seed: &ItemId) -> Result<Option<Suggestion>, SuggestionError>;
}

#[derive(Debug, Default)]
struct SuggestionState {
    related: HashMap<String, Suggestion>,
    fail_on_fetch: bool,
    fetch_calls: usize,
}

/// In-memory suggestion provider for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemorySuggestionProvider {
    state: Arc<RwLock<SuggestionState>>,
}

impl InMemorySuggestionProvider {
    /// Creates a new provider with no suggestions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the suggestion returned for a seed item.
    pub fn set_related(&self, seed: &ItemId, suggestion: Suggestion) {
        self.state
            .write()
            .unwrap()
            .related
            .insert(seed.as_str().to_string(), suggestion);
    }

    /// Configures the provider to fail fetches.
    pub fn set_fail_on_fetch(&self, fail: bool) {
        self.state.write().unwrap().fail_on_fetch = fail;
    }

    /// Returns how many fetches were attempted.
    pub fn fetch_calls(&self) -> usize {
        self.state.read().unwrap().fetch_calls
    }
}

#[async_trait]
impl SuggestionProvider for InMemorySuggestionProvider {
    async fn related_to(&self, seed: &ItemId) -> Result<Option<Suggestion>, SuggestionError> {
        let mut state = self.state.write().unwrap();
        state.fetch_calls += 1;

        if state.fail_on_fetch {
            return Err(SuggestionError::Network(
                "suggestion service unavailable".to_string(),
            ));
        }

        Ok(state.related.get(seed.as_str()).cloned())
    }
}
