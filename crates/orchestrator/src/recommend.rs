//! Upsell suggestion fetching.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cart::ItemId;

use crate::services::suggestions::{Suggestion, SuggestionProvider};

/// Fetches a single upsell suggestion for a seed cart item.
///
/// Generation-guarded like the quote engine: only the response belonging to
/// the latest seed is applied. Failures clear the suggestion and are never
/// surfaced to the shopper.
pub struct RecommendationFetcher<P: SuggestionProvider> {
    provider: Arc<P>,
    state: Arc<Mutex<Option<Suggestion>>>,
    generation: Arc<AtomicU64>,
}

impl<P: SuggestionProvider> Clone for RecommendationFetcher<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            state: self.state.clone(),
            generation: self.generation.clone(),
        }
    }
}

impl<P: SuggestionProvider + 'static> RecommendationFetcher<P> {
    /// Creates a fetcher over the given provider.
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            state: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Reacts to a new seed item, superseding any in-flight fetch.
    ///
    /// `None` clears the suggestion immediately (empty cart).
    pub fn refresh(&self, seed: Option<ItemId>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(seed) = seed else {
            *self.state.lock().unwrap() = None;
            return;
        };

        let fetcher = self.clone();
        tokio::spawn(async move {
            let outcome = match fetcher.provider.related_to(&seed).await {
                Ok(suggestion) => suggestion,
                Err(error) => {
                    tracing::debug!(%error, "suggestion fetch failed");
                    None
                }
            };

            let mut state = fetcher.state.lock().unwrap();
            if fetcher.generation.load(Ordering::SeqCst) == generation {
                *state = outcome;
            }
        });
    }

    /// The current suggestion, if any.
    pub fn current(&self) -> Option<Suggestion> {
        self.state.lock().unwrap().clone()
    }
}
