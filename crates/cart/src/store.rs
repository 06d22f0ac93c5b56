//! The cart store: single source of truth for cart contents.

use tokio::sync::{Mutex, broadcast};

use common::Money;

use crate::error::Result;
use crate::item::{CartItem, CartItemDraft, ItemId};
use crate::normalize::normalize_list;
use crate::storage::CartStorage;
use crate::totals;

/// Capacity of the change-signal channel; slow observers that fall this far
/// behind re-read the store instead of replaying signals.
const SIGNAL_CAPACITY: usize = 16;

/// Notification broadcast to every cart observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartSignal {
    /// Cart contents changed; observers should re-read.
    Changed,

    /// A surface asked for the cart view to be opened.
    OpenRequested,
}

/// Durable cart state shared across all consumers.
///
/// Every mutation runs read-normalize-persist-notify as one unit behind an
/// internal lock, so no observer ever sees a partially-updated list. Reads
/// are self-healing: when normalization corrects what storage returned, the
/// corrected list is persisted back before it is handed out.
pub struct CartStore<S: CartStorage> {
    storage: S,
    signals: broadcast::Sender<CartSignal>,
    mutation: Mutex<()>,
}

impl<S: CartStorage> CartStore<S> {
    /// Creates a store over the given storage backend.
    pub fn new(storage: S) -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self {
            storage,
            signals,
            mutation: Mutex::new(()),
        }
    }

    /// Subscribes to cart signals.
    ///
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<CartSignal> {
        self.signals.subscribe()
    }

    /// Asks presentation surfaces to open the cart view.
    pub fn request_open(&self) {
        let _ = self.signals.send(CartSignal::OpenRequested);
    }

    /// Loads the current cart, normalizing and self-healing storage.
    pub async fn read(&self) -> Result<Vec<CartItem>> {
        let _guard = self.mutation.lock().await;
        self.load_and_heal().await
    }

    /// Replaces the cart with the normalized form of the given drafts.
    #[tracing::instrument(skip(self, drafts))]
    pub async fn write(&self, drafts: Vec<CartItemDraft>) -> Result<Vec<CartItem>> {
        let _guard = self.mutation.lock().await;
        let items = normalize_list(drafts);
        self.persist_and_notify(&items).await?;
        Ok(items)
    }

    /// Appends a draft, merging with an existing line on duplicate id.
    #[tracing::instrument(skip(self, draft), fields(item = %draft.id))]
    pub async fn add(&self, draft: CartItemDraft) -> Result<Vec<CartItem>> {
        let _guard = self.mutation.lock().await;
        let current = self.load_and_heal().await?;

        let mut drafts: Vec<CartItemDraft> = current.iter().map(CartItemDraft::from).collect();
        drafts.push(draft);

        let items = normalize_list(drafts);
        self.persist_and_notify(&items).await?;
        Ok(items)
    }

    /// Increments the quantity of the given line.
    ///
    /// Unknown ids leave the cart untouched and emit no signal.
    #[tracing::instrument(skip(self), fields(item = %id.as_str()))]
    pub async fn increment(&self, id: &ItemId) -> Result<Vec<CartItem>> {
        let _guard = self.mutation.lock().await;
        let mut items = self.load_and_heal().await?;

        let Some(item) = items.iter_mut().find(|item| &item.id == id) else {
            return Ok(items);
        };
        item.quantity = item.quantity.saturating_add(1);

        self.persist_and_notify(&items).await?;
        Ok(items)
    }

    /// Decrements the quantity of the given line, removing it at zero.
    #[tracing::instrument(skip(self), fields(item = %id.as_str()))]
    pub async fn decrement(&self, id: &ItemId) -> Result<Vec<CartItem>> {
        let _guard = self.mutation.lock().await;
        let mut items = self.load_and_heal().await?;

        let Some(at) = items.iter().position(|item| &item.id == id) else {
            return Ok(items);
        };

        if items[at].quantity > 1 {
            items[at].quantity -= 1;
        } else {
            items.remove(at);
        }

        self.persist_and_notify(&items).await?;
        Ok(items)
    }

    /// Removes the given line entirely.
    #[tracing::instrument(skip(self), fields(item = %id.as_str()))]
    pub async fn remove(&self, id: &ItemId) -> Result<Vec<CartItem>> {
        let _guard = self.mutation.lock().await;
        let mut items = self.load_and_heal().await?;

        let before = items.len();
        items.retain(|item| &item.id != id);
        if items.len() == before {
            return Ok(items);
        }

        self.persist_and_notify(&items).await?;
        Ok(items)
    }

    /// Empties the cart, e.g. after successful order completion.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.mutation.lock().await;
        self.persist_and_notify(&[]).await
    }

    /// Current subtotal across all lines.
    pub async fn subtotal(&self) -> Result<Money> {
        Ok(totals::subtotal(&self.read().await?))
    }

    /// Current total quantity across all lines.
    pub async fn item_count(&self) -> Result<u32> {
        Ok(totals::item_count(&self.read().await?))
    }

    /// Loads drafts from storage and persists the corrected list back when
    /// normalization changed anything. Caller holds the mutation lock.
    async fn load_and_heal(&self) -> Result<Vec<CartItem>> {
        let drafts = self.storage.load().await?;
        let items = normalize_list(drafts.clone());

        let canonical: Vec<CartItemDraft> = items.iter().map(CartItemDraft::from).collect();
        if canonical != drafts {
            tracing::debug!(
                stored = drafts.len(),
                surviving = items.len(),
                "healing malformed persisted cart"
            );
            metrics::counter!("cart_reads_healed_total").increment(1);
            self.storage.save(&items).await?;
        }

        Ok(items)
    }

    async fn persist_and_notify(&self, items: &[CartItem]) -> Result<()> {
        self.storage.save(items).await?;
        metrics::counter!("cart_mutations_total").increment(1);
        let _ = self.signals.send(CartSignal::Changed);
        Ok(())
    }
}
