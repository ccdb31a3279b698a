//! Reconciliation coordinator.
//!
//! The coordinator is the only entry point the UI needs. It picks the
//! authoritative store on every call from the current identity, forwards the
//! operation, and announces successful mutations.
//!
//! There is no cached store handle: a call issued while a sign-in is in flight
//! goes wherever the identity points at the moment the call starts.

use crate::{
    error::Result, CartLine, ChangeNotifier, CollectionPath, DocumentStore, Entry, EntryStore,
    Identity, IdentityProvider, IdentityTransition, KeyValueStorage, LocalStore, RemoteStore,
    StoreConfig, StoreEvent, SyncReport, Synchronizer, WishlistEntry,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Totals shown next to a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    /// Number of distinct lines
    pub lines: usize,
    /// Sum of quantities
    pub item_count: u64,
    /// Sum of price times quantity
    pub subtotal: Decimal,
}

impl CartSummary {
    pub fn from_lines(lines: &[CartLine]) -> Self {
        Self {
            lines: lines.len(),
            item_count: lines.iter().map(|l| u64::from(l.quantity)).sum(),
            subtotal: lines.iter().map(CartLine::line_total).sum(),
        }
    }
}

/// Routes cart and wishlist operations to local or remote storage.
pub struct Coordinator {
    identity: Arc<dyn IdentityProvider>,
    storage: Arc<dyn KeyValueStorage>,
    documents: Arc<dyn DocumentStore>,
    config: StoreConfig,
    notifier: ChangeNotifier,
}

impl Coordinator {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        storage: Arc<dyn KeyValueStorage>,
        documents: Arc<dyn DocumentStore>,
        config: StoreConfig,
    ) -> Self {
        let notifier = ChangeNotifier::new(config.event_capacity);
        Self {
            identity,
            storage,
            documents,
            config,
            notifier,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Subscribe to [`StoreEvent`]s.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.notifier.subscribe()
    }

    fn local<E: Entry>(&self) -> LocalStore<E> {
        LocalStore::new(self.storage.clone(), self.config.local_key(E::KIND))
    }

    fn remote<E: Entry>(&self, user_id: &str) -> RemoteStore<E> {
        RemoteStore::new(
            self.documents.clone(),
            CollectionPath::new(
                self.config.users_root.as_str(),
                user_id,
                self.config.subcollection(E::KIND),
            ),
        )
    }

    /// The store that is authoritative for `E` right now.
    pub fn store<E: Entry>(&self) -> Box<dyn EntryStore<E>> {
        match self.identity.current_identity() {
            Identity::Authenticated(user_id) => {
                tracing::debug!(kind = %E::KIND, user_id = %user_id, "Routing to remote store");
                Box::new(self.remote::<E>(&user_id))
            }
            Identity::Anonymous => {
                tracing::debug!(kind = %E::KIND, "Routing to local store");
                Box::new(self.local::<E>())
            }
        }
    }

    fn announce<E: Entry>(&self, result: Result<()>) -> Result<()> {
        match &result {
            Ok(()) => {
                self.notifier.notify(StoreEvent::for_kind(E::KIND));
            }
            Err(e) => {
                tracing::warn!(kind = %E::KIND, error = %e, "Store mutation failed");
            }
        }
        result
    }

    async fn put<E: Entry>(&self, entry: E) -> Result<()> {
        let result = self.store::<E>().put(entry).await;
        self.announce::<E>(result)
    }

    async fn remove<E: Entry>(&self, product_id: &str) -> Result<()> {
        let result = self.store::<E>().remove(product_id).await;
        self.announce::<E>(result)
    }

    async fn set_quantity<E: Entry>(&self, product_id: &str, quantity: u32) -> Result<()> {
        let result = self.store::<E>().set_quantity(product_id, quantity).await;
        self.announce::<E>(result)
    }

    // Cart

    pub async fn cart(&self) -> Vec<CartLine> {
        self.store::<CartLine>().get().await
    }

    pub async fn add_to_cart(&self, line: CartLine) -> Result<()> {
        self.put(line).await
    }

    pub async fn remove_from_cart(&self, product_id: &str) -> Result<()> {
        self.remove::<CartLine>(product_id).await
    }

    /// Set a line's quantity; `0` removes the line.
    pub async fn update_cart_quantity(&self, product_id: &str, quantity: u32) -> Result<()> {
        self.set_quantity::<CartLine>(product_id, quantity).await
    }

    pub async fn is_in_cart(&self, product_id: &str) -> bool {
        self.store::<CartLine>().contains(product_id).await
    }

    /// Remove every line, one at a time, and announce once.
    ///
    /// Stops at the first failure; lines removed before it stay removed.
    pub async fn clear_cart(&self) -> Result<()> {
        let store = self.store::<CartLine>();
        let mut result = Ok(());
        for line in store.get().await {
            if let Err(e) = store.remove(&line.id).await {
                result = Err(e);
                break;
            }
        }
        self.announce::<CartLine>(result)
    }

    pub async fn cart_summary(&self) -> CartSummary {
        CartSummary::from_lines(&self.cart().await)
    }

    // Wishlist

    pub async fn wishlist(&self) -> Vec<WishlistEntry> {
        self.store::<WishlistEntry>().get().await
    }

    pub async fn add_to_wishlist(&self, entry: WishlistEntry) -> Result<()> {
        self.put(entry).await
    }

    pub async fn remove_from_wishlist(&self, product_id: &str) -> Result<()> {
        self.remove::<WishlistEntry>(product_id).await
    }

    pub async fn is_in_wishlist(&self, product_id: &str) -> bool {
        self.store::<WishlistEntry>().contains(product_id).await
    }

    /// Add the product if it is missing, remove it if present.
    ///
    /// Returns whether the product is in the wishlist afterwards.
    pub async fn toggle_wishlist(&self, entry: WishlistEntry) -> Result<bool> {
        if self.is_in_wishlist(&entry.id).await {
            self.remove_from_wishlist(&entry.id).await?;
            Ok(false)
        } else {
            self.add_to_wishlist(entry).await?;
            Ok(true)
        }
    }

    /// Put one unit of a wishlist product into the cart. The wishlist is unchanged.
    pub async fn add_wishlist_entry_to_cart(
        &self,
        entry: &WishlistEntry,
        size: Option<&str>,
    ) -> Result<()> {
        self.add_to_cart(entry.to_cart_line(size)).await
    }

    // Identity

    /// Merge local contents into `user_id`'s remote store and announce both
    /// collections.
    pub async fn synchronize(&self, user_id: &str) -> SyncReport {
        let synchronizer = Synchronizer::new(
            self.storage.clone(),
            self.documents.clone(),
            self.config.clone(),
        );
        let report = synchronizer.run(user_id).await;

        self.notifier.notify(StoreEvent::CartChanged);
        self.notifier.notify(StoreEvent::WishlistChanged);
        report
    }

    /// React to an identity change.
    ///
    /// Sign-in, sign-up and account switches synchronize; sign-out moves no
    /// data and leaves the remote collections in place.
    pub async fn handle_transition(
        &self,
        previous: &Identity,
        next: &Identity,
    ) -> Option<SyncReport> {
        let transition = IdentityTransition::between(previous, next);
        match transition.sync_target() {
            Some(user_id) => Some(self.synchronize(user_id).await),
            None => {
                if let IdentityTransition::SignedOut(user_id) = &transition {
                    tracing::info!(user_id = %user_id, "Signed out, routing to local storage");
                    self.notifier.notify(StoreEvent::CartChanged);
                    self.notifier.notify(StoreEvent::WishlistChanged);
                }
                None
            }
        }
    }

    /// Follow the identity provider and run [`Coordinator::handle_transition`]
    /// for every change it reports.
    ///
    /// Changes that happen faster than the task observes them are coalesced;
    /// only the values the task sees are compared. The task ends when the
    /// provider drops its sender.
    pub fn watch_identity(self: &Arc<Self>) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        let mut receiver = coordinator.identity.subscribe();
        let mut previous = receiver.borrow_and_update().clone();

        tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let next = receiver.borrow_and_update().clone();
                coordinator.handle_transition(&previous, &next).await;
                previous = next;
            }
            tracing::debug!("Identity provider closed, stopping identity watch");
        })
    }
}
