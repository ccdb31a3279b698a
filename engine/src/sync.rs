//! Sign-in synchronization.
//!
//! Folds the anonymous local cart and wishlist into the newly signed-in
//! user's remote collections.
//!
//! # Algorithm
//!
//! For each collection (cart first, then wishlist):
//!
//! 1. Read the local snapshot and the remote documents
//! 2. For each local entry, look for a remote entry with the same product id
//!    - found: [`Entry::absorb`] decides (cart adds quantities, wishlist keeps
//!      the remote entry as is)
//!    - missing: insert the local entry as a new document
//! 3. Rewrite the local snapshot, keeping only the entries that failed
//!
//! Every item is attempted independently. A failure is logged and the merge
//! moves on; nothing already written is rolled back. If either read in
//! step 1 fails, the collection is left untouched.

use crate::{
    CollectionPath, DocumentStore, Entry, KeyValueStorage, LocalStore, ProductId, RemoteStore,
    StoreConfig, UserId,
};
use serde::Serialize;
use std::sync::Arc;

/// What happened to one collection during synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    /// Folded into an existing remote entry
    pub merged: Vec<ProductId>,
    /// Inserted as new remote documents
    pub inserted: Vec<ProductId>,
    /// Already present remotely and left unchanged
    pub skipped: Vec<ProductId>,
    /// Could not be written; still held locally
    pub failed: Vec<ProductId>,
    /// The remote collection could not be read, so nothing was attempted
    pub remote_unavailable: bool,
    /// The local snapshot could not be read, so nothing was attempted
    pub local_unavailable: bool,
    /// The local snapshot was rewritten after the merge
    pub local_cleared: bool,
}

impl MergeReport {
    /// Every local entry reached the remote store.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && !self.remote_unavailable && !self.local_unavailable
    }

    /// Number of local entries that were processed successfully.
    pub fn processed(&self) -> usize {
        self.merged.len() + self.inserted.len() + self.skipped.len()
    }
}

/// Outcome of a full sign-in synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub user_id: UserId,
    pub cart: MergeReport,
    pub wishlist: MergeReport,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.cart.is_complete() && self.wishlist.is_complete()
    }
}

enum ItemOutcome {
    Merged,
    Inserted,
    Skipped,
}

/// Merge one local collection into its remote counterpart.
pub async fn merge_collection<E: Entry>(
    local: &LocalStore<E>,
    remote: &RemoteStore<E>,
) -> MergeReport {
    let mut report = MergeReport::default();
    let local_entries = match local.try_snapshot() {
        Ok(snapshot) => snapshot.into_entries(),
        Err(e) => {
            tracing::warn!(
                kind = %E::KIND,
                key = %local.key(),
                error = %e,
                "Local read failed, leaving local entries in place"
            );
            report.local_unavailable = true;
            return report;
        }
    };

    let mut remote_entries = match remote.documents().await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(
                kind = %E::KIND,
                path = %remote.path(),
                error = %e,
                "Remote read failed, keeping local entries for the next sign-in"
            );
            report.remote_unavailable = true;
            return report;
        }
    };

    let mut retained = Vec::new();

    for entry in local_entries {
        let product_id = entry.product_id().to_string();
        let position = remote_entries
            .iter()
            .position(|(_, existing)| existing.product_id() == product_id);

        let outcome = match position {
            Some(index) => {
                let (document, existing) = &mut remote_entries[index];
                let mut combined = existing.clone();
                match (combined.absorb(&entry), combined.quantity()) {
                    (true, Some(quantity)) => remote
                        .write_quantity(&document.id, quantity)
                        .await
                        .map(|()| {
                            *existing = combined;
                            ItemOutcome::Merged
                        }),
                    _ => Ok(ItemOutcome::Skipped),
                }
            }
            None => match remote.insert_entry(&entry).await {
                Ok(document) => {
                    remote_entries.push((document, entry.clone()));
                    Ok(ItemOutcome::Inserted)
                }
                Err(e) => Err(e),
            },
        };

        match outcome {
            Ok(ItemOutcome::Merged) => report.merged.push(product_id),
            Ok(ItemOutcome::Inserted) => report.inserted.push(product_id),
            Ok(ItemOutcome::Skipped) => report.skipped.push(product_id),
            Err(e) => {
                tracing::warn!(
                    kind = %E::KIND,
                    product_id = %product_id,
                    error = %e,
                    "Failed to merge local entry"
                );
                report.failed.push(product_id);
                retained.push(entry);
            }
        }
    }

    match local.replace(retained) {
        Ok(()) => report.local_cleared = true,
        Err(e) => {
            tracing::warn!(kind = %E::KIND, error = %e, "Failed to clear local snapshot after merge");
        }
    }

    report
}

/// Runs sign-in synchronization for both collections.
pub struct Synchronizer {
    storage: Arc<dyn KeyValueStorage>,
    documents: Arc<dyn DocumentStore>,
    config: StoreConfig,
}

impl Synchronizer {
    pub fn new(
        storage: Arc<dyn KeyValueStorage>,
        documents: Arc<dyn DocumentStore>,
        config: StoreConfig,
    ) -> Self {
        Self {
            storage,
            documents,
            config,
        }
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

    async fn merge<E: Entry>(&self, user_id: &str) -> MergeReport {
        merge_collection(&self.local::<E>(), &self.remote::<E>(user_id)).await
    }

    /// Merge the local cart, then the local wishlist, into `user_id`'s remote store.
    pub async fn run(&self, user_id: &str) -> SyncReport {
        let cart = self.merge::<crate::CartLine>(user_id).await;
        let wishlist = self.merge::<crate::WishlistEntry>(user_id).await;

        let report = SyncReport {
            user_id: user_id.to_string(),
            cart,
            wishlist,
        };

        tracing::info!(
            user_id = %user_id,
            cart_merged = report.cart.merged.len(),
            cart_inserted = report.cart.inserted.len(),
            cart_failed = report.cart.failed.len(),
            wishlist_inserted = report.wishlist.inserted.len(),
            wishlist_skipped = report.wishlist.skipped.len(),
            wishlist_failed = report.wishlist.failed.len(),
            "Local cart and wishlist synchronized"
        );

        report
    }
}
