//! The store strategy interface shared by local and remote storage.

use crate::{error::Result, Entry};
use async_trait::async_trait;

/// A cart or wishlist store.
///
/// [`LocalStore`](crate::LocalStore) and [`RemoteStore`](crate::RemoteStore)
/// both implement this trait so callers never branch on where the data lives.
#[async_trait]
pub trait EntryStore<E: Entry>: Send + Sync {
    /// All entries. Read failures degrade to an empty list.
    async fn get(&self) -> Vec<E>;

    /// Insert `entry`, or fold it into the existing entry for the same product.
    async fn put(&self, entry: E) -> Result<()>;

    /// Remove the entry for `product_id`. Removing an absent product succeeds.
    async fn remove(&self, product_id: &str) -> Result<()>;

    /// Set the quantity of an existing entry; `0` removes it.
    ///
    /// Entry kinds without a quantity only honour the removal.
    async fn set_quantity(&self, product_id: &str, quantity: u32) -> Result<()>;

    /// Whether an entry for `product_id` is present.
    async fn contains(&self, product_id: &str) -> bool {
        self.get()
            .await
            .iter()
            .any(|entry| entry.product_id() == product_id)
    }
}
