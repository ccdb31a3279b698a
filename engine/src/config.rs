//! Store layout configuration.

use crate::EntryKind;
use serde::{Deserialize, Serialize};

/// Where carts and wishlists are kept.
///
/// The defaults match the layout storefront clients already use: local keys
/// `cart` / `wishlist` and remote documents under `ecom users/{userId}/…`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Root collection that holds one document tree per user
    pub users_root: String,
    /// Local storage key of the cart snapshot
    pub cart_key: String,
    /// Local storage key of the wishlist snapshot
    pub wishlist_key: String,
    /// Remote subcollection name for cart lines
    pub cart_collection: String,
    /// Remote subcollection name for wishlist entries
    pub wishlist_collection: String,
    /// Buffered change events per subscriber before the slowest one lags
    pub event_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            users_root: "ecom users".to_string(),
            cart_key: EntryKind::Cart.as_str().to_string(),
            wishlist_key: EntryKind::Wishlist.as_str().to_string(),
            cart_collection: EntryKind::Cart.as_str().to_string(),
            wishlist_collection: EntryKind::Wishlist.as_str().to_string(),
            event_capacity: 64,
        }
    }
}

impl StoreConfig {
    pub fn with_users_root(mut self, users_root: impl Into<String>) -> Self {
        self.users_root = users_root.into();
        self
    }

    /// Local storage key for an entry kind.
    pub fn local_key(&self, kind: EntryKind) -> &str {
        match kind {
            EntryKind::Cart => &self.cart_key,
            EntryKind::Wishlist => &self.wishlist_key,
        }
    }

    /// Remote subcollection for an entry kind.
    pub fn subcollection(&self, kind: EntryKind) -> &str {
        match kind {
            EntryKind::Cart => &self.cart_collection,
            EntryKind::Wishlist => &self.wishlist_collection,
        }
    }
}
