//! # Tote Engine
//!
//! Cart and wishlist storage for storefront clients that work both signed out
//! and signed in.
//!
//! While the shopper is anonymous, entries live in on-device key-value
//! storage. Once the shopper signs in they live in a per-user remote document
//! collection. The [`Coordinator`] decides which store is authoritative on
//! every call and merges the local contents into the remote store exactly once
//! per sign-in.
//!
//! ## Core Concepts
//!
//! ### Entries
//!
//! Two entry kinds share the [`Entry`] trait:
//! - [`CartLine`] - a product, size and quantity (quantity is always at least 1)
//! - [`WishlistEntry`] - product membership only
//!
//! At most one entry exists per product id in a store. Adding a product that
//! is already present sums quantities for the cart and does nothing for the
//! wishlist.
//!
//! ### Stores
//!
//! [`EntryStore`] is the strategy interface with two implementations:
//! - [`LocalStore`] - a JSON snapshot held under a fixed key in [`KeyValueStorage`]
//! - [`RemoteStore`] - documents under `{root}/{userId}/{cart|wishlist}` in a [`DocumentStore`]
//!
//! Reads never fail: an unreadable snapshot or an unreachable backend looks
//! like an empty cart. Writes report failure through [`Result`].
//!
//! ### Synchronization
//!
//! On an `Anonymous -> Authenticated` transition the [`Synchronizer`] folds the
//! local cart into the remote one (quantities added) and the local wishlist
//! into the remote one (inserted only when missing), then clears the local
//! store. Item failures are logged and skipped.
//!
//! ### Change notification
//!
//! Every successful mutation broadcasts a [`StoreEvent`] through the
//! [`ChangeNotifier`]. Events carry no data; subscribers re-read.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use rust_decimal::Decimal;
//! use tote_engine::{
//!     CartLine, Coordinator, IdentityContext, MemoryDocumentStore, MemoryStorage, StoreConfig,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tote_engine::Result<()> {
//! let identity = Arc::new(IdentityContext::new());
//! let coordinator = Coordinator::new(
//!     identity.clone(),
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(MemoryDocumentStore::new()),
//!     StoreConfig::default(),
//! );
//!
//! // Anonymous: goes to local storage
//! coordinator
//!     .add_to_cart(CartLine::new("blazer", "Blazer", Decimal::new(4500, 2), "M", 2))
//!     .await?;
//!
//! // Signing in merges the local cart into the remote one
//! let previous = identity.sign_in("user-1");
//! coordinator.handle_transition(&previous, &identity.current()).await;
//!
//! assert_eq!(coordinator.cart().await[0].quantity, 2);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod document;
pub mod entry;
pub mod error;
pub mod http;
pub mod identity;
pub mod local;
pub mod notify;
pub mod remote;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod sync;

// Re-export main types at crate root
pub use config::StoreConfig;
pub use coordinator::{CartSummary, Coordinator};
pub use document::{CollectionPath, Document, DocumentStore, MemoryDocumentStore};
pub use entry::{CartLine, Entry, EntryKind, WishlistEntry};
pub use error::{Error, Result};
pub use http::HttpDocumentStore;
pub use identity::{Identity, IdentityContext, IdentityProvider, IdentityTransition};
pub use local::LocalStore;
pub use notify::{ChangeNotifier, StoreEvent};
pub use remote::RemoteStore;
pub use snapshot::Snapshot;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use store::EntryStore;
pub use sync::{MergeReport, SyncReport, Synchronizer};

/// Type aliases for clarity
pub type ProductId = String;
pub type UserId = String;
pub type DocumentId = String;
