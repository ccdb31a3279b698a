//! Change notification.
//!
//! Events say which collection changed and nothing else; subscribers re-read
//! the collection instead of applying a diff.

use crate::EntryKind;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Signal emitted after a successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreEvent {
    CartChanged,
    WishlistChanged,
}

impl StoreEvent {
    pub fn for_kind(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Cart => StoreEvent::CartChanged,
            EntryKind::Wishlist => StoreEvent::WishlistChanged,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            StoreEvent::CartChanged => EntryKind::Cart,
            StoreEvent::WishlistChanged => EntryKind::Wishlist,
        }
    }
}

/// Publish/subscribe channel for [`StoreEvent`]s.
///
/// Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<StoreEvent>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Register a new subscriber. It only sees events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// Broadcast an event.
    ///
    /// Returns the number of subscribers it reached; zero is not an error.
    pub fn notify(&self, event: StoreEvent) -> usize {
        match self.sender.send(event) {
            Ok(count) => {
                tracing::trace!(?event, subscribers = count, "Store change broadcast");
                count
            }
            Err(_) => 0,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}
