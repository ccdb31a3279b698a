//! Coordinator behaviour across identity changes.
//!
//! Every test runs against in-process storage and an in-memory document
//! store; no network is involved.

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tote_engine::{
    CartLine, CollectionPath, Coordinator, EntryStore, FileStorage, Identity, IdentityContext,
    KeyValueStorage, MemoryDocumentStore, MemoryStorage, RemoteStore, StoreConfig, StoreEvent,
    WishlistEntry,
};

struct Harness {
    identity: Arc<IdentityContext>,
    storage: Arc<dyn KeyValueStorage>,
    backend: Arc<MemoryDocumentStore>,
    coordinator: Arc<Coordinator>,
}

fn harness_with(storage: Arc<dyn KeyValueStorage>, backend: Arc<MemoryDocumentStore>) -> Harness {
    let identity = Arc::new(IdentityContext::new());
    let coordinator = Arc::new(Coordinator::new(
        identity.clone(),
        storage.clone(),
        backend.clone(),
        StoreConfig::default(),
    ));
    Harness {
        identity,
        storage,
        backend,
        coordinator,
    }
}

fn harness() -> Harness {
    harness_with(
        Arc::new(MemoryStorage::new()),
        Arc::new(MemoryDocumentStore::new()),
    )
}

impl Harness {
    async fn sign_in(&self, user_id: &str) {
        let previous = self.identity.sign_in(user_id);
        self.coordinator
            .handle_transition(&previous, &self.identity.current())
            .await;
    }

    async fn sign_out(&self) {
        let previous = self.identity.sign_out();
        self.coordinator
            .handle_transition(&previous, &self.identity.current())
            .await;
    }

    fn remote_cart(&self, user_id: &str) -> RemoteStore<CartLine> {
        RemoteStore::new(
            self.backend.clone(),
            CollectionPath::new("ecom users", user_id, "cart"),
        )
    }

    fn remote_wishlist(&self, user_id: &str) -> RemoteStore<WishlistEntry> {
        RemoteStore::new(
            self.backend.clone(),
            CollectionPath::new("ecom users", user_id, "wishlist"),
        )
    }
}

fn line(id: &str, quantity: u32) -> CartLine {
    CartLine::new(id, format!("Item {id}"), Decimal::new(1250, 2), "M", quantity)
}

fn wish(id: &str) -> WishlistEntry {
    WishlistEntry::new(id, format!("Item {id}"), Decimal::new(800, 2))
}

// ============================================================================
// Synchronization
// ============================================================================

#[tokio::test]
async fn sign_in_adds_local_cart_quantities_to_remote() {
    let h = harness();
    h.remote_cart("alice").put(line("A", 3)).await.unwrap();
    h.coordinator.add_to_cart(line("A", 2)).await.unwrap();

    h.sign_in("alice").await;

    let remote = h.remote_cart("alice").get().await;
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].quantity, 5);

    h.identity.sign_out();
    assert!(h.coordinator.cart().await.is_empty());
}

#[tokio::test]
async fn sign_in_does_not_duplicate_wishlist_entries() {
    let h = harness();
    h.remote_wishlist("alice").put(wish("B")).await.unwrap();
    h.coordinator.add_to_wishlist(wish("B")).await.unwrap();

    h.sign_in("alice").await;

    let remote = h.remote_wishlist("alice").get().await;
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].id, "B");

    h.identity.sign_out();
    assert!(h.coordinator.wishlist().await.is_empty());
}

#[tokio::test]
async fn repeated_sign_ins_stay_idempotent_for_wishlist() {
    let h = harness();

    for _ in 0..3 {
        h.coordinator.add_to_wishlist(wish("B")).await.unwrap();
        h.sign_in("alice").await;
        h.sign_out().await;
    }

    assert_eq!(h.remote_wishlist("alice").get().await.len(), 1);
}

#[tokio::test]
async fn sign_up_merges_like_sign_in() {
    let h = harness();
    h.coordinator.add_to_cart(line("A", 1)).await.unwrap();
    h.coordinator.add_to_wishlist(wish("B")).await.unwrap();

    let previous = h.identity.sign_up("new-user");
    let report = h
        .coordinator
        .handle_transition(&previous, &h.identity.current())
        .await
        .expect("sign-up synchronizes");

    assert_eq!(report.cart.inserted, vec!["A".to_string()]);
    assert_eq!(report.wishlist.inserted, vec!["B".to_string()]);
    assert_eq!(h.coordinator.cart().await.len(), 1);
    assert_eq!(h.coordinator.wishlist().await.len(), 1);
}

#[tokio::test]
async fn sign_out_moves_no_data() {
    let h = harness();
    h.sign_in("alice").await;
    h.coordinator.add_to_cart(line("A", 2)).await.unwrap();

    let report = {
        let previous = h.identity.sign_out();
        h.coordinator
            .handle_transition(&previous, &h.identity.current())
            .await
    };

    assert!(report.is_none());
    assert!(h.coordinator.cart().await.is_empty());
    assert_eq!(h.remote_cart("alice").get().await[0].quantity, 2);
}

#[tokio::test]
async fn failed_merge_items_are_kept_locally() {
    let h = harness();
    h.coordinator.add_to_cart(line("bad", 1)).await.unwrap();
    h.coordinator.add_to_cart(line("good", 2)).await.unwrap();
    h.backend.fail_writes_for("bad");

    h.sign_in("alice").await;

    let remote = h.remote_cart("alice").get().await;
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].id, "good");

    h.identity.sign_out();
    let local = h.coordinator.cart().await;
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].id, "bad");

    h.backend.heal();
    h.sign_in("alice").await;
    assert_eq!(h.coordinator.cart().await.len(), 2);
}

#[tokio::test]
async fn watch_identity_synchronizes_on_sign_in() {
    let h = harness();
    h.coordinator.add_to_cart(line("A", 2)).await.unwrap();

    let mut events = h.coordinator.subscribe();
    let watcher = h.coordinator.watch_identity();

    h.identity.sign_in("alice");

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if events.recv().await.unwrap() == StoreEvent::WishlistChanged {
                break;
            }
        }
    })
    .await
    .expect("synchronization finished");

    assert_eq!(h.remote_cart("alice").get().await[0].quantity, 2);
    watcher.abort();
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn routing_follows_identity_between_calls() {
    let h = harness();

    h.coordinator.add_to_cart(line("local", 1)).await.unwrap();

    h.identity.sign_in("alice");
    h.coordinator.add_to_cart(line("remote", 1)).await.unwrap();

    let remote = h.remote_cart("alice").get().await;
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].id, "remote");

    h.identity.sign_out();
    let local = h.coordinator.cart().await;
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].id, "local");

    assert_eq!(h.remote_cart("alice").get().await.len(), 1);
}

#[tokio::test]
async fn local_cart_survives_restart() {
    let dir = std::env::temp_dir().join(format!("tote-restart-{}", uuid::Uuid::new_v4()));
    let backend = Arc::new(MemoryDocumentStore::new());

    let expected = {
        let h = harness_with(Arc::new(FileStorage::open(&dir).unwrap()), backend.clone());
        h.coordinator.add_to_cart(line("A", 2)).await.unwrap();
        h.coordinator
            .add_to_cart(line("B", 1).with_school("Hillcrest"))
            .await
            .unwrap();
        h.coordinator.add_to_wishlist(wish("C")).await.unwrap();
        (h.coordinator.cart().await, h.coordinator.wishlist().await)
    };

    let h = harness_with(Arc::new(FileStorage::open(&dir).unwrap()), backend);
    assert_eq!(h.coordinator.cart().await, expected.0);
    assert_eq!(h.coordinator.wishlist().await, expected.1);
    assert_eq!(expected.0.len(), 2);

    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn remote_read_failure_reads_as_empty() {
    let h = harness();
    h.identity.sign_in("alice");
    h.coordinator.add_to_cart(line("A", 1)).await.unwrap();

    h.backend.fail_reads(true);

    assert!(h.coordinator.cart().await.is_empty());
    assert!(h.coordinator.wishlist().await.is_empty());
    assert!(!h.coordinator.is_in_cart("A").await);
}

#[tokio::test]
async fn unparsable_local_snapshot_reads_as_empty() {
    let h = harness();
    h.storage.set_item("cart", "<html>oops</html>").unwrap();

    assert!(h.coordinator.cart().await.is_empty());
}

// ============================================================================
// Mutations and notification
// ============================================================================

#[tokio::test]
async fn each_mutation_emits_one_event() {
    let h = harness();
    let mut events = h.coordinator.subscribe();

    h.coordinator.add_to_cart(line("A", 1)).await.unwrap();
    assert_eq!(events.try_recv().unwrap(), StoreEvent::CartChanged);
    assert!(events.try_recv().is_err());

    h.coordinator.update_cart_quantity("A", 3).await.unwrap();
    assert_eq!(events.try_recv().unwrap(), StoreEvent::CartChanged);

    h.coordinator.add_to_wishlist(wish("B")).await.unwrap();
    assert_eq!(events.try_recv().unwrap(), StoreEvent::WishlistChanged);

    h.coordinator.remove_from_wishlist("B").await.unwrap();
    assert_eq!(events.try_recv().unwrap(), StoreEvent::WishlistChanged);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn failed_write_returns_error_without_event() {
    let h = harness();
    h.identity.sign_in("alice");
    h.backend.fail_writes(true);
    let mut events = h.coordinator.subscribe();

    assert!(h.coordinator.add_to_cart(line("A", 1)).await.is_err());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn quantity_zero_removes_remote_line() {
    let h = harness();
    h.identity.sign_in("alice");
    h.coordinator.add_to_cart(line("A", 2)).await.unwrap();

    h.coordinator.update_cart_quantity("A", 5).await.unwrap();
    assert_eq!(h.coordinator.cart().await[0].quantity, 5);

    h.coordinator.update_cart_quantity("A", 0).await.unwrap();
    assert!(h.coordinator.cart().await.is_empty());
}

#[tokio::test]
async fn toggle_wishlist_flips_membership() {
    let h = harness();

    assert!(h.coordinator.toggle_wishlist(wish("B")).await.unwrap());
    assert!(h.coordinator.is_in_wishlist("B").await);

    assert!(!h.coordinator.toggle_wishlist(wish("B")).await.unwrap());
    assert!(!h.coordinator.is_in_wishlist("B").await);
}

#[tokio::test]
async fn wishlist_entry_goes_to_cart_once_per_call() {
    let h = harness();
    let entry = wish("B");
    h.coordinator.add_to_wishlist(entry.clone()).await.unwrap();

    h.coordinator
        .add_wishlist_entry_to_cart(&entry, None)
        .await
        .unwrap();
    h.coordinator
        .add_wishlist_entry_to_cart(&entry, None)
        .await
        .unwrap();

    let cart = h.coordinator.cart().await;
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].quantity, 2);
    assert_eq!(cart[0].size, "One Size");
    assert!(h.coordinator.is_in_wishlist("B").await);
}

#[tokio::test]
async fn clear_cart_and_summary() {
    let h = harness();
    h.identity.sign_in("alice");
    h.coordinator.add_to_cart(line("A", 2)).await.unwrap();
    h.coordinator.add_to_cart(line("B", 1)).await.unwrap();

    let summary = h.coordinator.cart_summary().await;
    assert_eq!(summary.lines, 2);
    assert_eq!(summary.item_count, 3);
    assert_eq!(summary.subtotal, Decimal::new(3750, 2));

    let mut events = h.coordinator.subscribe();
    h.coordinator.clear_cart().await.unwrap();

    assert!(h.coordinator.cart().await.is_empty());
    assert_eq!(events.try_recv().unwrap(), StoreEvent::CartChanged);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn identity_outlives_routing_decisions() {
    let h = harness();
    assert_eq!(h.identity.current(), Identity::Anonymous);
    assert!(!h.coordinator.is_in_cart("A").await);

    h.coordinator.add_to_cart(line("A", 1)).await.unwrap();
    assert!(h.coordinator.is_in_cart("A").await);

    h.identity.sign_in("bob");
    assert!(!h.coordinator.is_in_cart("A").await);
}

#[tokio::test]
async fn custom_users_root_routes_remote_writes() {
    let identity = Arc::new(IdentityContext::new());
    let backend = Arc::new(MemoryDocumentStore::new());
    let coordinator = Coordinator::new(
        identity.clone(),
        Arc::new(MemoryStorage::new()),
        backend.clone(),
        StoreConfig::default().with_users_root("shop users"),
    );
    assert_eq!(coordinator.config().users_root, "shop users");

    let previous = identity.sign_in("alice");
    coordinator
        .handle_transition(&previous, &identity.current())
        .await;

    let mut events = coordinator.subscribe();
    assert_eq!(coordinator.notifier().subscriber_count(), 1);
    coordinator.add_to_cart(line("A", 1)).await.unwrap();

    assert_eq!(
        backend
            .documents(&CollectionPath::new("shop users", "alice", "cart"))
            .len(),
        1
    );
    assert!(backend
        .documents(&CollectionPath::new("ecom users", "alice", "cart"))
        .is_empty());

    assert_eq!(events.recv().await.unwrap(), StoreEvent::CartChanged);
}
