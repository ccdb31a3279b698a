//! Property tests for the store invariants.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tote_engine::{
    CartLine, CollectionPath, EntryStore, LocalStore, MemoryDocumentStore, MemoryStorage,
    RemoteStore, WishlistEntry,
};

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

fn local_cart() -> LocalStore<CartLine> {
    LocalStore::new(Arc::new(MemoryStorage::new()), "cart")
}

fn remote_cart() -> RemoteStore<CartLine> {
    RemoteStore::new(
        Arc::new(MemoryDocumentStore::new()),
        CollectionPath::new("ecom users", "prop", "cart"),
    )
}

fn line(id: &str, quantity: u32) -> CartLine {
    CartLine::new(id, id, Decimal::new(100, 2), "M", quantity)
}

fn puts() -> impl Strategy<Value = Vec<(String, u32)>> {
    prop::collection::vec(("[a-d]", 0u32..5), 0..24)
}

async fn check_cart_puts<S: EntryStore<CartLine>>(store: S, puts: &[(String, u32)]) {
    let mut expected: HashMap<&str, u32> = HashMap::new();
    for (id, quantity) in puts {
        store.put(line(id, *quantity)).await.unwrap();
        *expected.entry(id.as_str()).or_default() += (*quantity).max(1);
    }

    let cart = store.get().await;
    assert_eq!(cart.len(), expected.len());
    for entry in &cart {
        assert_eq!(
            cart.iter().filter(|other| other.id == entry.id).count(),
            1,
            "duplicate line for {}",
            entry.id
        );
        assert_eq!(entry.quantity, expected[entry.id.as_str()]);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn local_cart_has_one_line_per_product(puts in puts()) {
        block_on(check_cart_puts(local_cart(), &puts));
    }

    #[test]
    fn remote_cart_has_one_line_per_product(puts in puts()) {
        block_on(check_cart_puts(remote_cart(), &puts));
    }

    #[test]
    fn wishlist_has_one_entry_per_product(ids in prop::collection::vec("[a-d]", 0..24)) {
        block_on(async {
            let store: LocalStore<WishlistEntry> =
                LocalStore::new(Arc::new(MemoryStorage::new()), "wishlist");
            for id in &ids {
                store.put(WishlistEntry::new(id.as_str(), "x", Decimal::ONE)).await.unwrap();
            }

            let mut distinct = ids.clone();
            distinct.sort();
            distinct.dedup();
            assert_eq!(store.get().await.len(), distinct.len());
        });
    }

    #[test]
    fn quantity_floor_holds(quantities in prop::collection::vec(0u32..6, 1..12)) {
        block_on(async {
            for store in [
                Box::new(local_cart()) as Box<dyn EntryStore<CartLine>>,
                Box::new(remote_cart()),
            ] {
                store.put(line("a", 1)).await.unwrap();
                let mut present = true;

                for &quantity in &quantities {
                    let result = store.set_quantity("a", quantity).await;
                    if present {
                        result.unwrap();
                    }
                    if quantity == 0 {
                        present = false;
                    }

                    let cart = store.get().await;
                    if present {
                        assert_eq!(cart.len(), 1);
                        assert_eq!(cart[0].quantity, quantity);
                    } else {
                        assert!(cart.is_empty());
                    }
                }
            }
        });
    }
}
