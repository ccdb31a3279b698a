//! Local store adapter.
//!
//! Keeps one collection as a [`Snapshot`] under a fixed key in device
//! storage. Every operation reads the whole snapshot, changes it and writes
//! it back.

use crate::{
    error::{Error, Result},
    Entry, EntryStore, KeyValueStorage, Snapshot,
};
use async_trait::async_trait;
use chrono::Utc;
use std::marker::PhantomData;
use std::sync::Arc;

/// Entries kept on the device while the shopper is anonymous.
pub struct LocalStore<E> {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
    _entry: PhantomData<fn() -> E>,
}

impl<E: Entry> LocalStore<E> {
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            _entry: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current snapshot. Storage failures read as empty.
    pub fn snapshot(&self) -> Snapshot<E> {
        match self.try_snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Local storage read failed");
                Snapshot::empty()
            }
        }
    }

    /// Current snapshot, reporting storage failures.
    ///
    /// Unparsable contents still read as empty; only a failed read errors.
    pub fn try_snapshot(&self) -> Result<Snapshot<E>> {
        let raw = self.storage.get_item(&self.key)?;
        Ok(Snapshot::parse(raw.as_deref()))
    }

    fn write(&self, snapshot: &Snapshot<E>) -> Result<()> {
        self.storage.set_item(&self.key, &snapshot.to_json()?)
    }

    /// Overwrite the snapshot with `entries`.
    pub fn replace(&self, entries: Vec<E>) -> Result<()> {
        self.write(&Snapshot::new(entries))
    }

    /// Write an empty snapshot.
    pub fn clear(&self) -> Result<()> {
        self.write(&Snapshot::empty())
    }
}

#[async_trait]
impl<E: Entry> EntryStore<E> for LocalStore<E> {
    async fn get(&self) -> Vec<E> {
        self.snapshot().into_entries()
    }

    async fn put(&self, mut entry: E) -> Result<()> {
        entry.normalize();
        entry.mark_added(Utc::now());

        let mut snapshot = self.snapshot();
        if snapshot.upsert(entry) {
            self.write(&snapshot)?;
        }
        Ok(())
    }

    async fn remove(&self, product_id: &str) -> Result<()> {
        let mut snapshot = self.snapshot();
        if snapshot.remove(product_id) {
            self.write(&snapshot)?;
        }
        Ok(())
    }

    async fn set_quantity(&self, product_id: &str, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return self.remove(product_id).await;
        }

        let mut snapshot = self.snapshot();
        let entry = snapshot
            .get_mut(product_id)
            .ok_or_else(|| Error::EntryNotFound(product_id.to_string()))?;

        if entry.set_quantity(quantity) {
            self.write(&snapshot)?;
        }
        Ok(())
    }
}
