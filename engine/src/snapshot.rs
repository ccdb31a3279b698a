//! Local snapshot format.
//!
//! A snapshot is a JSON array of entries in insertion order. Reading is
//! forgiving: anything that does not parse is treated as an empty snapshot.

use crate::{error::Result, Entry};

/// Ordered list of entries as persisted in local storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<E> {
    entries: Vec<E>,
}

impl<E: Entry> Snapshot<E> {
    pub fn new(entries: Vec<E>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Decode a stored snapshot. Never fails.
    ///
    /// `None`, unparsable text and non-array JSON all decode to an empty
    /// snapshot.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::empty();
        };

        match serde_json::from_str::<Vec<E>>(raw) {
            Ok(entries) => Self::new(entries),
            Err(e) => {
                tracing::warn!(kind = %E::KIND, error = %e, "Discarding unreadable local snapshot");
                Self::empty()
            }
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.entries)?)
    }

    pub fn entries(&self) -> &[E] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<E> {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn position(&self, product_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.product_id() == product_id)
    }

    pub fn get(&self, product_id: &str) -> Option<&E> {
        self.position(product_id).map(|i| &self.entries[i])
    }

    pub fn get_mut(&mut self, product_id: &str) -> Option<&mut E> {
        self.position(product_id).map(move |i| &mut self.entries[i])
    }

    /// Insert or fold into the existing entry for the same product.
    ///
    /// Returns `true` when the snapshot changed.
    pub fn upsert(&mut self, entry: E) -> bool {
        match self.get_mut(entry.product_id()) {
            Some(existing) => existing.absorb(&entry),
            None => {
                self.entries.push(entry);
                true
            }
        }
    }

    /// Remove every entry for `product_id`. Returns `true` if any was present.
    pub fn remove(&mut self, product_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.product_id() != product_id);
        self.entries.len() != before
    }
}

impl<E: Entry> Default for Snapshot<E> {
    fn default() -> Self {
        Self::empty()
    }
}
