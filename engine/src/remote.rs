//! Remote store adapter.
//!
//! Each entry is one document in the signed-in user's subcollection. The
//! document store enforces no uniqueness, so `put` looks the product up
//! before inserting. Two concurrent `put`s for the same product can both miss
//! the lookup and insert twice; `remove` therefore deletes every match.

use crate::{
    document::{Fields, ADDED_AT, UPDATED_AT},
    error::{Error, Result},
    CollectionPath, Document, DocumentStore, Entry, EntryStore,
};
use async_trait::async_trait;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// Field holding the product id inside each document.
pub const PRODUCT_ID_FIELD: &str = "id";

/// Entries kept in a user's remote collection.
pub struct RemoteStore<E> {
    documents: Arc<dyn DocumentStore>,
    path: CollectionPath,
    _entry: PhantomData<fn() -> E>,
}

impl<E: Entry> RemoteStore<E> {
    pub fn new(documents: Arc<dyn DocumentStore>, path: CollectionPath) -> Self {
        Self {
            documents,
            path,
            _entry: PhantomData,
        }
    }

    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Every decodable entry with its document id.
    ///
    /// Unlike [`EntryStore::get`] this reports backend failures. Documents
    /// that do not decode are skipped.
    pub async fn documents(&self) -> Result<Vec<(Document, E)>> {
        let documents = self.documents.read_all(&self.path).await?;
        Ok(documents
            .into_iter()
            .filter_map(|doc| match doc.decode::<E>() {
                Ok(entry) => Some((doc, entry)),
                Err(e) => {
                    tracing::warn!(path = %self.path, error = %e, "Skipping undecodable document");
                    None
                }
            })
            .collect())
    }

    async fn find(&self, product_id: &str) -> Result<Vec<Document>> {
        self.documents
            .query_by_field(
                &self.path,
                PRODUCT_ID_FIELD,
                &Value::String(product_id.to_string()),
            )
            .await
    }

    /// First decodable document for `product_id`.
    ///
    /// Matches that do not decode are skipped, the same way [`EntryStore::get`]
    /// skips them, so a damaged document never hides the product.
    async fn find_entry(&self, product_id: &str) -> Result<Option<(Document, E)>> {
        for document in self.find(product_id).await? {
            match document.decode::<E>() {
                Ok(entry) => return Ok(Some((document, entry))),
                Err(e) => {
                    tracing::warn!(path = %self.path, error = %e, "Ignoring undecodable match");
                }
            }
        }
        Ok(None)
    }

    /// Insert `entry` as a new document without checking for duplicates.
    pub async fn insert_entry(&self, entry: &E) -> Result<Document> {
        self.documents
            .insert(&self.path, entry_fields(entry)?)
            .await
    }

    /// Overwrite the quantity of one document.
    pub async fn write_quantity(&self, document_id: &str, quantity: u32) -> Result<()> {
        let mut patch = Fields::new();
        patch.insert("quantity".to_string(), Value::from(quantity));
        self.documents
            .update_by_id(&self.path, document_id, patch)
            .await
    }
}

/// Serialize an entry into document fields, leaving timestamps to the store.
fn entry_fields<E: Entry>(entry: &E) -> Result<Fields> {
    match serde_json::to_value(entry)? {
        Value::Object(mut fields) => {
            fields.remove(ADDED_AT);
            fields.remove(UPDATED_AT);
            Ok(fields)
        }
        other => Err(Error::InvalidDocument(format!(
            "{} entry serialized to {}",
            E::KIND,
            other
        ))),
    }
}

#[async_trait]
impl<E: Entry> EntryStore<E> for RemoteStore<E> {
    async fn get(&self) -> Vec<E> {
        match self.documents().await {
            Ok(entries) => entries.into_iter().map(|(_, entry)| entry).collect(),
            Err(e) => {
                tracing::warn!(path = %self.path, error = %e, "Remote read failed, treating as empty");
                Vec::new()
            }
        }
    }

    async fn put(&self, mut entry: E) -> Result<()> {
        entry.normalize();

        let Some((document, mut current)) = self.find_entry(entry.product_id()).await? else {
            self.insert_entry(&entry).await?;
            return Ok(());
        };

        if current.absorb(&entry) {
            if let Some(quantity) = current.quantity() {
                self.write_quantity(&document.id, quantity).await?;
            }
        }
        Ok(())
    }

    async fn remove(&self, product_id: &str) -> Result<()> {
        for document in self.find(product_id).await? {
            self.documents
                .delete_by_id(&self.path, &document.id)
                .await?;
        }
        Ok(())
    }

    async fn set_quantity(&self, product_id: &str, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return self.remove(product_id).await;
        }

        let (document, mut current) = self
            .find_entry(product_id)
            .await?
            .ok_or_else(|| Error::EntryNotFound(product_id.to_string()))?;

        if current.set_quantity(quantity) {
            self.write_quantity(&document.id, quantity).await?;
        }
        Ok(())
    }

    async fn contains(&self, product_id: &str) -> bool {
        match self.find_entry(product_id).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::warn!(path = %self.path, error = %e, "Remote lookup failed");
                false
            }
        }
    }
}
