//! Remote document store seam.
//!
//! The remote side is a document database addressed by
//! `{root}/{userId}/{subcollection}`. The engine relies on five primitives
//! only, plus the store stamping `addedAt` on insert and `updatedAt` on
//! update.

use crate::{
    error::{Error, Result},
    DocumentId, UserId,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Field set of a document.
pub type Fields = serde_json::Map<String, Value>;

/// Field stamped by the store when a document is inserted.
pub const ADDED_AT: &str = "addedAt";
/// Field stamped by the store when a document is updated.
pub const UPDATED_AT: &str = "updatedAt";

/// Address of one user's subcollection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionPath {
    pub root: String,
    pub user_id: UserId,
    pub subcollection: String,
}

impl CollectionPath {
    pub fn new(
        root: impl Into<String>,
        user_id: impl Into<UserId>,
        subcollection: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            user_id: user_id.into(),
            subcollection: subcollection.into(),
        }
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.root, self.user_id, self.subcollection)
    }
}

/// A stored document: a store-assigned id plus its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Deserialize the fields into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|e| Error::InvalidDocument(format!("{}: {}", self.id, e)))
    }
}

/// Collection-scoped CRUD over a document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents whose `field` equals `value`.
    async fn query_by_field(
        &self,
        path: &CollectionPath,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>>;

    /// Insert a new document. The store assigns the id and stamps [`ADDED_AT`].
    async fn insert(&self, path: &CollectionPath, fields: Fields) -> Result<Document>;

    /// Merge `fields` into an existing document and stamp [`UPDATED_AT`].
    async fn update_by_id(&self, path: &CollectionPath, id: &str, fields: Fields) -> Result<()>;

    /// Delete a document. Deleting an absent id succeeds.
    async fn delete_by_id(&self, path: &CollectionPath, id: &str) -> Result<()>;

    /// Every document in the collection, oldest first.
    async fn read_all(&self, path: &CollectionPath) -> Result<Vec<Document>>;
}

#[derive(Debug, Default)]
struct Faults {
    reads: bool,
    writes: bool,
    products: HashSet<String>,
}

/// In-process [`DocumentStore`].
///
/// Useful offline and in tests; faults can be switched on to simulate an
/// unreachable or rejecting backend.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<CollectionPath, Vec<Document>>>,
    faults: Mutex<Faults>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn now_value() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read fail.
    pub fn fail_reads(&self, enabled: bool) {
        lock(&self.faults).reads = enabled;
    }

    /// Make every write fail.
    pub fn fail_writes(&self, enabled: bool) {
        lock(&self.faults).writes = enabled;
    }

    /// Make writes touching documents with `id == product_id` fail.
    pub fn fail_writes_for(&self, product_id: impl Into<String>) {
        lock(&self.faults).products.insert(product_id.into());
    }

    /// Clear every injected fault.
    pub fn heal(&self) {
        *lock(&self.faults) = Faults::default();
    }

    /// Snapshot of a collection, bypassing fault injection.
    pub fn documents(&self, path: &CollectionPath) -> Vec<Document> {
        lock(&self.collections)
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    fn check_read(&self) -> Result<()> {
        if lock(&self.faults).reads {
            return Err(Error::Backend("read unavailable".into()));
        }
        Ok(())
    }

    fn check_write(&self, fields: &Fields) -> Result<()> {
        let faults = lock(&self.faults);
        if faults.writes {
            return Err(Error::Backend("write unavailable".into()));
        }
        if let Some(Value::String(product_id)) = fields.get("id") {
            if faults.products.contains(product_id) {
                return Err(Error::Backend(format!("write rejected for {product_id}")));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn query_by_field(
        &self,
        path: &CollectionPath,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>> {
        self.check_read()?;
        let collections = lock(&self.collections);
        Ok(collections
            .get(path)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| doc.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, path: &CollectionPath, mut fields: Fields) -> Result<Document> {
        self.check_write(&fields)?;
        fields.insert(ADDED_AT.to_string(), now_value());

        let document = Document::new(uuid::Uuid::new_v4().to_string(), fields);
        lock(&self.collections)
            .entry(path.clone())
            .or_default()
            .push(document.clone());
        Ok(document)
    }

    async fn update_by_id(&self, path: &CollectionPath, id: &str, fields: Fields) -> Result<()> {
        let mut collections = lock(&self.collections);
        let document = collections
            .get_mut(path)
            .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
            .ok_or_else(|| Error::Backend(format!("no document {id} in {path}")))?;

        self.check_write(&document.fields)?;
        document.fields.extend(fields);
        document.fields.insert(UPDATED_AT.to_string(), now_value());
        Ok(())
    }

    async fn delete_by_id(&self, path: &CollectionPath, id: &str) -> Result<()> {
        let mut collections = lock(&self.collections);
        let Some(docs) = collections.get_mut(path) else {
            return Ok(());
        };

        if let Some(document) = docs.iter().find(|doc| doc.id == id) {
            self.check_write(&document.fields)?;
        }
        docs.retain(|doc| doc.id != id);
        Ok(())
    }

    async fn read_all(&self, path: &CollectionPath) -> Result<Vec<Document>> {
        self.check_read()?;
        Ok(self.documents(path))
    }
}
