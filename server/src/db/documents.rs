//! Database operations for the documents table.
//!
//! Timestamps inside `fields` are stamped by Postgres so every client sees
//! the same clock.

use serde_json::Value;
use sqlx::{types::Json, PgPool, Row};
use tote_engine::{document::Fields, CollectionPath, Document};
use uuid::Uuid;

/// A stored document row from the database.
#[derive(Debug)]
pub struct StoredDocument {
    pub id: Uuid,
    pub fields: Value,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredDocument {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredDocument {
            id: row.try_get("id")?,
            fields: row.try_get("fields")?,
        })
    }
}

impl StoredDocument {
    /// Convert database row to the engine's wire document.
    pub fn into_document(self) -> Document {
        let fields = match self.fields {
            Value::Object(fields) => fields,
            other => {
                tracing::warn!(id = %self.id, "Document fields are not an object: {}", other);
                Fields::new()
            }
        };
        Document::new(self.id.to_string(), fields)
    }
}

const COLUMNS: &str = "id, fields";

/// Every document of a collection, oldest first.
pub async fn list_documents(
    pool: &PgPool,
    path: &CollectionPath,
) -> Result<Vec<StoredDocument>, sqlx::Error> {
    sqlx::query_as::<_, StoredDocument>(&format!(
        r#"
        SELECT {COLUMNS} FROM documents
        WHERE root = $1 AND user_id = $2 AND subcollection = $3
        ORDER BY seq ASC
        "#
    ))
    .bind(&path.root)
    .bind(&path.user_id)
    .bind(&path.subcollection)
    .fetch_all(pool)
    .await
}

/// Documents of a collection whose top-level `field` equals `value`.
pub async fn find_documents(
    pool: &PgPool,
    path: &CollectionPath,
    field: &str,
    value: &Value,
) -> Result<Vec<StoredDocument>, sqlx::Error> {
    sqlx::query_as::<_, StoredDocument>(&format!(
        r#"
        SELECT {COLUMNS} FROM documents
        WHERE root = $1 AND user_id = $2 AND subcollection = $3
          AND fields -> $4 = $5
        ORDER BY seq ASC
        "#
    ))
    .bind(&path.root)
    .bind(&path.user_id)
    .bind(&path.subcollection)
    .bind(field)
    .bind(Json(value))
    .fetch_all(pool)
    .await
}

/// Insert a document with a fresh id and an `addedAt` stamp.
pub async fn insert_document(
    pool: &PgPool,
    path: &CollectionPath,
    fields: &Fields,
) -> Result<StoredDocument, sqlx::Error> {
    sqlx::query_as::<_, StoredDocument>(&format!(
        r#"
        INSERT INTO documents (id, root, user_id, subcollection, fields)
        VALUES ($1, $2, $3, $4, $5 || jsonb_build_object('addedAt', to_jsonb(now())))
        RETURNING {COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(&path.root)
    .bind(&path.user_id)
    .bind(&path.subcollection)
    .bind(Json(fields))
    .fetch_one(pool)
    .await
}

/// Merge `fields` into a document and stamp `updatedAt`.
///
/// Returns `false` when the document does not exist in this collection.
pub async fn update_document(
    pool: &PgPool,
    path: &CollectionPath,
    id: Uuid,
    fields: &Fields,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET fields = fields || $5 || jsonb_build_object('updatedAt', to_jsonb(now())),
            updated_at = now()
        WHERE id = $1 AND root = $2 AND user_id = $3 AND subcollection = $4
        "#,
    )
    .bind(id)
    .bind(&path.root)
    .bind(&path.user_id)
    .bind(&path.subcollection)
    .bind(Json(fields))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a document. Returns whether a row was removed.
pub async fn delete_document(
    pool: &PgPool,
    path: &CollectionPath,
    id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM documents
        WHERE id = $1 AND root = $2 AND user_id = $3 AND subcollection = $4
        "#,
    )
    .bind(id)
    .bind(&path.root)
    .bind(&path.user_id)
    .bind(&path.subcollection)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
