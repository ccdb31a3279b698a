//! Collection document handlers.
//!
//! Handlers take an already authorized [`CollectionPath`]; access checks
//! live in the routes.

use serde_json::Value;
use sqlx::PgPool;
use tote_engine::{
    http::{FieldQuery, FieldsBody},
    CollectionPath, Document,
};
use uuid::Uuid;

use crate::db;
use crate::error::{AppError, Result};

/// Read a collection, optionally filtered by one field.
pub async fn handle_list(
    pool: &PgPool,
    path: &CollectionPath,
    query: FieldQuery,
) -> Result<Vec<Document>> {
    let rows = match (query.field, query.value) {
        (Some(field), Some(value)) => {
            let value: Value = serde_json::from_str(&value)
                .map_err(|e| AppError::BadRequest(format!("value is not valid JSON: {e}")))?;
            db::find_documents(pool, path, &field, &value).await?
        }
        (None, None) => db::list_documents(pool, path).await?,
        _ => {
            return Err(AppError::BadRequest(
                "field and value must be given together".to_string(),
            ))
        }
    };

    Ok(rows.into_iter().map(db::StoredDocument::into_document).collect())
}

pub async fn handle_insert(
    pool: &PgPool,
    path: &CollectionPath,
    body: FieldsBody,
) -> Result<Document> {
    let stored = db::insert_document(pool, path, &body.fields).await?;
    tracing::debug!(path = %path, id = %stored.id, "Document inserted");
    Ok(stored.into_document())
}

pub async fn handle_update(
    pool: &PgPool,
    path: &CollectionPath,
    document_id: &str,
    body: FieldsBody,
) -> Result<()> {
    let not_found = || AppError::NotFound(format!("document {document_id} in {path}"));
    let id = parse_document_id(document_id).ok_or_else(not_found)?;

    if db::update_document(pool, path, id, &body.fields).await? {
        Ok(())
    } else {
        Err(not_found())
    }
}

/// Delete a document. Unknown ids succeed.
pub async fn handle_delete(pool: &PgPool, path: &CollectionPath, document_id: &str) -> Result<()> {
    let Some(id) = parse_document_id(document_id) else {
        return Ok(());
    };

    if !db::delete_document(pool, path, id).await? {
        tracing::debug!(path = %path, id = %id, "Delete of absent document");
    }
    Ok(())
}

fn parse_document_id(document_id: &str) -> Option<Uuid> {
    Uuid::parse_str(document_id).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_ids_are_uuids() {
        let id = Uuid::new_v4();
        assert_eq!(parse_document_id(&id.to_string()), Some(id));
        assert_eq!(parse_document_id("not-a-uuid"), None);
    }
}
