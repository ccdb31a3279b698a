//! Collection routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use tote_engine::{
    http::{FieldQuery, FieldsBody},
    CollectionPath, Document,
};

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::handlers::{handle_delete, handle_insert, handle_list, handle_update};
use crate::websocket::ServerMessage;
use crate::AppState;

/// Create collection routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/collections/{root}/{user_id}/{subcollection}",
            get(list_handler).post(insert_handler),
        )
        .route(
            "/collections/{root}/{user_id}/{subcollection}/{document_id}",
            patch(update_handler).delete(delete_handler),
        )
}

#[derive(Debug, Deserialize)]
struct CollectionParams {
    root: String,
    user_id: String,
    subcollection: String,
}

#[derive(Debug, Deserialize)]
struct DocumentParams {
    root: String,
    user_id: String,
    subcollection: String,
    document_id: String,
}

fn authorize(auth: &AuthUser, path: CollectionPath) -> Result<CollectionPath> {
    if auth.can_access(&path) {
        Ok(path)
    } else {
        Err(AppError::Forbidden(format!(
            "{} may not access {}",
            auth.user_id, path
        )))
    }
}

fn announce(state: &AppState, path: &CollectionPath) {
    state
        .conn_manager
        .notify_user(&path.user_id, ServerMessage::changed(path));
}

/// GET /collections/{root}/{user_id}/{subcollection}
async fn list_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(params): Path<CollectionParams>,
    Query(query): Query<FieldQuery>,
) -> Result<Json<Vec<Document>>> {
    let path = authorize(
        &auth,
        CollectionPath::new(params.root, params.user_id, params.subcollection),
    )?;
    let documents = handle_list(&state.pool, &path, query).await?;
    Ok(Json(documents))
}

/// POST /collections/{root}/{user_id}/{subcollection}
async fn insert_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(params): Path<CollectionParams>,
    Json(body): Json<FieldsBody>,
) -> Result<(StatusCode, Json<Document>)> {
    let path = authorize(
        &auth,
        CollectionPath::new(params.root, params.user_id, params.subcollection),
    )?;
    let document = handle_insert(&state.pool, &path, body).await?;
    announce(&state, &path);
    Ok((StatusCode::CREATED, Json(document)))
}

/// PATCH /collections/{root}/{user_id}/{subcollection}/{document_id}
async fn update_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(params): Path<DocumentParams>,
    Json(body): Json<FieldsBody>,
) -> Result<StatusCode> {
    let path = authorize(
        &auth,
        CollectionPath::new(params.root, params.user_id, params.subcollection),
    )?;
    handle_update(&state.pool, &path, &params.document_id, body).await?;
    announce(&state, &path);
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /collections/{root}/{user_id}/{subcollection}/{document_id}
async fn delete_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(params): Path<DocumentParams>,
) -> Result<StatusCode> {
    let path = authorize(
        &auth,
        CollectionPath::new(params.root, params.user_id, params.subcollection),
    )?;
    handle_delete(&state.pool, &path, &params.document_id).await?;
    announce(&state, &path);
    Ok(StatusCode::NO_CONTENT)
}
