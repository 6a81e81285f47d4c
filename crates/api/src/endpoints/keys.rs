//! Access key endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use lockwork_common::AppResult;
use lockwork_core::services::key::{CreateKeyInput, KeyWithOwner, UpdateKeyInput};
use lockwork_db::entities::access_key;
use serde_json::json;

use crate::{extractors::AuthSession, middleware::AppState};

/// Create access key router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_keys))
        .route("/", post(create_key))
        .route("/{id}", put(update_key))
        .route("/{id}", delete(delete_key))
}

/// List all keys with their owners' names.
async fn list_keys(
    _session: AuthSession,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<KeyWithOwner>>> {
    let keys = state.key_service.list().await?;
    Ok(Json(keys))
}

/// Register a new key.
async fn create_key(
    _session: AuthSession,
    State(state): State<AppState>,
    Json(req): Json<CreateKeyInput>,
) -> AppResult<(StatusCode, Json<access_key::Model>)> {
    let key = state.key_service.create(req).await?;
    Ok((StatusCode::CREATED, Json(key)))
}

/// Update a key's label, owner, or status. The uid is immutable.
async fn update_key(
    _session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateKeyInput>,
) -> AppResult<Json<access_key::Model>> {
    let key = state.key_service.update(id, req).await?;
    Ok(Json(key))
}

/// Delete a key. Its permissions cascade and the affected doors are
/// reconciled.
async fn delete_key(
    _session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    state.key_service.delete(id).await?;
    Ok(Json(json!({ "message": "Key deleted" })))
}
