//! Permission endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use lockwork_common::AppResult;
use lockwork_core::services::permission::{PermissionWithDoor, ReplacePermissionsInput};
use serde_json::json;

use crate::{extractors::AuthSession, middleware::AppState};

/// Create permission router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(replace_permissions))
        .route("/{key_id}", get(list_permissions))
}

/// List a key's permissions with door names.
async fn list_permissions(
    _session: AuthSession,
    State(state): State<AppState>,
    Path(key_id): Path<i64>,
) -> AppResult<Json<Vec<PermissionWithDoor>>> {
    let permissions = state.permission_service.list_for_key(key_id).await?;
    Ok(Json(permissions))
}

/// Replace a key's full door set. The affected doors are reconciled
/// asynchronously; the response does not wait for the controllers.
async fn replace_permissions(
    _session: AuthSession,
    State(state): State<AppState>,
    Json(req): Json<ReplacePermissionsInput>,
) -> AppResult<Json<serde_json::Value>> {
    state.permission_service.replace_for_key(req).await?;
    Ok(Json(json!({ "message": "Permissions updated" })))
}
