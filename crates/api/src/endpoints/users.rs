//! User endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use lockwork_common::AppResult;
use lockwork_db::entities::user::{self, UserRole};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{extractors::AuthSession, middleware::AppState};

/// Create user router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/", post(create_user))
        .route("/{id}", delete(delete_user))
}

/// Create user request.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: String,

    /// Defaults to `operator` when absent.
    pub role: Option<UserRole>,
}

/// List all users.
async fn list_users(
    _session: AuthSession,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<user::Model>>> {
    let users = state.user_service.list().await?;
    Ok(Json(users))
}

/// Create a user.
async fn create_user(
    _session: AuthSession,
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<user::Model>)> {
    req.validate()?;
    let role = req.role.unwrap_or(UserRole::Operator);
    let user = state.user_service.create(&req.name, role).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Delete a user. Their keys are detached, not deleted.
async fn delete_user(
    _session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    state.user_service.delete(id).await?;
    Ok(Json(json!({ "message": "User deleted" })))
}
