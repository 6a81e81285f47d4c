//! Door endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use lockwork_common::AppResult;
use lockwork_core::services::door::{CreateDoorInput, DoorResponse, UpdateDoorInput};
use lockwork_db::entities::door::DoorStatus;
use serde::Deserialize;
use serde_json::json;

use crate::{extractors::AuthSession, middleware::AppState};

/// Create door router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_doors))
        .route("/", post(create_door))
        .route("/{id}", put(update_door))
        .route("/{id}", delete(delete_door))
        .route("/{id}/status", put(set_door_status))
}

/// List all doors.
async fn list_doors(
    _session: AuthSession,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<DoorResponse>>> {
    let doors = state.door_service.list().await?;
    Ok(Json(doors.into_iter().map(DoorResponse::from).collect()))
}

/// Register a new door.
async fn create_door(
    _session: AuthSession,
    State(state): State<AppState>,
    Json(req): Json<CreateDoorInput>,
) -> AppResult<(StatusCode, Json<DoorResponse>)> {
    let door = state.door_service.create(req).await?;
    Ok((StatusCode::CREATED, Json(DoorResponse::from(door))))
}

/// Update a door's name, location, or device address.
async fn update_door(
    _session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateDoorInput>,
) -> AppResult<Json<DoorResponse>> {
    let door = state.door_service.update(id, req).await?;
    Ok(Json(DoorResponse::from(door)))
}

/// Manual status override request.
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: DoorStatus,
}

/// Override a door's recorded status without sending a command.
async fn set_door_status(
    _session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<SetStatusRequest>,
) -> AppResult<Json<DoorResponse>> {
    let door = state.door_service.set_status(id, req.status).await?;
    Ok(Json(DoorResponse::from(door)))
}

/// Delete a door.
async fn delete_door(
    _session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    state.door_service.delete(id).await?;
    Ok(Json(json!({ "message": "Door deleted" })))
}
