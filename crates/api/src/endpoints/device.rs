//! Device command endpoints.
//!
//! The console addresses controllers by device address, not door id; the
//! handler resolves the address and submits through the dispatcher, then
//! waits for the terminal outcome.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use lockwork_common::{AppError, AppResult};
use lockwork_dispatch::{CommandKind, CommandOutcome};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{extractors::AuthSession, middleware::AppState};

/// Create device command router.
pub fn router() -> Router<AppState> {
    Router::new().route("/{device_address}/command", post(send_command))
}

/// Device command request.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub cmd: String,
}

/// Send a command to the controller behind a device address.
async fn send_command(
    _session: AuthSession,
    State(state): State<AppState>,
    Path(device_address): Path<String>,
    Json(req): Json<CommandRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let Some(kind) = CommandKind::parse(&req.cmd) else {
        return Err(AppError::BadRequest(format!("unknown command: {}", req.cmd)));
    };

    let door = state.door_service.get_by_address(&device_address).await?;

    let outcome = match kind {
        CommandKind::Lock => state.dispatcher.lock(door.id).await?,
        CommandKind::Unlock => state.dispatcher.unlock(door.id).await?,
        CommandKind::RefreshPermission => state.dispatcher.refresh_permissions(door.id).await?,
    };

    match outcome {
        CommandOutcome::Acknowledged => {
            info!(door_id = door.id, command = %kind, "Command acknowledged");
            Ok(Json(json!({
                "message": format!("Command {kind} acknowledged by {device_address}")
            })))
        }
        CommandOutcome::Failed(reason) => Err(AppError::DeviceUnreachable(reason)),
    }
}
