//! Door service.

use chrono::{DateTime, FixedOffset};
use lockwork_common::{AppError, AppResult};
use lockwork_db::{
    entities::door::{self, DoorStatus},
    repositories::DoorRepository,
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Door service for business logic.
#[derive(Clone)]
pub struct DoorService {
    door_repo: DoorRepository,
}

/// Input for registering a door.
///
/// Field names follow the console contract (doors are camelCase on the
/// wire).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDoorInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,

    #[validate(length(min = 1, max = 128))]
    pub location: String,

    #[serde(rename = "deviceAddress")]
    #[validate(length(min = 1, max = 255))]
    pub device_address: String,
}

/// Input for updating a door; at least one field must be present.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDoorInput {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 128))]
    pub location: Option<String>,

    #[serde(rename = "deviceAddress")]
    #[validate(length(min = 1, max = 255))]
    pub device_address: Option<String>,
}

impl UpdateDoorInput {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.location.is_none() && self.device_address.is_none()
    }
}

/// A door as serialized for the console.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorResponse {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub device_address: String,
    pub status: DoorStatus,
    pub last_seen_at: Option<DateTime<FixedOffset>>,
}

impl From<door::Model> for DoorResponse {
    fn from(model: door::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            location: model.location,
            device_address: model.device_address,
            status: model.status,
            last_seen_at: model.last_seen_at,
        }
    }
}

impl DoorService {
    /// Takes the repository it reads and writes through.
    #[must_use]
    pub const fn new(door_repo: DoorRepository) -> Self {
        Self { door_repo }
    }

    /// Register a door.
    pub async fn create(&self, input: CreateDoorInput) -> AppResult<door::Model> {
        input.validate()?;

        let model = door::ActiveModel {
            name: Set(input.name),
            location: Set(input.location),
            device_address: Set(input.device_address),
            status: Set(DoorStatus::Unknown),
            last_seen_at: Set(None),
            ..Default::default()
        };

        let created = self.door_repo.create(model).await?;
        tracing::info!(
            door_id = created.id,
            device_address = %created.device_address,
            "Door registered"
        );
        Ok(created)
    }

    /// List all doors.
    pub async fn list(&self) -> AppResult<Vec<door::Model>> {
        self.door_repo.find_all().await
    }

    /// Get a door by ID.
    pub async fn get(&self, id: i64) -> AppResult<door::Model> {
        self.door_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("door {id}")))
    }

    /// Get a door by its controller address.
    pub async fn get_by_address(&self, device_address: &str) -> AppResult<door::Model> {
        self.door_repo
            .find_by_address(device_address)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no door at {device_address}")))
    }

    /// Update a door's name, location, or controller address.
    pub async fn update(&self, id: i64, input: UpdateDoorInput) -> AppResult<door::Model> {
        input.validate()?;
        if input.is_empty() {
            return Err(AppError::Validation(
                "at least one of name, location, deviceAddress is required".to_string(),
            ));
        }

        let existing = self
            .door_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("door {id}")))?;

        let mut model: door::ActiveModel = existing.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(location) = input.location {
            model.location = Set(location);
        }
        if let Some(device_address) = input.device_address {
            model.device_address = Set(device_address);
        }

        self.door_repo.update(model).await
    }

    /// Manually override the advisory lock state.
    ///
    /// Does not touch `last_seen_at`: only an acknowledged controller
    /// contact counts as having seen the device.
    pub async fn set_status(&self, id: i64, status: DoorStatus) -> AppResult<door::Model> {
        let updated = self.door_repo.update_status(id, status).await?;
        if updated == 0 {
            return Err(AppError::NotFound(format!("door {id}")));
        }
        self.get(id).await
    }

    /// Delete a door.
    ///
    /// Permission rows cascade. No refresh is dispatched: the controller
    /// behind the address is no longer managed.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let deleted = self.door_repo.delete(id).await?;
        if deleted == 0 {
            return Err(AppError::NotFound(format!("door {id}")));
        }
        tracing::info!(door_id = id, "Door deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_door(id: i64, name: &str, device_address: &str) -> door::Model {
        door::Model {
            id,
            name: name.to_string(),
            location: "Building A".to_string(),
            device_address: device_address.to_string(),
            status: DoorStatus::Unknown,
            last_seen_at: None,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_update_with_no_fields_rejected() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = DoorService::new(DoorRepository::new(db));

        let result = service
            .update(
                1,
                UpdateDoorInput {
                    name: None,
                    location: None,
                    device_address: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_by_address_missing_returns_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<door::Model>::new()])
                .into_connection(),
        );
        let service = DoorService::new(DoorRepository::new(db));

        let result = service.get_by_address("10.0.0.99").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_status_missing_door_returns_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );
        let service = DoorService::new(DoorRepository::new(db));

        let result = service.set_status(99, DoorStatus::Locked).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_status_returns_updated_door() {
        let mut locked = create_test_door(1, "Main Entrance", "10.0.0.5");
        locked.status = DoorStatus::Locked;

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[locked]])
                .into_connection(),
        );
        let service = DoorService::new(DoorRepository::new(db));

        let door = service.set_status(1, DoorStatus::Locked).await.unwrap();

        assert_eq!(door.status, DoorStatus::Locked);
        assert!(door.last_seen_at.is_none());
    }

    #[tokio::test]
    async fn test_response_uses_console_field_names() {
        let door = create_test_door(1, "Main Entrance", "10.0.0.5");
        let response = DoorResponse::from(door);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("deviceAddress").is_some());
        assert!(json.get("lastSeenAt").is_some());
        assert_eq!(json["status"], "unknown");
    }
}
