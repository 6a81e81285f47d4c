//! Door repository.

use std::sync::Arc;

use crate::entities::{Door, door, door::DoorStatus};
use lockwork_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    sea_query::Expr,
};

/// Door repository for database operations.
#[derive(Clone)]
pub struct DoorRepository {
    db: Arc<DatabaseConnection>,
}

impl DoorRepository {
    /// Wraps the shared connection pool.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a door by ID.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<door::Model>> {
        Door::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find doors by a set of IDs.
    pub async fn find_by_ids(&self, ids: &[i64]) -> AppResult<Vec<door::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Door::find()
            .filter(door::Column::Id.is_in(ids.iter().copied()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a door by its controller network address.
    pub async fn find_by_address(&self, device_address: &str) -> AppResult<Option<door::Model>> {
        Door::find()
            .filter(door::Column::DeviceAddress.eq(device_address))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List all doors.
    pub async fn find_all(&self) -> AppResult<Vec<door::Model>> {
        Door::find()
            .order_by_asc(door::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new door.
    pub async fn create(&self, model: door::ActiveModel) -> AppResult<door::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a door.
    pub async fn update(&self, model: door::ActiveModel) -> AppResult<door::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Overwrite the advisory lock state without touching `last_seen_at`.
    ///
    /// Used for manual status overrides from the console; `last_seen_at`
    /// records controller contact only.
    pub async fn update_status(&self, id: i64, status: DoorStatus) -> AppResult<u64> {
        Door::update_many()
            .col_expr(door::Column::Status, Expr::value(status))
            .filter(door::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map(|res| res.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record an acknowledged controller contact.
    ///
    /// Bumps `last_seen_at`; also sets the advisory lock state when the
    /// acknowledged command was a `lock`/`unlock`.
    pub async fn mark_contact(&self, id: i64, status: Option<DoorStatus>) -> AppResult<u64> {
        let now: sea_orm::entity::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        let mut query = Door::update_many().col_expr(door::Column::LastSeenAt, Expr::value(now));
        if let Some(status) = status {
            query = query.col_expr(door::Column::Status, Expr::value(status));
        }
        query
            .filter(door::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map(|res| res.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a door by ID. Returns the number of rows removed.
    ///
    /// Permission rows cascade at the database level.
    pub async fn delete(&self, id: i64) -> AppResult<u64> {
        Door::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map(|res| res.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

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
    async fn test_find_by_address_found() {
        let door = create_test_door(1, "Main Entrance", "10.0.0.5");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[door.clone()]])
                .into_connection(),
        );

        let repo = DoorRepository::new(db);
        let result = repo.find_by_address("10.0.0.5").await.unwrap();

        assert!(result.is_some());
        let found = result.unwrap();
        assert_eq!(found.name, "Main Entrance");
        assert_eq!(found.device_address, "10.0.0.5");
    }

    #[tokio::test]
    async fn test_find_by_address_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<door::Model>::new()])
                .into_connection(),
        );

        let repo = DoorRepository::new(db);
        let result = repo.find_by_address("10.0.0.99").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_find_by_ids_empty_input_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = DoorRepository::new(db);
        let result = repo.find_by_ids(&[]).await.unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_update_status_reports_rows_affected() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = DoorRepository::new(db);
        let updated = repo.update_status(1, DoorStatus::Locked).await.unwrap();

        assert_eq!(updated, 1);
    }

    #[tokio::test]
    async fn test_mark_contact_missing_door_reports_zero_rows() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = DoorRepository::new(db);
        let updated = repo.mark_contact(42, None).await.unwrap();

        assert_eq!(updated, 0);
    }
}
