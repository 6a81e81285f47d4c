//! Access key repository.

use std::sync::Arc;

use crate::entities::{AccessKey, access_key, access_key::KeyStatus};
use lockwork_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

/// Access key repository for database operations.
#[derive(Clone)]
pub struct AccessKeyRepository {
    db: Arc<DatabaseConnection>,
}

impl AccessKeyRepository {
    /// Wraps the shared connection pool.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a key by ID.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<access_key::Model>> {
        AccessKey::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a key by its physical credential identifier.
    pub async fn find_by_uid(&self, key_uid: &str) -> AppResult<Option<access_key::Model>> {
        AccessKey::find()
            .filter(access_key::Column::KeyUid.eq(key_uid))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List all keys, newest first.
    pub async fn find_all(&self) -> AppResult<Vec<access_key::Model>> {
        AccessKey::find()
            .order_by_desc(access_key::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find active keys among a set of IDs.
    ///
    /// Used for allow-list computation: inactive keys keep their permission
    /// rows but are withheld from controllers.
    pub async fn find_active_by_ids(&self, ids: &[i64]) -> AppResult<Vec<access_key::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        AccessKey::find()
            .filter(access_key::Column::Id.is_in(ids.iter().copied()))
            .filter(access_key::Column::Status.eq(KeyStatus::Active))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new key.
    pub async fn create(&self, model: access_key::ActiveModel) -> AppResult<access_key::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a key.
    pub async fn update(&self, model: access_key::ActiveModel) -> AppResult<access_key::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a key by ID. Returns the number of rows removed.
    ///
    /// Permission rows cascade at the database level; callers that need the
    /// affected doors must collect them before deleting.
    pub async fn delete(&self, id: i64) -> AppResult<u64> {
        AccessKey::delete_by_id(id)
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

    fn create_test_key(id: i64, key_uid: &str, status: KeyStatus) -> access_key::Model {
        access_key::Model {
            id,
            key_uid: key_uid.to_string(),
            label: String::new(),
            user_id: None,
            status,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_uid_found() {
        let key = create_test_key(1, "A1B2C3D4", KeyStatus::Active);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[key.clone()]])
                .into_connection(),
        );

        let repo = AccessKeyRepository::new(db);
        let result = repo.find_by_uid("A1B2C3D4").await.unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().key_uid, "A1B2C3D4");
    }

    #[tokio::test]
    async fn test_find_by_uid_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<access_key::Model>::new()])
                .into_connection(),
        );

        let repo = AccessKeyRepository::new(db);
        let result = repo.find_by_uid("FFFFFFFF").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_find_active_by_ids_empty_input_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = AccessKeyRepository::new(db);
        let result = repo.find_active_by_ids(&[]).await.unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_find_active_by_ids() {
        let active = create_test_key(1, "A1B2C3D4", KeyStatus::Active);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[active]])
                .into_connection(),
        );

        let repo = AccessKeyRepository::new(db);
        let result = repo.find_active_by_ids(&[1, 2]).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].status, KeyStatus::Active);
    }

    #[tokio::test]
    async fn test_delete_missing_key_reports_zero_rows() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = AccessKeyRepository::new(db);
        let removed = repo.delete(42).await.unwrap();

        assert_eq!(removed, 0);
    }
}
