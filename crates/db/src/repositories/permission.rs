//! Permission repository.

use std::collections::HashSet;
use std::sync::Arc;

use crate::entities::{Permission, permission};
use lockwork_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, sea_query::Expr,
};

/// Net effect of a full allow-list replacement for one key.
///
/// Door IDs are sorted so callers publish change events in a stable order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub added: Vec<i64>,
    pub removed: Vec<i64>,
}

impl ReplaceOutcome {
    /// True when the replacement left the permission table unchanged.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Permission repository for database operations.
#[derive(Clone)]
pub struct PermissionRepository {
    db: Arc<DatabaseConnection>,
}

impl PermissionRepository {
    /// Wraps the shared connection pool.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the permission row for a (key, door) pair.
    pub async fn find_by_pair(
        &self,
        key_id: i64,
        door_id: i64,
    ) -> AppResult<Option<permission::Model>> {
        Permission::find()
            .filter(permission::Column::KeyId.eq(key_id))
            .filter(permission::Column::DoorId.eq(door_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List all permissions held by a key.
    pub async fn list_for_key(&self, key_id: i64) -> AppResult<Vec<permission::Model>> {
        Permission::find()
            .filter(permission::Column::KeyId.eq(key_id))
            .order_by_asc(permission::Column::DoorId)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List all permissions granted on a door.
    pub async fn list_for_door(&self, door_id: i64) -> AppResult<Vec<permission::Model>> {
        Permission::find()
            .filter(permission::Column::DoorId.eq(door_id))
            .order_by_asc(permission::Column::KeyId)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new permission row.
    pub async fn create(&self, model: permission::ActiveModel) -> AppResult<permission::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Re-stamp an existing permission with a new grantor and grant time.
    pub async fn touch(&self, id: i64, granted_by: i64) -> AppResult<u64> {
        let now: sea_orm::entity::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        Permission::update_many()
            .col_expr(permission::Column::GrantedBy, Expr::value(granted_by))
            .col_expr(permission::Column::GrantedAt, Expr::value(now))
            .filter(permission::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map(|res| res.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Remove the permission for a (key, door) pair. Returns rows removed.
    pub async fn delete_by_pair(&self, key_id: i64, door_id: i64) -> AppResult<u64> {
        Permission::delete_many()
            .filter(permission::Column::KeyId.eq(key_id))
            .filter(permission::Column::DoorId.eq(door_id))
            .exec(self.db.as_ref())
            .await
            .map(|res| res.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replace a key's entire door set in one transaction.
    ///
    /// Deletes pairs absent from `door_ids`, inserts pairs new to it, and
    /// re-stamps granted_by/granted_at on pairs present in both. Returns
    /// the symmetric difference so the caller knows which doors changed.
    pub async fn replace_for_key(
        &self,
        key_id: i64,
        door_ids: &[i64],
        granted_by: i64,
    ) -> AppResult<ReplaceOutcome> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let current: HashSet<i64> = Permission::find()
            .filter(permission::Column::KeyId.eq(key_id))
            .all(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .into_iter()
            .map(|p| p.door_id)
            .collect();
        let desired: HashSet<i64> = door_ids.iter().copied().collect();

        let mut removed: Vec<i64> = current.difference(&desired).copied().collect();
        let mut added: Vec<i64> = desired.difference(&current).copied().collect();
        let retained: Vec<i64> = desired.intersection(&current).copied().collect();
        removed.sort_unstable();
        added.sort_unstable();

        if !removed.is_empty() {
            Permission::delete_many()
                .filter(permission::Column::KeyId.eq(key_id))
                .filter(permission::Column::DoorId.is_in(removed.iter().copied()))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        let now: sea_orm::entity::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        for door_id in &added {
            let model = permission::ActiveModel {
                key_id: Set(key_id),
                door_id: Set(*door_id),
                granted_by: Set(granted_by),
                granted_at: Set(now),
                ..Default::default()
            };
            model
                .insert(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        if !retained.is_empty() {
            Permission::update_many()
                .col_expr(permission::Column::GrantedBy, Expr::value(granted_by))
                .col_expr(permission::Column::GrantedAt, Expr::value(now))
                .filter(permission::Column::KeyId.eq(key_id))
                .filter(permission::Column::DoorId.is_in(retained))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(ReplaceOutcome { added, removed })
    }
}
