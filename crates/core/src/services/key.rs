//! Access key service.

use crate::services::events::PermissionChangePublisherService;
use lockwork_common::{AppError, AppResult};
use lockwork_db::{
    entities::access_key::{self, KeyStatus},
    repositories::{AccessKeyRepository, PermissionRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Access key service for business logic.
#[derive(Clone)]
pub struct KeyService {
    key_repo: AccessKeyRepository,
    user_repo: UserRepository,
    permission_repo: PermissionRepository,
    publisher: Option<PermissionChangePublisherService>,
}

/// Input for registering a new key.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateKeyInput {
    /// Physical credential identifier, immutable after creation.
    #[validate(length(min = 1, max = 64))]
    pub key_uid: String,

    #[serde(default)]
    #[validate(length(max = 128))]
    pub label: String,

    /// Owning user; keys may be unassigned.
    pub user_id: Option<i64>,
}

/// Input for updating a key. `key_uid` is immutable and absent here.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateKeyInput {
    #[validate(length(max = 128))]
    pub label: Option<String>,

    pub user_id: Option<i64>,

    pub status: Option<KeyStatus>,
}

/// A key row joined with its owner's name, as listed by the console.
#[derive(Debug, Clone, Serialize)]
pub struct KeyWithOwner {
    pub id: i64,
    pub key_uid: String,
    pub label: String,
    pub user_id: Option<i64>,
    pub status: KeyStatus,
    /// Owning user's name, `null` when unassigned.
    pub owner: Option<String>,
}

impl KeyService {
    /// Built without a publisher; attach one with [`Self::set_publisher`].
    #[must_use]
    pub const fn new(
        key_repo: AccessKeyRepository,
        user_repo: UserRepository,
        permission_repo: PermissionRepository,
    ) -> Self {
        Self {
            key_repo,
            user_repo,
            permission_repo,
            publisher: None,
        }
    }

    /// Set the permission-change publisher.
    pub fn set_publisher(&mut self, publisher: PermissionChangePublisherService) {
        self.publisher = Some(publisher);
    }

    /// Register a key.
    pub async fn create(&self, input: CreateKeyInput) -> AppResult<access_key::Model> {
        input.validate()?;

        if self.key_repo.find_by_uid(&input.key_uid).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "key_uid {} already registered",
                input.key_uid
            )));
        }

        if let Some(user_id) = input.user_id
            && self.user_repo.find_by_id(user_id).await?.is_none()
        {
            return Err(AppError::InvalidReference(format!("user {user_id}")));
        }

        let model = access_key::ActiveModel {
            key_uid: Set(input.key_uid),
            label: Set(input.label),
            user_id: Set(input.user_id),
            status: Set(KeyStatus::Active),
            ..Default::default()
        };

        let created = self.key_repo.create(model).await?;
        tracing::info!(key_id = created.id, key_uid = %created.key_uid, "Key registered");
        Ok(created)
    }

    /// List all keys with owner names.
    pub async fn list(&self) -> AppResult<Vec<KeyWithOwner>> {
        let keys = self.key_repo.find_all().await?;

        let owner_ids: Vec<i64> = keys.iter().filter_map(|k| k.user_id).collect();
        let owners: HashMap<i64, String> = self
            .user_repo
            .find_by_ids(&owner_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();

        Ok(keys
            .into_iter()
            .map(|k| {
                let owner = k.user_id.and_then(|id| owners.get(&id).cloned());
                KeyWithOwner {
                    id: k.id,
                    key_uid: k.key_uid,
                    label: k.label,
                    user_id: k.user_id,
                    status: k.status,
                    owner,
                }
            })
            .collect())
    }

    /// Update a key's label, owner, or status. `key_uid` never changes.
    ///
    /// A status flip changes which doors effectively accept the key, so it
    /// publishes a change for every door the key has a permission on.
    pub async fn update(&self, id: i64, input: UpdateKeyInput) -> AppResult<access_key::Model> {
        input.validate()?;

        let existing = self
            .key_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("key {id}")))?;

        if let Some(user_id) = input.user_id
            && self.user_repo.find_by_id(user_id).await?.is_none()
        {
            return Err(AppError::InvalidReference(format!("user {user_id}")));
        }

        let status_changed = input.status.is_some_and(|s| s != existing.status);

        let mut model: access_key::ActiveModel = existing.into();
        if let Some(label) = input.label {
            model.label = Set(label);
        }
        if let Some(user_id) = input.user_id {
            model.user_id = Set(Some(user_id));
        }
        if let Some(status) = input.status {
            model.status = Set(status);
        }

        let updated = self.key_repo.update(model).await?;

        if status_changed {
            let door_ids: Vec<i64> = self
                .permission_repo
                .list_for_key(id)
                .await?
                .into_iter()
                .map(|p| p.door_id)
                .collect();
            self.publish(&door_ids).await;
            tracing::info!(
                key_id = id,
                status = ?updated.status,
                doors = door_ids.len(),
                "Key status changed"
            );
        }

        Ok(updated)
    }

    /// Delete a key.
    ///
    /// Permission rows cascade in the database; the affected doors are
    /// published for reconciliation and returned.
    pub async fn delete(&self, id: i64) -> AppResult<Vec<i64>> {
        if self.key_repo.find_by_id(id).await?.is_none() {
            return Err(AppError::NotFound(format!("key {id}")));
        }

        let door_ids: Vec<i64> = self
            .permission_repo
            .list_for_key(id)
            .await?
            .into_iter()
            .map(|p| p.door_id)
            .collect();

        self.key_repo.delete(id).await?;
        self.publish(&door_ids).await;

        tracing::info!(key_id = id, doors = door_ids.len(), "Key deleted");
        Ok(door_ids)
    }

    /// Publish a change; failures are logged, never surfaced, because the
    /// durable write already succeeded and the engine will catch up.
    async fn publish(&self, door_ids: &[i64]) {
        if door_ids.is_empty() {
            return;
        }
        if let Some(ref publisher) = self.publisher
            && let Err(e) = publisher.publish_permission_change(door_ids).await
        {
            tracing::warn!(error = %e, "Failed to publish permission change");
        }
    }
}
