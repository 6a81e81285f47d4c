//! Permission service.

use crate::services::events::PermissionChangePublisherService;
use chrono::{DateTime, FixedOffset};
use lockwork_common::{AppError, AppResult};
use lockwork_db::{
    entities::permission,
    repositories::{AccessKeyRepository, DoorRepository, PermissionRepository, ReplaceOutcome},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use validator::Validate;

/// Permission service for business logic.
///
/// Every write that changes a door's effective allow-list publishes the
/// affected door ids for reconciliation; reads never do.
#[derive(Clone)]
pub struct PermissionService {
    permission_repo: PermissionRepository,
    key_repo: AccessKeyRepository,
    door_repo: DoorRepository,
    publisher: Option<PermissionChangePublisherService>,
}

/// Full-replace request for one key's door set, as posted by the console.
#[derive(Debug, Deserialize, Validate)]
pub struct ReplacePermissionsInput {
    #[serde(rename = "keyId")]
    pub key_id: i64,

    /// The complete new door set; an empty list revokes everything.
    #[serde(default)]
    #[validate(length(max = 1024))]
    pub doors: Vec<i64>,

    #[serde(rename = "updatedBy")]
    pub updated_by: i64,
}

/// A permission row joined with door name and location.
///
/// Mixed field naming is the console contract.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionWithDoor {
    pub door_id: i64,
    #[serde(rename = "doorName")]
    pub door_name: String,
    pub location: String,
    pub granted_by: i64,
    pub granted_at: DateTime<FixedOffset>,
}

impl PermissionService {
    /// Built without a publisher; attach one with [`Self::set_publisher`].
    #[must_use]
    pub const fn new(
        permission_repo: PermissionRepository,
        key_repo: AccessKeyRepository,
        door_repo: DoorRepository,
    ) -> Self {
        Self {
            permission_repo,
            key_repo,
            door_repo,
            publisher: None,
        }
    }

    /// Set the permission-change publisher.
    pub fn set_publisher(&mut self, publisher: PermissionChangePublisherService) {
        self.publisher = Some(publisher);
    }

    /// Grant a key access to a door.
    ///
    /// Idempotent: an existing pair is re-stamped with the new grantor and
    /// grant time, no duplicate row is created and no change is published
    /// (the allow-list is unchanged).
    pub async fn grant(&self, key_id: i64, door_id: i64, granted_by: i64) -> AppResult<()> {
        if self.key_repo.find_by_id(key_id).await?.is_none() {
            return Err(AppError::InvalidReference(format!("key {key_id}")));
        }
        if self.door_repo.find_by_id(door_id).await?.is_none() {
            return Err(AppError::InvalidReference(format!("door {door_id}")));
        }

        if let Some(existing) = self.permission_repo.find_by_pair(key_id, door_id).await? {
            self.permission_repo.touch(existing.id, granted_by).await?;
            tracing::debug!(key_id, door_id, "Grant re-stamped existing permission");
            return Ok(());
        }

        let model = permission::ActiveModel {
            key_id: Set(key_id),
            door_id: Set(door_id),
            granted_by: Set(granted_by),
            granted_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };
        self.permission_repo.create(model).await?;

        tracing::info!(key_id, door_id, granted_by, "Permission granted");
        self.publish(&[door_id]).await;
        Ok(())
    }

    /// Revoke a key's access to a door.
    pub async fn revoke(&self, key_id: i64, door_id: i64) -> AppResult<()> {
        let deleted = self.permission_repo.delete_by_pair(key_id, door_id).await?;
        if deleted == 0 {
            return Err(AppError::NotFound(format!(
                "permission key {key_id} / door {door_id}"
            )));
        }

        tracing::info!(key_id, door_id, "Permission revoked");
        self.publish(&[door_id]).await;
        Ok(())
    }

    /// List a key's permissions with door name and location.
    ///
    /// An unknown key yields an empty list, matching the console contract.
    pub async fn list_for_key(&self, key_id: i64) -> AppResult<Vec<PermissionWithDoor>> {
        let perms = self.permission_repo.list_for_key(key_id).await?;

        let door_ids: Vec<i64> = perms.iter().map(|p| p.door_id).collect();
        let doors: HashMap<i64, (String, String)> = self
            .door_repo
            .find_by_ids(&door_ids)
            .await?
            .into_iter()
            .map(|d| (d.id, (d.name, d.location)))
            .collect();

        Ok(perms
            .into_iter()
            .filter_map(|p| {
                doors.get(&p.door_id).map(|(name, location)| PermissionWithDoor {
                    door_id: p.door_id,
                    door_name: name.clone(),
                    location: location.clone(),
                    granted_by: p.granted_by,
                    granted_at: p.granted_at,
                })
            })
            .collect())
    }

    /// The door's current allow-list: `key_uid`s of active keys permitted
    /// on it. Inactive keys are withheld from controllers.
    pub async fn list_keys_for_door(&self, door_id: i64) -> AppResult<Vec<String>> {
        let perms = self.permission_repo.list_for_door(door_id).await?;
        let key_ids: Vec<i64> = perms.iter().map(|p| p.key_id).collect();

        let mut uids: Vec<String> = self
            .key_repo
            .find_active_by_ids(&key_ids)
            .await?
            .into_iter()
            .map(|k| k.key_uid)
            .collect();
        uids.sort_unstable();
        Ok(uids)
    }

    /// Replace a key's entire door set (the console's save operation).
    ///
    /// Publishes the symmetric difference; saving an unchanged set
    /// publishes nothing.
    pub async fn replace_for_key(
        &self,
        input: ReplacePermissionsInput,
    ) -> AppResult<ReplaceOutcome> {
        input.validate()?;

        if self.key_repo.find_by_id(input.key_id).await?.is_none() {
            return Err(AppError::InvalidReference(format!("key {}", input.key_id)));
        }

        let unique: BTreeSet<i64> = input.doors.iter().copied().collect();
        let door_ids: Vec<i64> = unique.into_iter().collect();
        let found = self.door_repo.find_by_ids(&door_ids).await?;
        if found.len() != door_ids.len() {
            let known: BTreeSet<i64> = found.iter().map(|d| d.id).collect();
            let missing: Vec<String> = door_ids
                .iter()
                .filter(|id| !known.contains(id))
                .map(ToString::to_string)
                .collect();
            return Err(AppError::InvalidReference(format!(
                "door(s) {}",
                missing.join(", ")
            )));
        }

        let outcome = self
            .permission_repo
            .replace_for_key(input.key_id, &door_ids, input.updated_by)
            .await?;

        let mut affected = outcome.removed.clone();
        affected.extend(&outcome.added);
        if !affected.is_empty() {
            tracing::info!(
                key_id = input.key_id,
                added = outcome.added.len(),
                removed = outcome.removed.len(),
                "Permission set replaced"
            );
            self.publish(&affected).await;
        }

        Ok(outcome)
    }

    /// Publish a change; failures are logged, never surfaced, because the
    /// durable write already succeeded and the engine will catch up.
    async fn publish(&self, door_ids: &[i64]) {
        if let Some(ref publisher) = self.publisher
            && let Err(e) = publisher.publish_permission_change(door_ids).await
        {
            tracing::warn!(error = %e, "Failed to publish permission change");
        }
    }
}
