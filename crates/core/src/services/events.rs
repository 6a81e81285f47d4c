//! Permission-change event publishing.
//!
//! Provides an abstraction for notifying the reconciliation engine that the
//! permission table changed for a set of doors. The actual implementation is
//! provided by the dispatch crate.

use async_trait::async_trait;
use lockwork_common::AppResult;
use std::sync::Arc;

/// A permission-table change affecting one or more doors.
///
/// Carries door ids only; the allow-list itself is recomputed from the
/// database at send time, so a stale event can never ship stale data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionChange {
    /// Doors whose effective allow-list may have changed.
    pub door_ids: Vec<i64>,
}

/// Trait for publishing permission-change events.
///
/// This allows the core services to trigger reconciliation without
/// directly depending on the engine implementation.
#[async_trait]
pub trait PermissionChangePublisher: Send + Sync {
    /// Publish a change for the given doors.
    async fn publish_permission_change(&self, door_ids: &[i64]) -> AppResult<()>;
}

/// A no-op implementation for testing or when no engine is wired.
#[derive(Clone, Default)]
pub struct NoOpPermissionChangePublisher;

#[async_trait]
impl PermissionChangePublisher for NoOpPermissionChangePublisher {
    async fn publish_permission_change(&self, _door_ids: &[i64]) -> AppResult<()> {
        Ok(())
    }
}

/// Wrapper for boxed publisher trait object.
pub type PermissionChangePublisherService = Arc<dyn PermissionChangePublisher>;
