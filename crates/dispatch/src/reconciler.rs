//! Permission reconciliation engine.
//!
//! A single task owns the pending set and converges controllers to the
//! permission table: every change event marks its doors pending, every due
//! door gets a `refreshPermission`, and a door leaves the set only when a
//! refresh for its latest revision is acknowledged.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lockwork_common::config::ReconcilerConfig;
use lockwork_common::{AppError, AppResult, get_metrics};
use lockwork_core::{PermissionChange, PermissionChangePublisher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::command::CommandOutcome;
use crate::dispatcher::DoorCommandDispatcher;

/// Dispatch seam for the engine.
///
/// The production implementation is [`DoorCommandDispatcher`]; tests swap in
/// scripted stand-ins.
#[async_trait]
pub trait CommandDispatch: Send + Sync {
    /// Dispatch a `refreshPermission` and wait for its terminal outcome.
    async fn refresh_permissions(&self, door_id: i64) -> AppResult<CommandOutcome>;
}

#[async_trait]
impl CommandDispatch for DoorCommandDispatcher {
    async fn refresh_permissions(&self, door_id: i64) -> AppResult<CommandOutcome> {
        Self::refresh_permissions(self, door_id).await
    }
}

/// One door's reconciliation state.
#[derive(Debug)]
struct PendingDoor {
    revision: u64,
    attempts: u32,
    next_attempt_at: Instant,
    in_flight: bool,
}

/// Result of one dispatched refresh, tagged with the revision it shipped.
struct Completion {
    door_id: i64,
    revision: u64,
    outcome: AppResult<CommandOutcome>,
}

/// Cloneable publisher handle feeding the engine.
///
/// Core services hold this behind their publisher seam; publishing enqueues
/// the event and returns without waiting for convergence.
#[derive(Clone)]
pub struct ReconcilerHandle {
    events: mpsc::Sender<PermissionChange>,
}

#[async_trait]
impl PermissionChangePublisher for ReconcilerHandle {
    async fn publish_permission_change(&self, door_ids: &[i64]) -> AppResult<()> {
        self.events
            .send(PermissionChange {
                door_ids: door_ids.to_vec(),
            })
            .await
            .map_err(|_| AppError::Internal("reconciliation engine is not running".to_string()))
    }
}

/// Start the engine task.
///
/// Returns the publisher handle to wire into the core services and the
/// engine's task handle. The engine stops when every handle is dropped.
#[must_use]
pub fn spawn_reconciler(
    dispatch: Arc<dyn CommandDispatch>,
    config: &ReconcilerConfig,
) -> (ReconcilerHandle, JoinHandle<()>) {
    let (event_tx, events) = mpsc::channel(config.event_buffer);
    let (completion_tx, completions) = mpsc::unbounded_channel();

    let engine = ReconcilerEngine {
        dispatch,
        cooldown: Duration::from_secs(config.cooldown_secs),
        tick_interval: Duration::from_millis(config.tick_interval_ms),
        alert_after: config.alert_after_attempts,
        events,
        completion_tx,
        completions,
        pending: HashMap::new(),
        revision: 0,
    };

    let handle = tokio::spawn(engine.run());
    (ReconcilerHandle { events: event_tx }, handle)
}

/// Engine state. Owned by exactly one task; never shared.
struct ReconcilerEngine {
    dispatch: Arc<dyn CommandDispatch>,
    cooldown: Duration,
    tick_interval: Duration,
    alert_after: u32,
    events: mpsc::Receiver<PermissionChange>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    pending: HashMap<i64, PendingDoor>,
    revision: u64,
}

impl ReconcilerEngine {
    async fn run(mut self) {
        info!(
            cooldown_secs = self.cooldown.as_secs(),
            alert_after = self.alert_after,
            "Reconciliation engine started"
        );
        let mut tick = interval(self.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = self.events.recv() => {
                    match event {
                        Some(change) => self.on_event(change),
                        // All publishers dropped: the process is shutting
                        // down.
                        None => break,
                    }
                }
                Some(done) = self.completions.recv() => self.on_completion(done),
                _ = tick.tick() => self.on_tick(),
            }
        }

        info!(pending = self.pending.len(), "Reconciliation engine stopped");
    }

    /// Mark every door in the event pending at a fresh revision.
    fn on_event(&mut self, change: PermissionChange) {
        get_metrics().record_reconcile_event();
        self.revision += 1;
        let now = Instant::now();

        for door_id in change.door_ids {
            // An in-flight refresh is never aborted; bumping the revision
            // makes its eventual ack stale, so the door is refreshed again.
            let entry = self.pending.entry(door_id).or_insert(PendingDoor {
                revision: self.revision,
                attempts: 0,
                next_attempt_at: now,
                in_flight: false,
            });
            entry.revision = self.revision;
            entry.attempts = 0;
            entry.next_attempt_at = now;
        }

        debug!(
            revision = self.revision,
            pending = self.pending.len(),
            "Permission change received"
        );
        get_metrics().set_doors_pending(self.pending.len() as u64);
    }

    /// Dispatch a refresh for every due door without one in flight.
    fn on_tick(&mut self) {
        let now = Instant::now();
        for (&door_id, entry) in &mut self.pending {
            if entry.in_flight || entry.next_attempt_at > now {
                continue;
            }
            entry.in_flight = true;

            let dispatch = self.dispatch.clone();
            let completion_tx = self.completion_tx.clone();
            let revision = entry.revision;
            tokio::spawn(async move {
                let outcome = dispatch.refresh_permissions(door_id).await;
                // The send fails only when the engine itself is gone.
                let _ = completion_tx.send(Completion {
                    door_id,
                    revision,
                    outcome,
                });
            });
        }
    }

    fn on_completion(&mut self, done: Completion) {
        let Some(entry) = self.pending.get_mut(&done.door_id) else {
            return;
        };
        entry.in_flight = false;

        match done.outcome {
            Ok(CommandOutcome::Acknowledged) if entry.revision == done.revision => {
                self.pending.remove(&done.door_id);
                get_metrics().record_door_converged();
                info!(door_id = done.door_id, "Door converged");
            }
            Ok(CommandOutcome::Acknowledged) => {
                // Stale ack: a newer revision arrived while the refresh was
                // in flight. Due again immediately.
                entry.next_attempt_at = Instant::now();
                debug!(
                    door_id = done.door_id,
                    "Refresh acknowledged for a superseded revision"
                );
            }
            Ok(CommandOutcome::Failed(reason)) => self.on_failure(done.door_id, &reason),
            Err(e) => self.on_failure(done.door_id, &e.to_string()),
        }

        get_metrics().set_doors_pending(self.pending.len() as u64);
    }

    /// Reschedule a failed door. The pending entry is never dropped on
    /// failure; convergence failure is operational, not fatal.
    fn on_failure(&mut self, door_id: i64, reason: &str) {
        let Some(entry) = self.pending.get_mut(&door_id) else {
            return;
        };
        entry.attempts += 1;
        entry.next_attempt_at = Instant::now() + self.cooldown;

        if entry.attempts == self.alert_after {
            get_metrics().record_reconcile_alert();
            error!(
                door_id,
                attempts = entry.attempts,
                reason,
                "Door is failing to converge"
            );
        } else {
            warn!(
                door_id,
                attempts = entry.attempts,
                cooldown_secs = self.cooldown.as_secs(),
                reason,
                "Refresh failed, door rescheduled"
            );
        }
    }
}
