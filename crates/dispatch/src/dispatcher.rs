//! Per-door command dispatch.
//!
//! Each door gets its own worker task, created lazily on first use and kept
//! for the process lifetime. A worker drains its inbox strictly FIFO, so
//! commands to one door never interleave; different doors run on independent
//! tasks and never wait on each other.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use lockwork_common::{AppError, AppResult, get_metrics};
use lockwork_core::PermissionService;
use lockwork_db::entities::door::DoorStatus;
use lockwork_db::repositories::DoorRepository;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::command::{CommandKind, CommandOutcome, CommandPayload};
use crate::retry::RetryConfig;
use crate::transport::CommandTransportService;

/// Inbox depth per door worker. Commands are rare; a full inbox applies
/// backpressure to submitters instead of growing without bound.
const WORKER_INBOX: usize = 32;

/// Read side for allow-list computation.
///
/// The dispatcher reads through this at send time, not enqueue time, so a
/// queued `refreshPermission` always ships the latest snapshot.
#[async_trait]
pub trait AllowlistSource: Send + Sync {
    /// Active key UIDs permitted at the door.
    async fn allowlist_for_door(&self, door_id: i64) -> AppResult<Vec<String>>;
}

#[async_trait]
impl AllowlistSource for PermissionService {
    async fn allowlist_for_door(&self, door_id: i64) -> AppResult<Vec<String>> {
        self.list_keys_for_door(door_id).await
    }
}

/// Shared allow-list read handle.
pub type AllowlistSourceService = Arc<dyn AllowlistSource>;

struct WorkItem {
    kind: CommandKind,
    reply: oneshot::Sender<CommandOutcome>,
}

/// Serialized command dispatch, one worker task per door.
#[derive(Clone)]
pub struct DoorCommandDispatcher {
    transport: CommandTransportService,
    allowlist: AllowlistSourceService,
    door_repo: DoorRepository,
    retry: RetryConfig,
    workers: Arc<Mutex<HashMap<i64, mpsc::Sender<WorkItem>>>>,
}

impl DoorCommandDispatcher {
    /// Create a dispatcher. No worker is spawned until a door sees its
    /// first command.
    #[must_use]
    pub fn new(
        transport: CommandTransportService,
        allowlist: AllowlistSourceService,
        door_repo: DoorRepository,
        retry: RetryConfig,
    ) -> Self {
        Self {
            transport,
            allowlist,
            door_repo,
            retry,
            workers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Engage the lock at `door_id` and wait for the terminal outcome.
    pub async fn lock(&self, door_id: i64) -> AppResult<CommandOutcome> {
        self.submit(door_id, CommandKind::Lock).await
    }

    /// Release the lock at `door_id` and wait for the terminal outcome.
    pub async fn unlock(&self, door_id: i64) -> AppResult<CommandOutcome> {
        self.submit(door_id, CommandKind::Unlock).await
    }

    /// Push the current allow-list to the controller at `door_id`.
    pub async fn refresh_permissions(&self, door_id: i64) -> AppResult<CommandOutcome> {
        self.submit(door_id, CommandKind::RefreshPermission).await
    }

    async fn submit(&self, door_id: i64, kind: CommandKind) -> AppResult<CommandOutcome> {
        let sender = self.worker_for(door_id).await;
        let (reply_tx, reply_rx) = oneshot::channel();

        sender
            .send(WorkItem {
                kind,
                reply: reply_tx,
            })
            .await
            .map_err(|_| AppError::Internal(format!("door {door_id} worker unavailable")))?;

        reply_rx
            .await
            .map_err(|_| AppError::Internal(format!("door {door_id} worker dropped a command")))
    }

    async fn worker_for(&self, door_id: i64) -> mpsc::Sender<WorkItem> {
        let mut workers = self.workers.lock().await;
        if let Some(sender) = workers.get(&door_id) {
            return sender.clone();
        }

        let (tx, rx) = mpsc::channel(WORKER_INBOX);
        let worker = DoorWorker {
            door_id,
            transport: self.transport.clone(),
            allowlist: self.allowlist.clone(),
            door_repo: self.door_repo.clone(),
            retry: self.retry.clone(),
        };
        tokio::spawn(worker.run(rx));
        debug!(door_id, "Spawned door worker");

        workers.insert(door_id, tx.clone());
        tx
    }
}

/// State for a single door's worker. The task exits when the dispatcher is
/// dropped and the inbox closes.
struct DoorWorker {
    door_id: i64,
    transport: CommandTransportService,
    allowlist: AllowlistSourceService,
    door_repo: DoorRepository,
    retry: RetryConfig,
}

impl DoorWorker {
    async fn run(self, mut inbox: mpsc::Receiver<WorkItem>) {
        while let Some(item) = inbox.recv().await {
            let outcome = self.execute(item.kind).await;
            get_metrics().record_command_outcome(outcome.is_acknowledged());

            if item.reply.send(outcome).is_err() {
                debug!(door_id = self.door_id, "Command submitter went away");
            }
        }
    }

    /// Run one command to its terminal outcome.
    async fn execute(&self, kind: CommandKind) -> CommandOutcome {
        let door = match self.door_repo.find_by_id(self.door_id).await {
            Ok(Some(door)) => door,
            Ok(None) => {
                warn!(door_id = self.door_id, %kind, "Dropping command for unknown door");
                return CommandOutcome::Failed(format!("door {} not found", self.door_id));
            }
            Err(e) => {
                warn!(door_id = self.door_id, %kind, error = %e, "Failed to load door");
                return CommandOutcome::Failed(e.to_string());
            }
        };

        let payload = match kind {
            CommandKind::Lock => CommandPayload::lock(),
            CommandKind::Unlock => CommandPayload::unlock(),
            CommandKind::RefreshPermission => {
                match self.allowlist.allowlist_for_door(self.door_id).await {
                    Ok(keys) => CommandPayload::refresh_permission(keys),
                    Err(e) => {
                        warn!(door_id = self.door_id, error = %e, "Failed to compute allow-list");
                        return CommandOutcome::Failed(e.to_string());
                    }
                }
            }
        };

        let outcome = self
            .send_with_retries(&door.device_address, &payload)
            .await;
        if outcome.is_acknowledged() {
            self.record_contact(kind).await;
        }
        outcome
    }

    async fn send_with_retries(
        &self,
        device_address: &str,
        payload: &CommandPayload,
    ) -> CommandOutcome {
        let mut attempts = 0;
        loop {
            get_metrics().record_command_sent();
            match self.transport.send(device_address, payload).await {
                Ok(()) => {
                    info!(
                        door_id = self.door_id,
                        kind = %payload.kind,
                        attempts = attempts + 1,
                        "Command acknowledged"
                    );
                    return CommandOutcome::Acknowledged;
                }
                Err(e) => {
                    attempts += 1;
                    if self.retry.should_retry(attempts) {
                        let delay = self.retry.delay_for_attempt(attempts - 1);
                        warn!(
                            door_id = self.door_id,
                            kind = %payload.kind,
                            attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Command attempt failed, backing off"
                        );
                        get_metrics().record_command_retry();
                        tokio::time::sleep(delay).await;
                    } else {
                        warn!(
                            door_id = self.door_id,
                            kind = %payload.kind,
                            attempts,
                            error = %e,
                            "Command failed, attempt budget exhausted"
                        );
                        return CommandOutcome::Failed(e.to_string());
                    }
                }
            }
        }
    }

    /// Update the door row after an acknowledged command: `lock`/`unlock`
    /// set the advisory status, `refreshPermission` bumps `last_seen_at`
    /// only. A write failure here does not demote the outcome; the
    /// controller already acted.
    async fn record_contact(&self, kind: CommandKind) {
        let status = match kind {
            CommandKind::Lock => Some(DoorStatus::Locked),
            CommandKind::Unlock => Some(DoorStatus::Unlocked),
            CommandKind::RefreshPermission => None,
        };
        if let Err(e) = self.door_repo.mark_contact(self.door_id, status).await {
            warn!(door_id = self.door_id, error = %e, "Failed to record controller contact");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::transport::{CommandTransport, TransportError};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::time::Instant;

    fn create_test_door(id: i64, device_address: &str) -> lockwork_db::entities::door::Model {
        lockwork_db::entities::door::Model {
            id,
            name: format!("Door {id}"),
            location: "Test Wing".to_string(),
            device_address: device_address.to_string(),
            status: DoorStatus::Unknown,
            last_seen_at: None,
            created_at: Utc::now().into(),
        }
    }

    /// Transport scripted with per-call results; records every send.
    struct ScriptedTransport {
        script: StdMutex<VecDeque<Result<(), TransportError>>>,
        sends: StdMutex<Vec<(String, CommandKind, Option<serde_json::Value>)>>,
        delay: Duration,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<(), TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                script: StdMutex::new(script.into()),
                sends: StdMutex::new(Vec::new()),
                delay: Duration::ZERO,
            })
        }

        fn with_delay(script: Vec<Result<(), TransportError>>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                script: StdMutex::new(script.into()),
                sends: StdMutex::new(Vec::new()),
                delay,
            })
        }

        fn sends(&self) -> Vec<(String, CommandKind, Option<serde_json::Value>)> {
            self.sends.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandTransport for ScriptedTransport {
        async fn send(
            &self,
            device_address: &str,
            command: &CommandPayload,
        ) -> Result<(), TransportError> {
            self.sends.lock().unwrap().push((
                device_address.to_string(),
                command.kind,
                command.body(),
            ));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()))
        }
    }

    /// Allow-list source returning a fixed list.
    struct FixedAllowlist(Vec<String>);

    #[async_trait]
    impl AllowlistSource for FixedAllowlist {
        async fn allowlist_for_door(&self, _door_id: i64) -> AppResult<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    fn dispatcher_with(
        transport: Arc<ScriptedTransport>,
        allowlist: Vec<String>,
        door_repo: DoorRepository,
    ) -> DoorCommandDispatcher {
        DoorCommandDispatcher::new(
            transport,
            Arc::new(FixedAllowlist(allowlist)),
            door_repo,
            RetryConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_on_one_door_run_fifo() {
        let door = create_test_door(1, "10.0.0.1");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[door.clone()], [door]])
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                ])
                .into_connection(),
        );

        let transport =
            ScriptedTransport::with_delay(vec![Ok(()), Ok(())], Duration::from_millis(100));
        let dispatcher = dispatcher_with(transport.clone(), vec![], DoorRepository::new(db));

        let (lock, unlock) = tokio::join!(dispatcher.lock(1), dispatcher.unlock(1));
        assert_eq!(lock.unwrap(), CommandOutcome::Acknowledged);
        assert_eq!(unlock.unwrap(), CommandOutcome::Acknowledged);

        let sends = transport.sends();
        assert_eq!(sends.len(), 2);
        assert_eq!(sends[0].1, CommandKind::Lock);
        assert_eq!(sends[1].1, CommandKind::Unlock);
    }

    #[tokio::test]
    async fn test_repeated_lock_sends_identical_state_set() {
        // `lock` is an absolute state-set, not a toggle: replaying it puts
        // the same request on the wire and lands in the same terminal state.
        let door = create_test_door(1, "10.0.0.1");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[door.clone()], [door]])
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                ])
                .into_connection(),
        );

        let transport = ScriptedTransport::new(vec![Ok(()), Ok(())]);
        let dispatcher = dispatcher_with(transport.clone(), vec![], DoorRepository::new(db));

        let first = dispatcher.lock(1).await.unwrap();
        let second = dispatcher.lock(1).await.unwrap();
        assert_eq!(first, CommandOutcome::Acknowledged);
        assert_eq!(second, CommandOutcome::Acknowledged);

        let sends = transport.sends();
        assert_eq!(sends.len(), 2);
        assert_eq!(sends[0], sends[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_doors_dispatch_independently() {
        let door_one = create_test_door(1, "10.0.0.1");
        let door_two = create_test_door(2, "10.0.0.2");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[door_one], [door_two]])
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                ])
                .into_connection(),
        );

        // Every send stalls 2s. If the doors shared a worker the second
        // command would finish at ~4s; independent workers finish both at
        // ~2s.
        let transport =
            ScriptedTransport::with_delay(vec![Ok(()), Ok(())], Duration::from_secs(2));
        let dispatcher = dispatcher_with(transport.clone(), vec![], DoorRepository::new(db));

        let started = Instant::now();
        let first = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.lock(1).await })
        };
        // Door 1's worker must load its row before door 2 is submitted, so
        // the mock's query results line up with the workers.
        for _ in 0..100 {
            if !transport.sends().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(transport.sends().len(), 1);

        let second = dispatcher.lock(2).await.unwrap();
        assert_eq!(second, CommandOutcome::Acknowledged);
        assert!(started.elapsed() < Duration::from_secs(3));

        let first = first.await.unwrap().unwrap();
        assert_eq!(first, CommandOutcome::Acknowledged);
        assert!(started.elapsed() < Duration::from_secs(3));

        let sends = transport.sends();
        assert_eq!(sends[0].0, "10.0.0.1");
        assert_eq!(sends[1].0, "10.0.0.2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_success_within_budget() {
        let door = create_test_door(3, "10.0.0.3");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[door]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Timeout),
            Err(TransportError::Connect("no route".into())),
            Ok(()),
        ]);
        let dispatcher = dispatcher_with(transport.clone(), vec![], DoorRepository::new(db));

        let started = Instant::now();
        let outcome = dispatcher.lock(3).await.unwrap();

        assert_eq!(outcome, CommandOutcome::Acknowledged);
        assert_eq!(transport.sends().len(), 3);
        // Backoff between attempts: 2s then 4s.
        assert!(started.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhausted_reports_failed() {
        let door = create_test_door(4, "10.0.0.4");
        // No exec results: a failed command must not touch the door row.
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[door]])
                .into_connection(),
        );

        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Status(500)),
            Err(TransportError::Status(500)),
            Err(TransportError::Status(500)),
        ]);
        let dispatcher = dispatcher_with(transport.clone(), vec![], DoorRepository::new(db));

        let outcome = dispatcher.lock(4).await.unwrap();

        match outcome {
            CommandOutcome::Failed(reason) => assert!(reason.contains("500")),
            CommandOutcome::Acknowledged => panic!("expected failure"),
        }
        assert_eq!(transport.sends().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_ships_current_allowlist() {
        let door = create_test_door(5, "10.0.0.5");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[door]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let transport = ScriptedTransport::new(vec![Ok(())]);
        let dispatcher = dispatcher_with(
            transport.clone(),
            vec!["A1B2C3D4".to_string(), "E5F6A7B8".to_string()],
            DoorRepository::new(db),
        );

        let outcome = dispatcher.refresh_permissions(5).await.unwrap();
        assert_eq!(outcome, CommandOutcome::Acknowledged);

        let sends = transport.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].0, "10.0.0.5");
        assert_eq!(sends[0].1, CommandKind::RefreshPermission);
        assert_eq!(
            sends[0].2,
            Some(serde_json::json!({ "keys": ["A1B2C3D4", "E5F6A7B8"] }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_door_fails_without_transport_attempt() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<lockwork_db::entities::door::Model>::new()])
                .into_connection(),
        );

        let transport = ScriptedTransport::new(vec![]);
        let dispatcher = dispatcher_with(transport.clone(), vec![], DoorRepository::new(db));

        let outcome = dispatcher.lock(7).await.unwrap();

        assert_eq!(
            outcome,
            CommandOutcome::Failed("door 7 not found".to_string())
        );
        assert!(transport.sends().is_empty());
    }
}
