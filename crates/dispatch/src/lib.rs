//! Device command dispatch and reconciliation for lockwork.
//!
//! This crate owns everything that talks to lock controllers:
//!
//! - **Commands**: the `lock` / `unlock` / `refreshPermission` vocabulary
//! - **Transport**: one HTTP request per command, timeout and status mapping
//! - **Dispatcher**: per-door worker tasks, FIFO ordering, bounded retries
//! - **Retry**: exponential backoff within a per-command attempt budget
//! - **Reconciler**: converges controllers to the permission table

pub mod command;
pub mod dispatcher;
pub mod reconciler;
pub mod retry;
pub mod transport;

pub use command::{CommandKind, CommandOutcome, CommandPayload};
pub use dispatcher::{AllowlistSource, AllowlistSourceService, DoorCommandDispatcher};
pub use reconciler::{CommandDispatch, ReconcilerHandle, spawn_reconciler};
pub use retry::RetryConfig;
pub use transport::{
    CommandTransport, CommandTransportService, HttpCommandTransport, TransportError,
};
