//! Shared foundation for the lockwork workspace.
//!
//! Everything that more than one crate needs lives here: the [`Config`]
//! tree loaded from files and environment, the [`AppError`] type every
//! fallible path returns, the [`IdGenerator`] behind session tokens, and
//! the [`Metrics`] counters the ops endpoints expose.
//!
//! ```no_run
//! use lockwork_common::{AppResult, Config, IdGenerator};
//!
//! fn boot() -> AppResult<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!     let tokens = IdGenerator::new();
//!     println!("session token: {}", tokens.generate_token());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod metrics;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use metrics::{Metrics, MetricsSnapshot, Timer, get_metrics};
