//! Core business logic for lockwork.
//!
//! Services own the Entity Store invariants; HTTP handlers and the
//! reconciliation engine talk to them, never to repositories directly.

pub mod services;

pub use services::*;
