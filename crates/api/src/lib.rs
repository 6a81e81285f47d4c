//! HTTP API layer for lockwork.
//!
//! This crate provides the console-facing REST API:
//!
//! - **Endpoints**: doors, keys, users, permissions, device commands, auth
//! - **Extractors**: session authentication
//! - **Middleware**: bearer-token validation, request metrics
//!
//! Handlers are Axum 0.8 functions; auth and metrics sit in Tower layers
//! above them.

pub mod endpoints;
pub mod extractors;
pub mod middleware;

pub use endpoints::{ops_router, router};
pub use middleware::AppState;
