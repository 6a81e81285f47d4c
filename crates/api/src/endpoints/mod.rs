//! Route table and handler modules.

mod auth;
mod device;
mod doors;
mod keys;
mod ops;
mod permissions;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router, mounted under `/api`.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/doors", doors::router())
        .nest("/keys", keys::router())
        .nest("/users", users::router())
        .nest("/permissions", permissions::router())
        .nest("/device", device::router())
}

/// Create the root-level operational router (`/health`, `/metrics`).
pub fn ops_router() -> Router<AppState> {
    ops::router()
}
