//! Tower-layer middleware: bearer auth and request metrics.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use lockwork_common::{Timer, get_metrics};
use lockwork_core::{DoorService, KeyService, PermissionService, SessionService, UserService};
use lockwork_dispatch::DoorCommandDispatcher;

/// Everything the handlers need, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub door_service: DoorService,
    pub key_service: KeyService,
    pub user_service: UserService,
    pub permission_service: PermissionService,
    pub session_service: SessionService,
    pub dispatcher: DoorCommandDispatcher,
}

/// Bearer-token middleware.
///
/// Resolves a bearer token to its session and stores the session in the
/// request extensions; handlers that require auth pull it back out through
/// [`AuthSession`](crate::extractors::AuthSession). Requests without a
/// valid token pass through untouched and fail at the extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && let Ok(session) = state.session_service.validate(token).await
    {
        req.extensions_mut().insert(session);
    }

    next.run(req).await
}

/// Request metrics middleware: counts requests and records latency by
/// status class.
pub async fn track_metrics(req: Request<Body>, next: Next) -> Response {
    let metrics = get_metrics();
    metrics.start_request();
    let timer = Timer::start();

    let response = next.run(req).await;

    metrics.record_http_request(response.status().as_u16(), timer.elapsed());
    metrics.end_request();
    response
}
