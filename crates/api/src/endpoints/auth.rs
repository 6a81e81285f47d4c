//! Login, logout and session introspection.
//!
//! Sessions are process-local bearer tokens; the console stores the
//! `accessToken` and sends it on every request.

use axum::{Json, Router, extract::State, routing::post};
use lockwork_common::AppResult;
use lockwork_core::LoginInput;
use serde::Serialize;
use serde_json::{Value, json};

use crate::{extractors::AuthSession, middleware::AppState};

/// Token response, shaped for the console (`{accessToken}`).
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
}

/// Authenticate and issue a session token.
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginInput>,
) -> AppResult<Json<TokenResponse>> {
    let token = state.session_service.login(req).await?;
    Ok(Json(TokenResponse {
        access_token: token,
    }))
}

/// Issue a replacement token and revoke the presented one.
async fn refresh(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> AppResult<Json<TokenResponse>> {
    let token = state.session_service.refresh(&session.token).await?;
    Ok(Json(TokenResponse {
        access_token: token,
    }))
}

/// Revoke the presented token.
async fn logout(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> AppResult<Json<Value>> {
    state.session_service.logout(&session.token).await?;
    Ok(Json(json!({ "message": "Logged out" })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
}
