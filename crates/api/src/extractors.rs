//! Axum extractors shared by the endpoint modules.

use axum::{extract::FromRequestParts, http::request::Parts};
use lockwork_common::{AppError, get_metrics};
use lockwork_core::Session;

/// Authenticated session extractor.
///
/// Rejects with 401 when the auth middleware found no valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by the auth middleware when the token checks out.
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(AuthSession)
            .ok_or_else(|| {
                get_metrics().record_auth_failure();
                AppError::Unauthorized
            })
    }
}
