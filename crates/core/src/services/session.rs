//! Session service.
//!
//! Issues and validates the bearer tokens the console carries. Sessions are
//! process-local: a restart revokes everything, which is acceptable for an
//! on-premise deployment with one server.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use lockwork_common::{AppError, AppResult, IdGenerator, config::AuthConfig, get_metrics};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use validator::Validate;

/// Login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(length(min = 1, max = 128))]
    pub username: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// An authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

/// Session service: credential check plus the in-memory token store.
#[derive(Clone)]
pub struct SessionService {
    auth: AuthConfig,
    ttl: Duration,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    id_gen: IdGenerator,
}

impl SessionService {
    /// Starts with an empty session table.
    #[must_use]
    pub fn new(auth: AuthConfig) -> Self {
        // Cap at ten years; chrono durations overflow far below u64::MAX.
        let secs = i64::try_from(auth.token_ttl_secs)
            .unwrap_or(i64::MAX)
            .clamp(0, 315_360_000);
        let ttl = Duration::seconds(secs);
        Self {
            auth,
            ttl,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            id_gen: IdGenerator::new(),
        }
    }

    /// Authenticate and issue a token.
    pub async fn login(&self, input: LoginInput) -> AppResult<String> {
        input.validate()?;

        if !self.check_credentials(&input.username, &input.password)? {
            get_metrics().record_auth_failure();
            tracing::warn!(username = %input.username, "Login rejected");
            return Err(AppError::Unauthorized);
        }

        Ok(self.issue(&input.username).await)
    }

    /// Resolve a bearer token to its session.
    ///
    /// Expired tokens are removed on sight.
    pub async fn validate(&self, token: &str) -> AppResult<Session> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(token) {
            Some(session) if session.expires_at > Utc::now() => Ok(session.clone()),
            Some(_) => {
                sessions.remove(token);
                Err(AppError::Unauthorized)
            }
            None => Err(AppError::Unauthorized),
        }
    }

    /// Issue a replacement token and revoke the presented one.
    pub async fn refresh(&self, token: &str) -> AppResult<String> {
        let session = self.validate(token).await?;
        self.sessions.write().await.remove(token);
        Ok(self.issue(&session.username).await)
    }

    /// Revoke a token.
    pub async fn logout(&self, token: &str) -> AppResult<()> {
        self.sessions.write().await.remove(token);
        Ok(())
    }

    fn check_credentials(&self, username: &str, password: &str) -> AppResult<bool> {
        // Demo bypass, rejected by config validation outside development.
        if self.auth.demo_login && username == "admin" && password == "admin123" {
            return Ok(true);
        }

        if username == self.auth.admin_username
            && let Some(ref hash) = self.auth.admin_password_hash
        {
            return verify_password(password, hash);
        }

        Ok(false)
    }

    async fn issue(&self, username: &str) -> String {
        let token = self.id_gen.generate_token();
        let session = Session {
            token: token.clone(),
            username: username.to_string(),
            expires_at: Utc::now() + self.ttl,
        };
        self.sessions.write().await.insert(token.clone(), session);
        get_metrics().record_session_issued();
        tracing::info!(username = %username, "Session issued");
        token
    }
}

/// Hash a password using Argon2.
///
/// Used to produce the `auth.admin_password_hash` config value.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
