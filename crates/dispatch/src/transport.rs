//! Controller transport.
//!
//! One trait, one production implementation. The transport does a single
//! request per call and reports what happened; retries, backoff, and
//! ordering all live in the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lockwork_common::config::DeviceConfig;
use reqwest::Client;

use crate::command::CommandPayload;

/// Errors a single controller request can produce.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The controller could not be reached at all.
    #[error("connect failed: {0}")]
    Connect(String),

    /// The controller answered with a non-success status.
    #[error("controller returned status {0}")]
    Status(u16),

    /// The exchange completed but the response was not usable.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Sends one command to one controller.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Issue `command` to the controller at `device_address`.
    ///
    /// A return of `Ok(())` means the controller acknowledged with a
    /// success status. Exactly one request is made per call.
    async fn send(
        &self,
        device_address: &str,
        command: &CommandPayload,
    ) -> Result<(), TransportError>;
}

/// Shared transport handle.
pub type CommandTransportService = Arc<dyn CommandTransport>;

/// HTTP transport speaking the controller protocol:
/// `POST http://{device_address}/{cmd}`.
#[derive(Clone)]
pub struct HttpCommandTransport {
    client: Client,
}

impl HttpCommandTransport {
    /// Create a transport with the given per-request timeout.
    ///
    /// # Panics
    /// Panics if the HTTP client fails to build.
    #[must_use]
    #[allow(clippy::expect_used)] // Client build only fails with incompatible TLS settings
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Create a transport from the device section of the configuration.
    #[must_use]
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self::new(Duration::from_secs(config.command_timeout_secs))
    }
}

#[async_trait]
impl CommandTransport for HttpCommandTransport {
    async fn send(
        &self,
        device_address: &str,
        command: &CommandPayload,
    ) -> Result<(), TransportError> {
        let url = format!("http://{device_address}/{}", command.kind.as_str());

        let mut request = self.client.post(&url);
        if let Some(body) = command.body() {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else if e.is_builder() || e.is_body() || e.is_decode() {
                TransportError::Malformed(e.to_string())
            } else {
                TransportError::Connect(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(url = %url, "Controller acknowledged command");
            Ok(())
        } else {
            Err(TransportError::Status(status.as_u16()))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(TransportError::Timeout.to_string(), "request timed out");
        assert_eq!(
            TransportError::Status(502).to_string(),
            "controller returned status 502"
        );
        assert_eq!(
            TransportError::Connect("no route to host".into()).to_string(),
            "connect failed: no route to host"
        );
    }

    #[test]
    fn test_from_config_uses_command_timeout() {
        let config = DeviceConfig::default();
        // Builds without panicking; the timeout itself is not observable
        // through reqwest's public API.
        let _transport = HttpCommandTransport::from_config(&config);
    }
}
