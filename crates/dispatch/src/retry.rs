//! Retry budget and exponential backoff for controller commands.

use std::time::Duration;

use lockwork_common::config::DeviceConfig;

/// Per-command retry configuration.
///
/// The budget counts attempts, not retries: `max_attempts = 3` means one
/// initial try plus two retries.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts per command, including the first.
    pub max_attempts: u32,
    /// Delay between the first and second attempt.
    pub initial_delay: Duration,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&DeviceConfig::default())
    }
}

impl From<&DeviceConfig> for RetryConfig {
    fn from(config: &DeviceConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_delay: Duration::from_secs(config.retry_initial_delay_secs),
            max_delay: Duration::from_secs(config.retry_max_delay_secs),
            multiplier: config.retry_multiplier,
        }
    }
}

impl RetryConfig {
    /// Calculate the backoff after a given zero-based attempt number.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        #[allow(clippy::cast_possible_wrap)]
        let delay = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let delay = Duration::from_secs_f64(delay);
        delay.min(self.max_delay)
    }

    /// Check whether another attempt fits the budget after `attempts` tries.
    #[must_use]
    pub const fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}
