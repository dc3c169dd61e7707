//! Retry handler configuration (§4.7).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Tunables for the retry state machine.
///
/// `jitter_factor == 0.0` disables jitter; the delay sequence then equals
/// `initial_delay * backoff_multiplier^attempt`, clamped to `max_delay`,
/// matching the quantified back-off-monotonicity property (§8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first. Must be `>= 1`.
    pub max_attempts: u32,
    /// Delay before the first retry (i.e. `calculate_delay(0)`).
    pub initial_delay: Duration,
    /// Upper bound every computed delay is clamped to.
    pub max_delay: Duration,
    /// Growth factor applied per attempt. Must be `> 1.0`.
    pub backoff_multiplier: f64,
    /// Fractional jitter applied to the computed delay, in `[0, 1]`.
    pub jitter_factor: f64,
    /// Whether a `Network` failure is retried.
    pub retry_on_network_error: bool,
    /// Whether a `Timeout` failure is retried.
    pub retry_on_timeout: bool,
    /// Whether a `RateLimit` failure is retried.
    pub retry_on_rate_limit: bool,
}

impl RetryConfig {
    /// Validate every field, failing on the first violation.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_attempts == 0 {
            return Err(CoreError::Config {
                reason: "max_attempts must be >= 1".to_string(),
            });
        }
        if self.backoff_multiplier <= 1.0 {
            return Err(CoreError::Config {
                reason: "backoff_multiplier must be > 1.0".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(CoreError::Config {
                reason: "jitter_factor must be within [0, 1]".to_string(),
            });
        }
        if self.max_delay < self.initial_delay {
            return Err(CoreError::Config {
                reason: "max_delay must be >= initial_delay".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter_factor: 0.25,
            retry_on_network_error: true,
            retry_on_timeout: true,
            retry_on_rate_limit: true,
        }
    }
}
