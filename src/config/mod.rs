//! Configuration management.
//!
//! Provides configuration loading, validation, and environment-based
//! overrides for the core. Configuration is injected at construction; the
//! core never reaches for environment or disk state on its own (§6).

use crate::error::CoreError;
use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, CoreError>;

/// Configuration loader.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file (TOML-shaped).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<CoreConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::Config {
            reason: format!("failed to read config file: {e}"),
        })?;
        Self::load_from_str(&content)
    }

    /// Load configuration from a string.
    ///
    /// TOML parsing is not wired up (no format was specified for the
    /// embedding host); this returns defaults after validating them, the
    /// same placeholder the teacher's loader uses until a concrete format
    /// is chosen by the embedding application.
    pub fn load_from_str(_content: &str) -> ConfigResult<CoreConfig> {
        let config = CoreConfig::default();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables, overriding defaults.
    pub fn load_from_env() -> ConfigResult<CoreConfig> {
        let mut config = CoreConfig::default();

        if let Ok(val) = std::env::var("VELOZ_LOG_LEVEL") {
            config.logging.level = val;
        }
        if let Ok(val) = std::env::var("VELOZ_SERVICE_NAME") {
            config.service.name = val;
        }
        if let Ok(val) = std::env::var("VELOZ_HOT_PATH_TICKS") {
            if let Ok(ticks) = val.parse() {
                config.performance.hot_path_ticks = ticks;
            }
        }

        config.validate()?;
        Ok(config)
    }
}

/// Top-level core configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Service identity, used in log/metric/trace tagging.
    pub service: ServiceConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Performance / sizing knobs for the event loop and allocators.
    pub performance: PerformanceConfig,
    /// Default retry configuration handed to new retry handlers.
    pub retry: RetryConfig,
}

impl CoreConfig {
    /// Validate every sub-configuration, failing on the first violation.
    pub fn validate(&self) -> ConfigResult<()> {
        self.service.validate()?;
        self.logging.validate()?;
        self.performance.validate()?;
        self.retry.validate()?;
        Ok(())
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            logging: LoggingConfig::default(),
            performance: PerformanceConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Service identity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name.
    pub name: String,
    /// Service version.
    pub version: String,
    /// Deployment environment (e.g. "development", "production").
    pub environment: String,
}

impl ServiceConfig {
    /// Validate service configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.is_empty() {
            return Err(CoreError::Config {
                reason: "service name cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "veloz-core".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Enable structured (key=value) logging.
    pub structured: bool,
    /// Enable JSON output instead of human-readable text.
    pub json: bool,
}

impl LoggingConfig {
    /// Validate logging configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.as_str()) {
            return Err(CoreError::Config {
                reason: format!("invalid log level: {}", self.level),
            });
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            structured: true,
            json: false,
        }
    }
}

/// Performance / sizing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Hot-path tick budget; informational, surfaced through stats.
    pub hot_path_ticks: u32,
    /// Initial arena chunk size in bytes.
    pub arena_chunk_bytes: usize,
    /// Default block count per fixed-size pool slab.
    pub pool_slab_blocks: usize,
    /// Bounded batch size the loop pulls per iteration.
    pub loop_batch_size: usize,
    /// Idle wait cap in milliseconds when no timer is pending.
    pub idle_wait_cap_ms: u64,
}

impl PerformanceConfig {
    /// Validate performance configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.loop_batch_size == 0 {
            return Err(CoreError::Config {
                reason: "loop_batch_size must be > 0".to_string(),
            });
        }
        if self.pool_slab_blocks == 0 {
            return Err(CoreError::Config {
                reason: "pool_slab_blocks must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            hot_path_ticks: 8,
            arena_chunk_bytes: 4 * 1024,
            pool_slab_blocks: 64,
            loop_batch_size: 256,
            idle_wait_cap_ms: 50,
        }
    }
}
