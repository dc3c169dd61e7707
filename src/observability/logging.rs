//! Log collaborator (§6).
//!
//! A single `log(level, message)` sink, used on task exceptions and retry
//! events. Grounded on the teacher's `tracing`-based observability module,
//! narrowed to the one-method contract the core actually needs.

/// Log severity, ordered least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Fine-grained diagnostic detail.
    Trace,
    /// Diagnostic detail useful during development.
    Debug,
    /// Normal operational messages.
    Info,
    /// Recoverable anomalies worth a human's attention.
    Warn,
    /// Failures that a caller should know about.
    Error,
}

/// A single-method log sink the core writes task failures and retry events
/// to.
pub trait LogSink: Send + Sync {
    /// Emit one log line at the given level.
    fn log(&self, level: LogLevel, message: &str);
}

/// Default [`LogSink`] backed by the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Trace => tracing::trace!("{message}"),
            LogLevel::Debug => tracing::debug!("{message}"),
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Warn => tracing::warn!("{message}"),
            LogLevel::Error => tracing::error!("{message}"),
        }
    }
}
