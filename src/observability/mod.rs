//! Observability collaborators.
//!
//! The core accepts a [`MetricsSink`], a [`LogSink`], and a [`Clock`] as
//! injected collaborators (§6) rather than reaching for process-wide
//! singletons (§9, "Global state"). Each trait has a default implementation
//! backed by the crate the teacher uses for the same concern: `metrics` for
//! counters/histograms, `tracing` for the log sink, `std::time::Instant` for
//! the monotonic clock.

pub mod clock;
pub mod logging;
pub mod metrics;

pub use clock::{Clock, SystemClock};
pub use logging::{LogLevel, LogSink, TracingLogSink};
pub use metrics::{MetricsSink, NullMetricsSink, StandardMetricsSink};
