//! Metrics collaborator (§6).
//!
//! The core only ever calls `counter_inc(name)` / `histogram_observe(name,
//! seconds)`, addressed by `snake_case` ASCII string keys. The retry handler
//! (C7) and the event loop's statistics (C6) are the two callers.

/// Named counters and histograms the core reports to.
pub trait MetricsSink: Send + Sync {
    /// Increment a named counter by one.
    fn counter_inc(&self, name: &str);

    /// Record an observation (in seconds) into a named histogram.
    fn histogram_observe(&self, name: &str, seconds: f64);
}

/// Default [`MetricsSink`] backed by the `metrics` facade crate.
///
/// Counters and histograms are registered lazily by name on first use, the
/// way `metrics::counter!`/`metrics::histogram!` behave — no explicit
/// registration step is required before the first observation.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardMetricsSink;

impl MetricsSink for StandardMetricsSink {
    fn counter_inc(&self, name: &str) {
        metrics::counter!(name.to_string()).increment(1);
    }

    fn histogram_observe(&self, name: &str, seconds: f64) {
        metrics::histogram!(name.to_string()).record(seconds);
    }
}

/// A [`MetricsSink`] that discards every observation. Useful for tests and
/// for embedders that have not wired up a metrics backend yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMetricsSink;

impl MetricsSink for NullMetricsSink {
    fn counter_inc(&self, _name: &str) {}
    fn histogram_observe(&self, _name: &str, _seconds: f64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_sink_does_not_panic() {
        let sink = StandardMetricsSink;
        sink.counter_inc("veloz_test_counter");
        sink.histogram_observe("veloz_test_histogram", 0.01);
    }

    #[test]
    fn null_sink_discards() {
        let sink = NullMetricsSink;
        sink.counter_inc("ignored");
        sink.histogram_observe("ignored", 1.0);
    }
}
