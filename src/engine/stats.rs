//! Event loop statistics (§4.6): monotonic counters plus processing-time
//! and queue-wait sums/maxima.

use std::sync::atomic::{AtomicU64, Ordering};

use super::task::Priority;

const PRIORITY_COUNT: usize = 4;

fn priority_index(priority: Priority) -> usize {
    priority as usize
}

#[derive(Default)]
pub(crate) struct LoopStats {
    total_events: AtomicU64,
    total_delayed_events: AtomicU64,
    events_processed: AtomicU64,
    events_failed: AtomicU64,
    events_filtered: AtomicU64,
    per_priority: [AtomicU64; PRIORITY_COUNT],
    processing_ns_sum: AtomicU64,
    processing_ns_max: AtomicU64,
    queue_wait_ns_sum: AtomicU64,
    queue_wait_ns_max: AtomicU64,
}

fn bump_max(cell: &AtomicU64, value: u64) {
    let mut current = cell.load(Ordering::Relaxed);
    while value > current {
        match cell.compare_exchange_weak(
            current,
            value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(observed) => current = observed,
        }
    }
}

impl LoopStats {
    pub(crate) fn record_posted(&self, priority: Priority) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        self.per_priority[priority_index(priority)].fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delayed_posted(&self) {
        self.total_delayed_events.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_processed(&self, processing_ns: u64, queue_wait_ns: u64) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
        self.processing_ns_sum
            .fetch_add(processing_ns, Ordering::Relaxed);
        bump_max(&self.processing_ns_max, processing_ns);
        self.queue_wait_ns_sum
            .fetch_add(queue_wait_ns, Ordering::Relaxed);
        bump_max(&self.queue_wait_ns_max, queue_wait_ns);
    }

    pub(crate) fn record_failed(&self) {
        self.events_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_filtered(&self) {
        self.events_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> LoopStatsSnapshot {
        LoopStatsSnapshot {
            total_events: self.total_events.load(Ordering::Relaxed),
            total_delayed_events: self.total_delayed_events.load(Ordering::Relaxed),
            events_processed: self.events_processed.load(Ordering::Relaxed),
            events_failed: self.events_failed.load(Ordering::Relaxed),
            events_filtered: self.events_filtered.load(Ordering::Relaxed),
            per_priority: std::array::from_fn(|i| self.per_priority[i].load(Ordering::Relaxed)),
            processing_ns_sum: self.processing_ns_sum.load(Ordering::Relaxed),
            processing_ns_max: self.processing_ns_max.load(Ordering::Relaxed),
            queue_wait_ns_sum: self.queue_wait_ns_sum.load(Ordering::Relaxed),
            queue_wait_ns_max: self.queue_wait_ns_max.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        self.total_events.store(0, Ordering::Relaxed);
        self.total_delayed_events.store(0, Ordering::Relaxed);
        self.events_processed.store(0, Ordering::Relaxed);
        self.events_failed.store(0, Ordering::Relaxed);
        self.events_filtered.store(0, Ordering::Relaxed);
        for counter in &self.per_priority {
            counter.store(0, Ordering::Relaxed);
        }
        self.processing_ns_sum.store(0, Ordering::Relaxed);
        self.processing_ns_max.store(0, Ordering::Relaxed);
        self.queue_wait_ns_sum.store(0, Ordering::Relaxed);
        self.queue_wait_ns_max.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time copy of the loop's counters (§4.6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStatsSnapshot {
    pub total_events: u64,
    pub total_delayed_events: u64,
    pub events_processed: u64,
    pub events_failed: u64,
    pub events_filtered: u64,
    pub per_priority: [u64; PRIORITY_COUNT],
    pub processing_ns_sum: u64,
    pub processing_ns_max: u64,
    pub queue_wait_ns_sum: u64,
    pub queue_wait_ns_max: u64,
}

impl LoopStatsSnapshot {
    pub fn priority_count(&self, priority: Priority) -> u64 {
        self.per_priority[priority_index(priority)]
    }

    /// Human-readable multi-line summary (§4.6's `stats_to_string`).
    pub fn to_display_string(&self) -> String {
        format!(
            "total={} delayed={} processed={} failed={} filtered={} \
             critical={} high={} normal={} low={} \
             processing_ns(sum={} max={}) queue_wait_ns(sum={} max={})",
            self.total_events,
            self.total_delayed_events,
            self.events_processed,
            self.events_failed,
            self.events_filtered,
            self.priority_count(Priority::Critical),
            self.priority_count(Priority::High),
            self.priority_count(Priority::Normal),
            self.priority_count(Priority::Low),
            self.processing_ns_sum,
            self.processing_ns_max,
            self.queue_wait_ns_sum,
            self.queue_wait_ns_max,
        )
    }
}
