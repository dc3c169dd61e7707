//! The event loop (C6): composes the lock-free queue (C3) for immediate
//! tasks, the timer wheel (C5) for delayed ones, a priority container, and
//! the filter/router/statistics machinery around them.

use std::collections::BinaryHeap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use regex::Regex;

use crate::config::PerformanceConfig;
use crate::error::CoreError;
use crate::observability::{Clock, LogLevel, LogSink, MetricsSink, StandardMetricsSink, SystemClock, TracingLogSink};
use crate::sync::LockFreeQueue;
use crate::timer::TimerWheel;

use super::filters::{Filter, Router, TagFilter};
use super::stats::{LoopStats, LoopStatsSnapshot};
use super::task::{HeapEntry, Priority, Task};

struct PendingDelayed {
    delay_ticks: u64,
    priority: Priority,
    tags: Vec<String>,
    callback: Box<dyn FnOnce() + Send>,
}

/// The event loop (§4.6). Generic over the three collaborator traits so a
/// caller can inject test doubles; `EventLoop::with_defaults()` wires up
/// the `tracing` / `metrics` / `Instant`-backed defaults.
pub struct EventLoop<C: Clock = SystemClock, M: MetricsSink = StandardMetricsSink, L: LogSink = TracingLogSink> {
    immediate: LockFreeQueue<Task>,
    delayed_inbox: LockFreeQueue<PendingDelayed>,
    heap: Mutex<BinaryHeap<HeapEntry>>,
    wheel: Mutex<TimerWheel<Task>>,
    filters: RwLock<Vec<Filter>>,
    tag_filters: RwLock<Vec<TagFilter>>,
    router: RwLock<Option<Router>>,
    wake: super::wake::WakeSignal,
    running: AtomicBool,
    stop_requested: AtomicBool,
    next_filter_id: AtomicU64,
    next_task_seq: AtomicU64,
    last_tick_millis: AtomicU64,
    stats: LoopStats,
    batch_size: usize,
    idle_wait_cap: Duration,
    clock: C,
    metrics: M,
    log: L,
}

impl EventLoop<SystemClock, StandardMetricsSink, TracingLogSink> {
    /// Construct a loop with the default collaborator set and the given
    /// performance configuration.
    pub fn with_defaults(performance: &PerformanceConfig) -> Self {
        Self::new(
            SystemClock,
            StandardMetricsSink::default(),
            TracingLogSink,
            performance,
        )
    }
}

impl<C: Clock, M: MetricsSink, L: LogSink> EventLoop<C, M, L> {
    /// Construct a loop with explicit collaborators (§2, §6).
    pub fn new(clock: C, metrics: M, log: L, performance: &PerformanceConfig) -> Self {
        let now = clock.now_millis_tick();
        Self {
            immediate: LockFreeQueue::new(),
            delayed_inbox: LockFreeQueue::new(),
            heap: Mutex::new(BinaryHeap::new()),
            wheel: Mutex::new(TimerWheel::new()),
            filters: RwLock::new(Vec::new()),
            tag_filters: RwLock::new(Vec::new()),
            router: RwLock::new(None),
            wake: super::wake::WakeSignal::new(),
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            next_filter_id: AtomicU64::new(0),
            next_task_seq: AtomicU64::new(0),
            last_tick_millis: AtomicU64::new(now),
            stats: LoopStats::default(),
            batch_size: performance.loop_batch_size,
            idle_wait_cap: Duration::from_millis(performance.idle_wait_cap_ms),
            clock,
            metrics,
            log,
        }
    }

    /// Enqueue `callback` for earliest-possible execution.
    pub fn post(
        &self,
        callback: impl FnOnce() + Send + 'static,
        priority: Priority,
        tags: Vec<String>,
    ) {
        let seq = self.next_task_seq.fetch_add(1, Ordering::Relaxed);
        let now = self.clock.now_nanos();
        let task = Task::new(seq, priority, tags, now, Box::new(callback));
        self.stats.record_posted(priority);
        self.immediate.push(task);
        self.wake.notify();
    }

    /// Schedule `callback` to run after `delay`, via the timer wheel.
    pub fn post_delayed(
        &self,
        callback: impl FnOnce() + Send + 'static,
        delay: Duration,
        priority: Priority,
        tags: Vec<String>,
    ) {
        let delay_ticks = delay.as_millis().max(0) as u64;
        self.stats.record_delayed_posted();
        self.delayed_inbox.push(PendingDelayed {
            delay_ticks,
            priority,
            tags,
            callback: Box::new(callback),
        });
        self.wake.notify();
    }

    /// Register a filter. `priority = None` applies it to every priority.
    pub fn add_filter(
        &self,
        predicate: impl Fn(&[String]) -> bool + Send + Sync + 'static,
        priority: Option<Priority>,
    ) -> u64 {
        let id = self.next_filter_id.fetch_add(1, Ordering::Relaxed);
        self.filters
            .write()
            .push(Filter::new(id, priority, Box::new(predicate)));
        id
    }

    /// Remove a filter by id. Idempotent — a second removal is a no-op.
    pub fn remove_filter(&self, id: u64) {
        self.filters.write().retain(|f| f.id != id);
    }

    /// Remove every registered filter.
    pub fn clear_filters(&self) {
        self.filters.write().clear();
    }

    /// Register a tag-regex filter.
    pub fn add_tag_filter(&self, pattern: &str) -> Result<u64, CoreError> {
        let regex = Regex::new(pattern).map_err(|e| CoreError::Config {
            reason: format!("invalid tag filter regex: {e}"),
        })?;
        let id = self.next_filter_id.fetch_add(1, Ordering::Relaxed);
        self.tag_filters.write().push(TagFilter::new(id, regex));
        Ok(id)
    }

    /// Remove a tag filter by id.
    pub fn remove_tag_filter(&self, id: u64) {
        self.tag_filters.write().retain(|f| f.id != id);
    }

    /// Install a router. Replaces any previously installed router.
    pub fn set_router(&self, router: Router) {
        *self.router.write() = Some(router);
    }

    /// Remove the installed router, if any.
    pub fn clear_router(&self) {
        *self.router.write() = None;
    }

    /// Whether `run()` is currently executing on some thread.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Tasks pending execution (immediate queue plus priority container).
    pub fn pending_tasks(&self) -> usize {
        self.immediate.len() + self.heap.lock().len()
    }

    /// Pending tasks of a specific priority, within the priority container
    /// only (tasks still in the lock-free immediate queue have not yet
    /// been classified into the container).
    pub fn pending_tasks_by_priority(&self, priority: Priority) -> usize {
        self.heap
            .lock()
            .iter()
            .filter(|e| e.task.priority == priority)
            .count()
    }

    /// A snapshot of the loop's monotonic counters.
    pub fn stats(&self) -> LoopStatsSnapshot {
        self.stats.snapshot()
    }

    /// Reset every counter to zero.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Human-readable rendering of [`EventLoop::stats`].
    pub fn stats_to_string(&self) -> String {
        self.stats.snapshot().to_display_string()
    }

    /// Request a cooperative stop. May be called from any thread. The loop
    /// drains its currently runnable batch, then exits `run()`.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.wake.notify();
    }

    /// Take over the calling thread as the loop thread. Runs until `stop()`
    /// is observed (§4.6's loop algorithm).
    pub fn run(&self) {
        self.running.store(true, Ordering::Release);

        loop {
            self.drain_delayed_inbox();

            if self.stop_requested.load(Ordering::Acquire) {
                self.transfer_immediate_to_heap();
                self.process_batch(usize::MAX);
                self.stop_requested.store(false, Ordering::Release);
                break;
            }

            let deadline = self.compute_deadline();
            if self.immediate.is_empty() && self.heap.lock().is_empty() {
                self.wake.wait_timeout(deadline);
            }

            self.advance_wheel();
            self.transfer_immediate_to_heap();
            self.process_batch(self.batch_size);
        }

        self.running.store(false, Ordering::Release);
    }

    fn drain_delayed_inbox(&self) {
        let mut wheel = self.wheel.lock();
        while let Some(pending) = self.delayed_inbox.pop() {
            let seq = self.next_task_seq.fetch_add(1, Ordering::Relaxed);
            // The task's enqueue time is stamped at fire time (below), not
            // at `post_delayed` time — ordering guarantee (iii), §5.
            let task = Task::new(seq, pending.priority, pending.tags, 0, pending.callback);
            let _ = wheel.schedule(pending.delay_ticks, task);
        }
    }

    fn compute_deadline(&self) -> Duration {
        let wheel = self.wheel.lock();
        let current = wheel.current_tick();
        let next = wheel.next_timer_tick();
        drop(wheel);
        match next {
            Some(t) => Duration::from_millis(t.saturating_sub(current)).min(self.idle_wait_cap),
            None => self.idle_wait_cap,
        }
    }

    fn advance_wheel(&self) {
        let now_millis = self.clock.now_millis_tick();
        let last = self.last_tick_millis.swap(now_millis, Ordering::Relaxed);
        let elapsed = now_millis.saturating_sub(last);
        if elapsed == 0 {
            return;
        }

        let fired = self.wheel.lock().advance(elapsed);
        if fired.is_empty() {
            return;
        }
        let mut heap = self.heap.lock();
        let now_nanos = self.clock.now_nanos();
        for timer in fired {
            let mut task = timer.payload;
            task.enqueue_nanos = now_nanos;
            heap.push(HeapEntry { task });
        }
    }

    fn transfer_immediate_to_heap(&self) {
        let mut heap = self.heap.lock();
        while let Some(task) = self.immediate.pop() {
            heap.push(HeapEntry { task });
        }
    }

    fn process_batch(&self, limit: usize) {
        for _ in 0..limit {
            let entry = {
                let mut heap = self.heap.lock();
                heap.pop()
            };
            let Some(HeapEntry { task }) = entry else {
                break;
            };
            self.process_one(task);
        }
    }

    fn process_one(&self, task: Task) {
        let queue_wait_ns = self.clock.now_nanos().saturating_sub(task.enqueue_nanos);

        if self.is_filtered(task.priority, &task.tags) {
            self.stats.record_filtered();
            return;
        }

        let router = self.router.read().as_ref().map(|_| ());
        if router.is_some() {
            let tags = task.tags.clone();
            let callback = task.callback;
            let router_guard = self.router.read();
            if let Some(route) = router_guard.as_ref() {
                route(&tags, callback);
            }
            self.stats.record_processed(0, queue_wait_ns);
            return;
        }

        let start = self.clock.now_nanos();
        let callback = task.callback;
        let result = panic::catch_unwind(AssertUnwindSafe(callback));
        let processing_ns = self.clock.now_nanos().saturating_sub(start);

        match result {
            Ok(()) => self.stats.record_processed(processing_ns, queue_wait_ns),
            Err(_) => {
                self.stats.record_failed();
                self.log.log(LogLevel::Error, "task callback panicked");
            }
        }
    }

    fn is_filtered(&self, priority: Priority, tags: &[String]) -> bool {
        if self
            .filters
            .read()
            .iter()
            .any(|f| f.excludes(priority, tags))
        {
            return true;
        }
        self.tag_filters.read().iter().any(|f| f.excludes(tags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex as StdMutex};
    use std::thread;

    fn loop_with_batch(batch: usize) -> EventLoop {
        let mut perf = PerformanceConfig::default();
        perf.loop_batch_size = batch;
        perf.idle_wait_cap_ms = 5;
        EventLoop::with_defaults(&perf)
    }

    #[test]
    fn priority_ordering_runs_critical_first() {
        let event_loop = Arc::new(loop_with_batch(16));
        let order = Arc::new(StdMutex::new(Vec::new()));

        let push = |label: &'static str, p: Priority| {
            let order = Arc::clone(&order);
            event_loop.post(move || order.lock().unwrap().push(label), p, vec![]);
        };
        push("A", Priority::Low);
        push("B", Priority::Critical);
        push("C", Priority::Normal);
        push("D", Priority::High);

        event_loop.stop();
        event_loop.run();

        assert_eq!(*order.lock().unwrap(), vec!["B", "D", "C", "A"]);
    }

    #[test]
    fn filter_exclusion_counts_events_filtered() {
        let event_loop = loop_with_batch(16);
        event_loop.add_tag_filter("^debug.*$").unwrap();

        let executed = Arc::new(AtomicUsize::new(0));
        let e1 = Arc::clone(&executed);
        event_loop.post(
            move || {
                e1.fetch_add(1, Ordering::SeqCst);
            },
            Priority::Normal,
            vec!["market".into(), "trade".into()],
        );
        let e2 = Arc::clone(&executed);
        event_loop.post(
            move || {
                e2.fetch_add(1, Ordering::SeqCst);
            },
            Priority::Normal,
            vec!["debug".into(), "trace".into()],
        );

        event_loop.stop();
        event_loop.run();

        assert_eq!(executed.load(Ordering::SeqCst), 1);
        assert_eq!(event_loop.stats().events_filtered, 1);
    }

    #[test]
    fn stats_conserve_across_a_full_drain() {
        let event_loop = loop_with_batch(16);
        for _ in 0..5 {
            event_loop.post(|| {}, Priority::Normal, vec![]);
        }
        event_loop.post(
            || panic!("boom"),
            Priority::Normal,
            vec![],
        );

        event_loop.stop();
        event_loop.run();

        let snap = event_loop.stats();
        assert_eq!(snap.events_processed + snap.events_failed + snap.events_filtered, snap.total_events);
    }

    #[test]
    fn run_can_be_stopped_from_another_thread() {
        let event_loop = Arc::new(loop_with_batch(16));
        let runner = Arc::clone(&event_loop);
        let handle = thread::spawn(move || runner.run());

        thread::sleep(Duration::from_millis(10));
        assert!(event_loop.is_running());
        event_loop.stop();
        handle.join().unwrap();
        assert!(!event_loop.is_running());
    }

    #[test]
    fn delayed_task_fires_after_its_timer_elapses() {
        let event_loop = Arc::new(loop_with_batch(16));
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        event_loop.post_delayed(
            move || {
                fired_clone.fetch_add(1, Ordering::SeqCst);
            },
            Duration::from_millis(5),
            Priority::Normal,
            vec![],
        );

        let runner = Arc::clone(&event_loop);
        let handle = thread::spawn(move || runner.run());
        thread::sleep(Duration::from_millis(100));
        event_loop.stop();
        handle.join().unwrap();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
