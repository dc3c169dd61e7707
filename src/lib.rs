//! Concurrency and scheduling substrate for the VeloZ low-latency trading
//! framework.
//!
//! Tasks flow from many producers through a lock-free MPMC queue (§4.3)
//! into a priority- and tag-aware event loop (§4.6); delayed tasks travel
//! through a hierarchical timer wheel (§4.5); the queue's nodes and the
//! loop's scratch allocations are served by an arena and fixed-block pool
//! layer (§4.4); a retry/back-off handler with an optional circuit breaker
//! (§4.7) sits on top for operations that call out to unreliable services.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod alloc;
pub mod config;
pub mod engine;
pub mod error;
pub mod observability;
pub mod retry;
pub mod sync;
pub mod timer;

pub use alloc::{Arena, FixedSizeMemoryPool, PoolHandle, SyncArena};
pub use config::{ConfigLoader, CoreConfig, LoggingConfig, PerformanceConfig, ServiceConfig};
pub use engine::{EventLoop, LoopStatsSnapshot, Priority, Router};
pub use error::{Classify, CoreError, CoreResult, FailureKind};
pub use observability::{
    Clock, LogLevel, LogSink, MetricsSink, NullMetricsSink, StandardMetricsSink, SystemClock,
    TracingLogSink,
};
pub use retry::{compute_delay, CircuitBreaker, CircuitState, RetryConfig, RetryHandler};
pub use sync::LockFreeQueue;
pub use timer::{FiredTimer, TimerId, TimerWheel};
