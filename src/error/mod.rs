//! Crate-wide error handling.
//!
//! Every subsystem (lock-free queue, node pool, timer wheel, event loop,
//! allocator, retry handler) raises its own `thiserror`-derived error type;
//! [`CoreError`] aggregates them behind `#[from]` so callers crossing
//! subsystem boundaries can propagate with `?`.
//!
//! [`FailureKind`] is the abstract classification from the retry handler's
//! taxonomy (network / timeout / rate-limit / parse / validation / resource /
//! protocol / circuit-breaker / retry-exhausted / unclassified). It is
//! produced by a [`Classify`] implementation supplied by the caller's
//! operation error type, not derived from [`CoreError`] itself — the retry
//! handler is generic over the caller's error type.

use thiserror::Error;

pub mod sources;

pub use sources::{CircuitBreakerError, LoopError, PoolError, QueueError, RetryError, WheelError};

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Aggregate error type for the VeloZ concurrency substrate.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Lock-free queue error (allocation exhaustion under the node pool).
    #[error("queue error")]
    Queue(#[from] QueueError),

    /// Fixed-block pool or arena error.
    #[error("pool error")]
    Pool(#[from] PoolError),

    /// Timer wheel error.
    #[error("timer wheel error")]
    Wheel(#[from] WheelError),

    /// Event loop error.
    #[error("event loop error")]
    Loop(#[from] LoopError),

    /// Retry handler error.
    #[error("retry error")]
    Retry(#[from] RetryError),

    /// Configuration failed validation.
    #[error("invalid configuration: {reason}")]
    Config {
        /// Reason the configuration was rejected.
        reason: String,
    },

    /// Local resource exhaustion (allocator, pool) surfaced to a caller.
    ///
    /// Per the propagation policy, this is fatal to the caller of the
    /// specific operation but never crashes the process.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
}

/// Abstract failure classification used by the retry handler (§7).
///
/// This is not an error type in its own right — it is the *kind* an
/// operation's error is classified into before the retry state machine
/// decides whether to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport-level fault; carries an OS-level code.
    Network {
        /// OS-level error code, when known.
        code: Option<i32>,
    },
    /// Operation exceeded its budget.
    Timeout,
    /// Upstream throttled the caller; may carry an explicit retry-after.
    RateLimit {
        /// Server-specified delay to honor before the next attempt.
        retry_after: Option<std::time::Duration>,
    },
    /// Malformed input.
    Parse,
    /// Unacceptable, but well-formed, input.
    Validation,
    /// Local resource exhaustion (allocator, file, pool).
    Resource,
    /// Semantic protocol violation; carries a protocol version.
    Protocol {
        /// Protocol version in effect when the violation occurred.
        version: Option<String>,
    },
    /// A circuit breaker has tripped. Never retried.
    CircuitBreaker,
    /// Terminal: the retry handler exhausted its attempt budget.
    RetryExhausted {
        /// Number of attempts made before giving up.
        attempts: u32,
    },
    /// Anything that doesn't fit the above.
    Unclassified,
}

impl FailureKind {
    /// Whether this kind is retried by default, absent an overriding
    /// `should_retry` predicate or an explicit `retry_on_*` toggle set to
    /// `false` in the retry configuration.
    pub fn retries_by_default(&self) -> bool {
        match self {
            FailureKind::Network { .. } => true,
            FailureKind::Timeout => true,
            FailureKind::RateLimit { .. } => true,
            FailureKind::CircuitBreaker => false,
            FailureKind::RetryExhausted { .. } => false,
            FailureKind::Parse
            | FailureKind::Validation
            | FailureKind::Resource
            | FailureKind::Protocol { .. }
            | FailureKind::Unclassified => false,
        }
    }

    /// Short, stable, `snake_case` name used to build metric counter names
    /// (`api_error_<kind>`, `api_retry_<kind>`).
    pub fn metric_name(&self) -> &'static str {
        match self {
            FailureKind::Network { .. } => "network",
            FailureKind::Timeout => "timeout",
            FailureKind::RateLimit { .. } => "rate_limit",
            FailureKind::Parse => "parse",
            FailureKind::Validation => "validation",
            FailureKind::Resource => "resource",
            FailureKind::Protocol { .. } => "protocol",
            FailureKind::CircuitBreaker => "circuit_breaker",
            FailureKind::RetryExhausted { .. } => "retry_exhausted",
            FailureKind::Unclassified => "unclassified",
        }
    }
}

/// Implemented by a caller's operation error type so the retry handler can
/// classify failures without knowing the concrete error type.
pub trait Classify {
    /// Classify `self` into an abstract [`FailureKind`].
    fn classify(&self) -> FailureKind;
}
