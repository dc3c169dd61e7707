//! Per-subsystem error types.
//!
//! Mirrors the shape of the teacher crate's error sources module: one
//! `thiserror` enum per subsystem, aggregated by [`super::CoreError`].

use thiserror::Error;

/// Lock-free queue (C3) / node pool (C2) errors.
#[derive(Error, Debug)]
pub enum QueueError {
    /// The node pool could not grow to satisfy an `allocate()` call.
    #[error("node pool exhausted after {total_allocations} total allocations")]
    NodePoolExhausted {
        /// Total allocations ever made by the pool before exhaustion.
        total_allocations: u64,
    },
}

/// Arena / fixed-block pool (C4) errors.
#[derive(Error, Debug)]
pub enum PoolError {
    /// `FixedSizeMemoryPool::create` hit its configured `max_blocks` cap.
    #[error("pool exhausted: {in_use}/{max_blocks} blocks in use")]
    Exhausted {
        /// Blocks currently checked out.
        in_use: usize,
        /// Configured cap.
        max_blocks: usize,
    },

    /// The arena's backing allocator returned an error.
    #[error("arena allocation failed: {0}")]
    ArenaAllocationFailed(String),
}

/// Timer wheel (C5) errors.
#[derive(Error, Debug)]
pub enum WheelError {
    /// Scheduling failed due to allocator exhaustion.
    #[error("timer wheel resource exhausted")]
    ResourceExhausted,
}

/// Event loop (C6) errors.
#[derive(Error, Debug)]
pub enum LoopError {
    /// A filter or router was registered with an id that is already in use
    /// (should not happen given monotonic id allocation; reserved for
    /// caller-supplied id schemes).
    #[error("duplicate registration id: {0}")]
    DuplicateRegistration(u64),

    /// The loop was asked to perform an operation that requires it to be
    /// running (or stopped) and it was in the other state.
    #[error("event loop is not in the required lifecycle state: {0}")]
    InvalidLifecycleState(&'static str),
}

/// Retry handler (C7) errors.
#[derive(Error, Debug)]
pub enum RetryError {
    /// The attempt budget was exhausted without a successful call.
    #[error("retry exhausted after {attempts} attempts, last error: {cause}")]
    Exhausted {
        /// Total attempts made, including the first.
        attempts: u32,
        /// `Display` of the last classified failure.
        cause: String,
    },

    /// The failure was classified as non-retryable (or a predicate refused
    /// it) before the attempt budget was reached.
    #[error("permanent failure, not retried: {0}")]
    Permanent(String),

    /// A circuit breaker guarding the operation was open.
    #[error("circuit breaker is open")]
    CircuitOpen,
}

/// Circuit breaker (C7a) errors.
#[derive(Error, Debug)]
pub enum CircuitBreakerError {
    /// The breaker rejected the call without attempting the operation.
    #[error("circuit breaker is open")]
    Open,

    /// The operation ran and failed; the breaker recorded the failure.
    #[error("{0}")]
    Failure(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_exhausted_display() {
        let err = PoolError::Exhausted {
            in_use: 10,
            max_blocks: 10,
        };
        assert_eq!(err.to_string(), "pool exhausted: 10/10 blocks in use");
    }

    #[test]
    fn wheel_resource_exhausted_display() {
        assert_eq!(
            WheelError::ResourceExhausted.to_string(),
            "timer wheel resource exhausted"
        );
    }
}
