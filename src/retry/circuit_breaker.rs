//! Circuit breaker collaborator (§4.7 [SUPPLEMENT] C7a).
//!
//! Guards an operation the same way a [`super::RetryHandler`] guards one,
//! but trips on sustained failure instead of on a single one: `Closed` ->
//! `Open` -> `HalfOpen` -> `Closed`. When open, `call` rejects before the
//! operation is even attempted; the rejection classifies as a
//! `circuit-breaker` failure, which the retry handler never retries.

use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::CircuitBreakerError;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    /// Normal operation; calls pass through.
    Closed = 0,
    /// Failing; calls are rejected until the timeout elapses.
    Open = 1,
    /// Probing whether the guarded operation has recovered.
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Closed,
            1 => Self::Open,
            2 => Self::HalfOpen,
            _ => Self::Closed,
        }
    }
}

/// A circuit breaker guarding a single logical operation.
pub struct CircuitBreaker {
    state: AtomicU8,
    failure_count: AtomicU32,
    success_count: AtomicU32,
    threshold: u32,
    half_open_max_calls: u32,
    timeout: Duration,
    last_failure_time: Mutex<Option<Instant>>,
}

impl CircuitBreaker {
    /// Create a breaker that opens after `threshold` consecutive failures
    /// and waits `timeout` before probing again.
    pub fn new(threshold: u32, timeout: Duration) -> Self {
        Self {
            state: AtomicU8::new(CircuitState::Closed as u8),
            failure_count: AtomicU32::new(0),
            success_count: AtomicU32::new(0),
            threshold,
            half_open_max_calls: 3,
            timeout,
            last_failure_time: Mutex::new(None),
        }
    }

    /// Current state.
    pub fn state(&self) -> CircuitState {
        self.state.load(Ordering::Acquire).into()
    }

    /// Consecutive failures recorded while closed.
    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::Acquire)
    }

    /// Run `f` through the breaker, recording the outcome.
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, CircuitBreakerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        match self.state() {
            CircuitState::Open => {
                let should_probe = {
                    let last_failure = self.last_failure_time.lock();
                    match *last_failure {
                        Some(at) => at.elapsed() >= self.timeout,
                        None => true,
                    }
                };

                if should_probe {
                    self.state
                        .store(CircuitState::HalfOpen as u8, Ordering::Release);
                    self.success_count.store(0, Ordering::Release);
                } else {
                    return Err(CircuitBreakerError::Open);
                }
            }
            CircuitState::HalfOpen => {
                if self.success_count.load(Ordering::Acquire) >= self.half_open_max_calls {
                    return Err(CircuitBreakerError::Open);
                }
            }
            CircuitState::Closed => {}
        }

        match f().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                self.on_failure();
                Err(CircuitBreakerError::Failure(Box::new(err)))
            }
        }
    }

    fn on_success(&self) {
        match self.state() {
            CircuitState::HalfOpen => {
                let successes = self.success_count.fetch_add(1, Ordering::AcqRel) + 1;
                if successes >= self.half_open_max_calls {
                    self.reset();
                }
            }
            CircuitState::Closed => {
                self.failure_count.store(0, Ordering::Release);
            }
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self) {
        let failures = self.failure_count.fetch_add(1, Ordering::AcqRel) + 1;

        match self.state() {
            CircuitState::Closed => {
                if failures >= self.threshold {
                    self.trip();
                }
            }
            CircuitState::HalfOpen => self.trip(),
            CircuitState::Open => {}
        }
    }

    fn trip(&self) {
        self.state.store(CircuitState::Open as u8, Ordering::Release);
        *self.last_failure_time.lock() = Some(Instant::now());
    }

    fn reset(&self) {
        self.state
            .store(CircuitState::Closed as u8, Ordering::Release);
        self.failure_count.store(0, Ordering::Release);
        self.success_count.store(0, Ordering::Release);
        *self.last_failure_time.lock() = None;
    }
}
