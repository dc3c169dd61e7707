//! Retry state machine (§4.7).

use std::future::Future;

use crate::error::{Classify, FailureKind, RetryError};
use crate::observability::{MetricsSink, StandardMetricsSink};

use super::backoff::compute_delay;
use super::config::RetryConfig;

/// Drives an operation through the retry state machine described in §4.7:
/// invoke, classify on failure, decide whether to retry, compute the
/// back-off delay (honouring an explicit rate-limit `retry_after`), sleep,
/// repeat, until the operation succeeds or the attempt budget is spent.
pub struct RetryHandler<M: MetricsSink = StandardMetricsSink> {
    config: RetryConfig,
    metrics: M,
    should_retry_unclassified: Option<Box<dyn Fn(&FailureKind) -> bool + Send + Sync>>,
}

impl RetryHandler<StandardMetricsSink> {
    /// Build a handler reporting through the default metrics sink.
    pub fn new(config: RetryConfig) -> Self {
        Self::with_metrics(config, StandardMetricsSink)
    }
}

impl<M: MetricsSink> RetryHandler<M> {
    /// Build a handler reporting through the given metrics collaborator.
    pub fn with_metrics(config: RetryConfig, metrics: M) -> Self {
        Self {
            config,
            metrics,
            should_retry_unclassified: None,
        }
    }

    /// Install a predicate that may classify an otherwise-unclassified
    /// failure as retryable (§4.7, §9).
    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&FailureKind) -> bool + Send + Sync + 'static,
    {
        self.should_retry_unclassified = Some(Box::new(predicate));
        self
    }

    fn is_retryable(&self, kind: &FailureKind) -> bool {
        match kind {
            FailureKind::Network { .. } => self.config.retry_on_network_error,
            FailureKind::Timeout => self.config.retry_on_timeout,
            FailureKind::RateLimit { .. } => self.config.retry_on_rate_limit,
            FailureKind::CircuitBreaker | FailureKind::RetryExhausted { .. } => false,
            FailureKind::Unclassified => self
                .should_retry_unclassified
                .as_ref()
                .map(|predicate| predicate(kind))
                .unwrap_or(false),
            FailureKind::Parse | FailureKind::Validation | FailureKind::Resource | FailureKind::Protocol { .. } => {
                false
            }
        }
    }

    /// Run `operation_name` via `f`, retrying per the configured policy.
    ///
    /// `operation_name` feeds the per-operation metric names
    /// (`api_success_<op>`, `api_retry_<op>`, `api_failure_<op>`).
    pub async fn call<F, Fut, T, E>(&self, operation_name: &str, mut f: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + std::fmt::Display,
    {
        self.metrics.counter_inc("api_requests_total");
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match f().await {
                Ok(value) => {
                    self.metrics
                        .counter_inc(&format!("api_success_{operation_name}"));
                    return Ok(value);
                }
                Err(err) => {
                    let kind = err.classify();
                    self.metrics.counter_inc("api_errors_total");
                    self.metrics
                        .counter_inc(&format!("api_error_{}", kind.metric_name()));

                    let zero_based = attempt - 1;
                    let retryable = self.is_retryable(&kind);
                    let budget_left = zero_based < self.config.max_attempts - 1;

                    if !retryable || !budget_left {
                        self.metrics
                            .counter_inc(&format!("api_failure_{operation_name}"));
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            cause: err.to_string(),
                        });
                    }

                    let delay = match &kind {
                        FailureKind::RateLimit {
                            retry_after: Some(explicit),
                        } => *explicit,
                        _ => compute_delay(zero_based, &self.config),
                    };

                    self.metrics.counter_inc("api_retries_total");
                    self.metrics
                        .counter_inc(&format!("api_retry_{}", kind.metric_name()));
                    self.metrics
                        .counter_inc(&format!("api_retry_{operation_name}"));

                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::observability::NullMetricsSink;

    #[derive(Debug)]
    struct FakeNetworkError;

    impl std::fmt::Display for FakeNetworkError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "connection reset")
        }
    }

    impl Classify for FakeNetworkError {
        fn classify(&self) -> FailureKind {
            FailureKind::Network { code: None }
        }
    }

    #[derive(Debug)]
    struct FakeRateLimitError(Duration);

    impl std::fmt::Display for FakeRateLimitError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "rate limited")
        }
    }

    impl Classify for FakeRateLimitError {
        fn classify(&self) -> FailureKind {
            FailureKind::RateLimit {
                retry_after: Some(self.0),
            }
        }
    }

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(50),
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
            retry_on_network_error: true,
            retry_on_timeout: true,
            retry_on_rate_limit: true,
        }
    }

    #[tokio::test]
    async fn succeeds_without_retrying_on_first_try() {
        let handler = RetryHandler::with_metrics(fast_config(3), NullMetricsSink);
        let calls = AtomicU32::new(0);
        let result = handler
            .call("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, FakeNetworkError>(42)
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn network_failure_three_times_then_success_reports_four_attempts() {
        let handler = RetryHandler::with_metrics(fast_config(4), NullMetricsSink);
        let calls = AtomicU32::new(0);
        let result = handler
            .call("op", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 4 {
                    Err(FakeNetworkError)
                } else {
                    Ok(())
                }
            })
            .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn exhaustion_carries_attempt_count_and_cause() {
        let handler = RetryHandler::with_metrics(fast_config(2), NullMetricsSink);
        let result = handler
            .call("op", || async { Err::<(), _>(FakeNetworkError) })
            .await;
        match result {
            Err(RetryError::Exhausted { attempts, cause }) => {
                assert_eq!(attempts, 2);
                assert!(cause.contains("connection reset"));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limit_retry_after_overrides_the_backoff_formula() {
        let handler = RetryHandler::with_metrics(fast_config(3), NullMetricsSink);
        let calls = AtomicU32::new(0);
        let start = std::time::Instant::now();
        let result = handler
            .call("op", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(FakeRateLimitError(Duration::from_millis(50)))
                } else {
                    Ok(())
                }
            })
            .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn unclassified_failure_is_not_retried_without_a_predicate() {
        #[derive(Debug)]
        struct Weird;
        impl std::fmt::Display for Weird {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "weird")
            }
        }
        impl Classify for Weird {
            fn classify(&self) -> FailureKind {
                FailureKind::Unclassified
            }
        }

        let handler = RetryHandler::with_metrics(fast_config(5), NullMetricsSink);
        let calls = AtomicU32::new(0);
        let result = handler
            .call("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Weird)
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn predicate_can_rescue_an_unclassified_failure() {
        #[derive(Debug)]
        struct Weird;
        impl std::fmt::Display for Weird {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "weird")
            }
        }
        impl Classify for Weird {
            fn classify(&self) -> FailureKind {
                FailureKind::Unclassified
            }
        }

        let handler = RetryHandler::with_metrics(fast_config(2), NullMetricsSink)
            .with_predicate(|kind| matches!(kind, FailureKind::Unclassified));
        let calls = AtomicU32::new(0);
        let result = handler
            .call("op", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 2 {
                    Err(Weird)
                } else {
                    Ok(())
                }
            })
            .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
