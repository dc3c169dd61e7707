//! Retry / back-off handler (§4.7) and its circuit breaker collaborator
//! (§4.7 [SUPPLEMENT] C7a).

mod backoff;
mod circuit_breaker;
mod config;
mod handler;

pub use backoff::compute_delay;
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use config::RetryConfig;
pub use handler::RetryHandler;
