//! Back-off delay computation (§4.7).

use std::time::Duration;

use rand::Rng;

use super::config::RetryConfig;

/// Delay before the `(attempt + 1)`-th attempt, given `attempt` prior
/// failures (zero-based). `base = initial_delay * multiplier^attempt`,
/// clamped to `max_delay`; jitter, when `jitter_factor > 0`, is drawn
/// uniformly from `[base * (1 - j), base * (1 + j)]`.
pub fn compute_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let base_secs = config.initial_delay.as_secs_f64()
        * config.backoff_multiplier.powi(attempt as i32);
    let capped_secs = base_secs.min(config.max_delay.as_secs_f64());

    if config.jitter_factor <= 0.0 {
        return Duration::from_secs_f64(capped_secs);
    }

    let j = config.jitter_factor;
    let low = (capped_secs * (1.0 - j)).max(0.0);
    let high = (capped_secs * (1.0 + j)).max(low);
    let jittered = if high > low {
        rand::thread_rng().gen_range(low..=high)
    } else {
        low
    };
    Duration::from_secs_f64(jittered)
}
