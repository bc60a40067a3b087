//! Exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

/// Calculate exponential backoff delay with jitter.
///
/// `attempt` is 1-based: the delay before the second attempt uses
/// `attempt = 1` and equals `base_ms`, doubling from there up to `max_ms`.
/// Jitter adds between 0 and `jitter_ratio` of the capped delay on top.
pub fn calculate_backoff(
    attempt: u32,
    base_ms: u64,
    max_ms: u64,
    jitter_ratio: f64,
) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    with_jitter(Duration::from_millis(capped_delay), jitter_ratio)
}

/// Add up to `ratio * delay` of random jitter.
pub fn with_jitter(delay: Duration, ratio: f64) -> Duration {
    let jitter_range = delay.as_secs_f64() * ratio.clamp(0.0, 1.0);
    let jitter = if jitter_range > 0.0 {
        rand::thread_rng().gen_range(0.0..jitter_range)
    } else {
        0.0
    };

    let jitter = Duration::try_from_secs_f64(jitter).unwrap_or(Duration::ZERO);
    delay.saturating_add(jitter)
}
