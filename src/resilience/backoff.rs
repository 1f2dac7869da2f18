//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Calculate exponential backoff delay with jitter.
///
/// Attempt 0 has no delay; attempt `n` waits `base_ms * 2^(n-1)`, capped at
/// `max_ms`, plus up to 10% jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let capped_delay = base_ms.saturating_mul(exponential_base).min(max_ms);

    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
