//! Retry logic.
//!
//! # Responsibilities
//! - Classify RPC failures (nonce conflict vs. anything else)
//! - Compute the delay before the next attempt
//!
//! # Design Decisions
//! - Fixed delay by default; exponential with jitter when configured
//! - Classification works on the error text because node implementations
//!   disagree on error codes

use std::time::Duration;

use crate::config::SubmissionConfig;
use crate::resilience::backoff::calculate_backoff;

/// Messages that mean the nonce we used is stale or already taken.
const NONCE_ERROR_NEEDLES: &[&str] = &[
    "nonce too low",
    "nonce too high",
    "invalid nonce",
    "already known",
    "replacement transaction underpriced",
    "nonce",
];

/// True when an RPC error message indicates a nonce conflict.
pub fn is_nonce_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    NONCE_ERROR_NEEDLES.iter().any(|needle| lower.contains(needle))
}

/// How many times to try, and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(8000),
            exponential: false,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &SubmissionConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
            exponential: config.exponential_backoff,
        }
    }

    /// Delay before retrying after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if !self.exponential {
            return self.base_delay;
        }
        calculate_backoff(
            attempt.max(1),
            self.base_delay.as_millis() as u64,
            self.max_delay.as_millis() as u64,
        )
    }

    /// Whether `attempt` (0-based) is the final one.
    pub fn is_last(&self, attempt: u32) -> bool {
        attempt + 1 >= self.max_attempts
    }
}
