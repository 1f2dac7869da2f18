//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap external calls with a deadline
//! - Surface elapsed deadlines as a distinct error
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Callers convert `TimeoutError` into their subsystem error

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("operation timed out after {0:?}")]
pub struct TimeoutError(pub Duration);

/// Run `fut` with a deadline.
pub async fn with_timeout<F, T>(duration: Duration, fut: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, fut)
        .await
        .map_err(|_| TimeoutError(duration))
}
