//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! External call (RPC, IPFS, GitHub, LLM):
//!     → timeouts.rs (enforce a deadline)
//!     → On failure: retries.rs (classify the error, pick a delay)
//!     → backoff.rs (exponential delay with jitter)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Nonce conflicts are classified separately from other failures
//! - Retry decisions are pure functions so the submitter stays testable

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use backoff::calculate_backoff;
pub use retries::{is_nonce_error, RetryPolicy};
pub use timeouts::{with_timeout, TimeoutError};
