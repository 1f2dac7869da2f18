//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → stderr (fmt layer)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Log level from config, `RUST_LOG` wins when set
//! - Metrics are cheap (atomic increments); without an installed
//!   recorder they are no-ops
//! - Secrets never appear in log fields

pub mod logging;
pub mod metrics;
