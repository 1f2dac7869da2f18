//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every subscriber's recv() resolves
//!
//! Signals (signals.rs):
//!     SIGINT (Ctrl-C) → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - One-shot commands run to completion; only the interactive loop
//!   listens for shutdown
//! - Ctrl-C cancels the running interactive command as well as the prompt.
//!   A transaction already broadcast stays with the node

pub mod shutdown;
pub mod signals;

pub use shutdown::{until_shutdown, Shutdown};
pub use signals::spawn_ctrl_c_handler;
