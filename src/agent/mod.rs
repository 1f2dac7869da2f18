//! Protection agent subsystem.
//!
//! # Data Flow
//! ```text
//! CLI command
//!     → orchestrator.rs (register / compare / scan / audit / bounty / workflow)
//!         → analysis (GitHub + model)
//!         → storage (license, DMCA notice, audit report)
//!         → blockchain (registry, link registry, bounty contract)
//!     → cache.rs (registered repositories, optional JSON file)
//!     → bounty.rs (per-reporter claim history)
//!
//! validator.rs runs standalone pre-flight checks.
//! ```

pub mod bounty;
pub mod cache;
pub mod orchestrator;
pub mod types;
pub mod validator;

pub use bounty::{bounty_amount, BountyClaim, BountyLedger, LeaderboardEntry};
pub use cache::{CachedRepository, RepositoryCache};
pub use orchestrator::ProtectionAgent;
pub use types::{AgentError, AgentResult};
pub use validator::{CheckStatus, SetupValidator, ValidationReport};
