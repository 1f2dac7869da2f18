//! repo-guardian library
//!
//! Registers GitHub repositories on Filecoin Calibration, keeps license and
//! evidence documents on IPFS and files DMCA reports against copies.

pub mod agent;
pub mod analysis;
pub mod blockchain;
pub mod config;
pub mod github;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod storage;

pub use agent::ProtectionAgent;
pub use config::schema::AgentConfig;
pub use lifecycle::Shutdown;
