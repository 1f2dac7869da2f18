//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → schema.rs (environment overrides)
//!     → validation.rs (semantic checks)
//!     → AgentConfig (validated, immutable)
//!
//! environment / .env
//!     → secrets.rs (credentials, never in the config file)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Secrets never pass through serde

pub mod loader;
pub mod schema;
pub mod secrets;
pub mod validation;

pub use loader::{load_config, resolve_config, ConfigError};
pub use schema::{
    AgentConfig, BlockchainConfig, ContractAddresses, GitHubConfig, LlmConfig,
    ObservabilityConfig, ScanConfig, StorageConfig, SubmissionConfig,
};
pub use secrets::Secrets;
pub use validation::{validate_config, ValidationError};
