//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment (PRIVATE_KEY) + config (RPC URLs, contracts)
//!     → wallet.rs (key loading, signing)
//!     → client.rs (RPC connection with timeouts and failover)
//!     → nonce.rs (best-effort nonce cache)
//!     → transaction.rs (build, sign, broadcast, confirm, retry)
//!     → contracts.rs (protection contract calls and reads)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - Graceful degradation when blockchain unreachable

pub mod client;
pub mod contracts;
pub mod fingerprint;
pub mod network;
pub mod nonce;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use contracts::{ProtectionContracts, RepositoryRegistration};
pub use nonce::NonceManager;
pub use transaction::TxSubmitter;
pub use types::{
    BlockchainError, BlockchainResult, ChainId, ContractCall, SubmissionType,
    TxOutcome,
};
pub use wallet::Wallet;
