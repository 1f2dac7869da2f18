//! Chain-specific types and error definitions.

use alloy::primitives::{Address, Bytes, TxHash};
use alloy::rpc::types::Log;
use serde::Serialize;
use thiserror::Error;

pub use crate::config::schema::{BlockchainConfig, SubmissionConfig};

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out on every provider.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// No receipt appeared before the confirmation deadline.
    #[error("Transaction {tx_hash} not confirmed within {timeout_secs} seconds")]
    ConfirmationTimeout { tx_hash: TxHash, timeout_secs: u64 },

    /// Transaction was mined with status 0.
    #[error("Transaction {tx_hash} reverted")]
    Reverted { tx_hash: TxHash },

    /// Invalid private key format or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Gas price exceeded maximum allowed.
    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// Nonce management error.
    #[error("Nonce error: {0}")]
    Nonce(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// Blockchain client not initialized or no signing key.
    #[error("Blockchain not available: {0}")]
    NotAvailable(String),

    /// Contract call data could not be encoded or decoded.
    #[error("ABI error: {0}")]
    Abi(String),

    /// Every submission attempt failed.
    #[error("Transaction failed after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Submission kinds understood by `processSubmission`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum SubmissionType {
    Register = 0,
    ReportViolation = 1,
    UpdateLicense = 2,
}

impl SubmissionType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A state-changing contract call ready for submission.
#[derive(Debug, Clone)]
pub struct ContractCall {
    /// Human readable operation name, used in logs.
    pub label: &'static str,
    pub to: Address,
    pub data: Bytes,
    /// Gas added on top of the node's estimate.
    pub gas_buffer: u64,
}

/// Result of a confirmed transaction.
#[derive(Debug, Clone, Serialize)]
pub struct TxOutcome {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// Number of attempts it took, starting at 1.
    pub attempts: u32,
    #[serde(skip)]
    pub logs: Vec<Log>,
}
