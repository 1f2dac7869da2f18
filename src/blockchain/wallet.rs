//! Wallet management and transaction signing.
//!
//! # Security
//! - Private keys are loaded ONLY from the environment (`PRIVATE_KEY`)
//! - Keys are never logged or serialized; only the address is

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::secrets::{Secrets, PRIVATE_KEY_ENV_VAR};

/// Local signing account.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
    /// Chain ID for EIP-155 replay protection.
    chain_id: u64,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    /// * `chain_id` - Chain ID for transaction signing
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> BlockchainResult<Self> {
        let trimmed = private_key_hex.trim();
        let key_hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;
        let signer = signer.with_chain_id(Some(chain_id));

        tracing::info!(
            address = %signer.address(),
            chain_id = chain_id,
            "Wallet initialized"
        );

        Ok(Self { signer, chain_id })
    }

    /// Load the wallet from the `PRIVATE_KEY` secret.
    pub fn from_secrets(secrets: &Secrets, chain_id: u64) -> BlockchainResult<Self> {
        let key = secrets.private_key.as_deref().ok_or_else(|| {
            BlockchainError::Wallet(format!("Environment variable {} not set", PRIVATE_KEY_ENV_VAR))
        })?;
        Self::from_private_key(key, chain_id)
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Network wallet used by the transaction builder to sign envelopes.
    pub fn ethereum_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }

    /// Sign arbitrary message bytes (with Ethereum prefix).
    pub async fn sign_message(&self, message: &[u8]) -> BlockchainResult<alloy::signers::Signature> {
        self.signer
            .sign_message(message)
            .await
            .map_err(|e| BlockchainError::Wallet(format!("Message signing failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known test private key (Anvil's first account)
    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[test]
    fn test_wallet_from_private_key() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, 314159).unwrap();
        assert_eq!(wallet.address().to_string().to_lowercase(), TEST_ADDRESS);
        assert_eq!(wallet.chain_id(), 314159);
    }

    #[test]
    fn test_wallet_with_0x_prefix_and_whitespace() {
        let wallet = Wallet::from_private_key(&format!(" 0x{}\n", TEST_PRIVATE_KEY), 314159).unwrap();
        assert_eq!(wallet.address().to_string().to_lowercase(), TEST_ADDRESS);
    }

    #[test]
    fn test_from_secrets_requires_key() {
        let err = Wallet::from_secrets(&Secrets::default(), 314159).unwrap_err();
        assert!(err.to_string().contains("PRIVATE_KEY"));
    }

    #[test]
    fn test_invalid_private_key() {
        let result = Wallet::from_private_key("invalid_key", 1);
        assert!(result.unwrap_err().to_string().contains("Invalid private key"));
    }

    #[tokio::test]
    async fn test_sign_message() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, 314159).unwrap();
        let signature = wallet.sign_message(b"repo-guardian").await.unwrap();
        assert_eq!(signature.as_bytes().len(), 65);
    }
}
