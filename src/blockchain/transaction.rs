//! Transaction building, signing, submission and confirmation monitoring.
//!
//! # Responsibilities
//! - Build legacy transactions with node gas estimation plus a buffer
//! - Sign locally and broadcast the raw envelope
//! - Poll for the receipt, then count confirmations when more than one is required
//! - Retry on nonce conflicts, sequentially, never in parallel
//!
//! # Design Decisions
//! - A receipt with status 0 is final; the call is not retried
//! - A confirmation timeout is returned with the hash and not retried, so a
//!   transaction still in the mempool is never sent twice
//! - The nonce cache is dropped on any nonce-related node error

use alloy::eips::eip2718::Encodable2718;
use alloy::network::TransactionBuilder;
use alloy::primitives::TxHash;
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use std::time::Duration;
use tokio::time::{interval, sleep, timeout};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::nonce::NonceManager;
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ContractCall, SubmissionConfig, TxOutcome,
};
use crate::blockchain::wallet::Wallet;
use crate::observability::metrics;
use crate::resilience::{is_nonce_error, RetryPolicy};

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Sequential transaction submitter.
pub struct TxSubmitter {
    client: BlockchainClient,
    wallet: Wallet,
    nonce: NonceManager,
    config: SubmissionConfig,
    policy: RetryPolicy,
}

impl TxSubmitter {
    pub fn new(client: BlockchainClient, wallet: Wallet, config: SubmissionConfig) -> Self {
        let nonce = NonceManager::new(Duration::from_secs(config.nonce_ttl_secs));
        let policy = RetryPolicy::from_config(&config);
        Self {
            client,
            wallet,
            nonce,
            config,
            policy,
        }
    }

    pub fn client(&self) -> &BlockchainClient {
        &self.client
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn nonce_manager(&self) -> &NonceManager {
        &self.nonce
    }

    /// Submit a contract call, retrying per the submission policy.
    pub async fn submit(&self, call: ContractCall) -> BlockchainResult<TxOutcome> {
        let mut last_error = String::new();

        for attempt in 0..self.policy.max_attempts {
            let force_refresh = attempt > 0;

            match self.try_once(&call, force_refresh, attempt + 1).await {
                Ok(outcome) => {
                    metrics::record_tx_attempt("confirmed");
                    tracing::info!(
                        label = call.label,
                        tx_hash = %outcome.tx_hash,
                        block_number = ?outcome.block_number,
                        gas_used = outcome.gas_used,
                        attempts = outcome.attempts,
                        "Transaction confirmed"
                    );
                    return Ok(outcome);
                }
                Err(e @ BlockchainError::Reverted { .. }) => {
                    metrics::record_tx_attempt("reverted");
                    tracing::error!(label = call.label, error = %e, "Transaction reverted");
                    return Err(e);
                }
                Err(e @ BlockchainError::ConfirmationTimeout { .. }) => {
                    metrics::record_tx_attempt("unconfirmed");
                    tracing::error!(label = call.label, error = %e, "Transaction still pending");
                    return Err(e);
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::warn!(
                        label = call.label,
                        attempt = attempt + 1,
                        max_attempts = self.policy.max_attempts,
                        error = %message,
                        "Transaction attempt failed"
                    );

                    if is_nonce_error(&message) {
                        metrics::record_tx_attempt("nonce_conflict");
                        self.nonce.invalidate().await;
                        last_error = message;
                        sleep(Duration::from_millis(self.config.nonce_retry_delay_ms)).await;
                        continue;
                    }

                    metrics::record_tx_attempt("error");
                    if self.policy.is_last(attempt) {
                        return Err(e);
                    }
                    last_error = message;
                    sleep(self.policy.delay_for(attempt + 1)).await;
                }
            }
        }

        Err(BlockchainError::MaxRetriesExceeded {
            attempts: self.policy.max_attempts,
            last_error,
        })
    }

    async fn try_once(
        &self,
        call: &ContractCall,
        force_refresh: bool,
        attempt: u32,
    ) -> BlockchainResult<TxOutcome> {
        let tx = self.build(call, force_refresh).await?;

        let envelope = tx
            .build(&self.wallet.ethereum_wallet())
            .await
            .map_err(|e| BlockchainError::Wallet(format!("Signing failed: {}", e)))?;
        let raw = envelope.encoded_2718();

        let tx_hash = self.client.send_raw_transaction(&raw).await?;
        tracing::info!(label = call.label, tx_hash = %tx_hash, attempt, "Transaction sent");

        let receipt = self.wait_for_receipt(tx_hash).await?;
        if !receipt.status() {
            return Err(BlockchainError::Reverted { tx_hash });
        }

        self.nonce.advance().await;

        let block_number = if self.client.confirmation_blocks() > 1 {
            Some(self.wait_for_confirmation(tx_hash).await?)
        } else {
            receipt.block_number
        };

        Ok(TxOutcome {
            tx_hash,
            block_number,
            gas_used: receipt.gas_used,
            attempts: attempt,
            logs: receipt.inner.logs().to_vec(),
        })
    }

    /// Build an unsigned legacy transaction for `call`.
    pub async fn build(
        &self,
        call: &ContractCall,
        force_refresh: bool,
    ) -> BlockchainResult<TransactionRequest> {
        let from = self.wallet.address();
        let nonce = self
            .nonce
            .current(force_refresh, || self.client.get_pending_nonce(from))
            .await?;

        let request = TransactionRequest::default()
            .with_from(from)
            .with_to(call.to)
            .with_input(call.data.clone());

        let estimate = self.client.estimate_gas(request.clone()).await?;
        let gas_price = self.gas_price().await?;

        Ok(request
            .with_nonce(nonce)
            .with_gas_limit(estimate.saturating_add(call.gas_buffer))
            .with_gas_price(gas_price)
            .with_chain_id(self.wallet.chain_id()))
    }

    /// Node gas price with the configured multiplier, bounded by the maximum.
    pub async fn gas_price(&self) -> BlockchainResult<u128> {
        let config = self.client.config();
        let node_price = self.client.get_gas_price().await?;
        let adjusted = (node_price as f64 * config.gas_price_multiplier) as u128;

        if adjusted > u128::from(config.max_gas_price_gwei) * WEI_PER_GWEI {
            return Err(BlockchainError::GasPriceTooHigh {
                current_gwei: u64::try_from(adjusted.div_ceil(WEI_PER_GWEI)).unwrap_or(u64::MAX),
                max_gwei: config.max_gas_price_gwei,
            });
        }
        Ok(adjusted)
    }

    /// Poll until a receipt exists or the confirmation deadline passes.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> BlockchainResult<TransactionReceipt> {
        let config = self.client.config();
        let deadline = Duration::from_secs(config.confirmation_timeout_secs);
        let poll_interval = Duration::from_secs(config.confirmation_poll_secs.max(1));

        let result = timeout(deadline, async {
            let mut ticker = interval(poll_interval);
            loop {
                ticker.tick().await;
                match self.client.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return Ok(receipt),
                    Ok(None) => tracing::debug!(tx_hash = %tx_hash, "Transaction pending"),
                    // A nonce rejection can only come from the broadcast, so a
                    // receipt lookup error is just a flaky node.
                    Err(e) => tracing::debug!(tx_hash = %tx_hash, error = %e, "Receipt lookup failed"),
                }
            }
        })
        .await;

        match result {
            Ok(receipt) => receipt,
            Err(_) => Err(BlockchainError::ConfirmationTimeout {
                tx_hash,
                timeout_secs: config.confirmation_timeout_secs,
            }),
        }
    }

    /// Wait until `tx_hash` is buried under `confirmation_blocks` blocks and
    /// return the block it was mined in. Failed lookups are polled again.
    pub async fn wait_for_confirmation(&self, tx_hash: TxHash) -> BlockchainResult<u64> {
        let required = u64::from(self.client.confirmation_blocks().max(1));
        let config = self.client.config();
        let timeout_secs = config.confirmation_timeout_secs;
        let poll_interval = Duration::from_secs(config.confirmation_poll_secs.max(1));

        let result = timeout(Duration::from_secs(timeout_secs), async {
            let mut ticker = interval(poll_interval);

            loop {
                ticker.tick().await;

                // Re-read the receipt each round; a reorg can move or drop it.
                let receipt = match self.client.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => receipt,
                    Ok(None) => {
                        tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                        continue;
                    }
                    Err(e) => {
                        tracing::debug!(tx_hash = %tx_hash, error = %e, "Receipt lookup failed");
                        continue;
                    }
                };
                if !receipt.status() {
                    return Err(BlockchainError::Reverted { tx_hash });
                }
                let Some(mined_in) = receipt.block_number else {
                    continue;
                };

                let current = match self.client.get_block_number().await {
                    Ok(current) => current,
                    Err(e) => {
                        tracing::debug!(tx_hash = %tx_hash, error = %e, "Block number lookup failed");
                        continue;
                    }
                };
                let confirmations = current.saturating_sub(mined_in) + 1;
                if confirmations >= required {
                    return Ok(mined_in);
                }

                tracing::debug!(
                    tx_hash = %tx_hash,
                    confirmations,
                    required,
                    "Waiting for confirmations"
                );
            }
        })
        .await;

        match result {
            Ok(block_number) => block_number,
            Err(_) => Err(BlockchainError::ConfirmationTimeout { tx_hash, timeout_secs }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::BlockchainConfig;

    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn offline_submitter(max_attempts: u32) -> TxSubmitter {
        let client = BlockchainClient::from_config(BlockchainConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            failover_urls: Vec::new(),
            rpc_timeout_secs: 2,
            ..BlockchainConfig::default()
        })
        .unwrap();
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, 314159).unwrap();
        let config = SubmissionConfig {
            max_attempts,
            retry_base_delay_ms: 10,
            retry_max_delay_ms: 10,
            nonce_retry_delay_ms: 10,
            ..SubmissionConfig::default()
        };
        TxSubmitter::new(client, wallet, config)
    }

    #[tokio::test]
    async fn test_unreachable_node_fails_on_last_attempt() {
        let submitter = offline_submitter(2);
        let call = ContractCall {
            label: "test",
            to: alloy::primitives::Address::ZERO,
            data: Default::default(),
            gas_buffer: 0,
        };
        let err = submitter.submit(call).await.unwrap_err();
        // The connection error is not a nonce conflict, so the final
        // attempt returns it directly.
        assert!(matches!(err, BlockchainError::Rpc(_)));
        assert_eq!(submitter.nonce_manager().cached().await, None);
    }
}
