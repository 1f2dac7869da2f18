//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to the primary JSON-RPC endpoint and its failovers
//! - Query chain state (block number, balances, nonces, receipts, code)
//! - Estimate gas, run read-only calls, broadcast raw transactions
//! - Provide health check for blockchain connectivity

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainConfig, BlockchainError, BlockchainResult, ChainId};
use crate::observability::metrics;

type SharedProvider = Arc<dyn Provider + Send + Sync>;

/// Blockchain RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// List of providers (primary + failovers).
    providers: Vec<SharedProvider>,
    config: BlockchainConfig,
    /// Per-provider request timeout.
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Build the provider list without touching the network.
    pub fn from_config(config: BlockchainConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as SharedProvider);

        for url_str in &config.failover_urls {
            match url_str.parse() {
                Ok(url) => {
                    providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as SharedProvider)
                }
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL"),
            }
        }

        Ok(Self {
            providers,
            config,
            timeout_duration,
        })
    }

    /// Create a client and check the chain ID.
    ///
    /// A failed chain check is logged, not returned, so read-only commands
    /// still work against a degraded node.
    pub async fn new(config: BlockchainConfig) -> BlockchainResult<Self> {
        let client = Self::from_config(config)?;

        match client.verify_chain_id().await {
            Ok(()) => {
                tracing::info!(
                    rpc_url = %client.config.rpc_url,
                    chain_id = client.config.chain_id,
                    providers = client.providers.len(),
                    "Blockchain client initialized"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Blockchain client initialized but chain verification failed"
                );
            }
        }

        Ok(client)
    }

    /// Run `op` against each provider in order until one succeeds.
    async fn with_failover<T, E, F, Fut>(&self, method: &'static str, op: F) -> BlockchainResult<T>
    where
        F: Fn(SharedProvider) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut last_error: Option<String> = None;

        for (i, provider) in self.providers.iter().enumerate() {
            if i > 0 {
                metrics::record_rpc_failover(method);
            }
            match timeout(self.timeout_duration, op(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, method, error = %e, "RPC error, trying next provider");
                    last_error = Some(e.to_string());
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, method, "RPC timeout, trying next provider");
                }
            }
        }

        match last_error {
            Some(e) => Err(BlockchainError::Rpc(format!(
                "All RPC providers failed for {}: {}",
                method, e
            ))),
            None => Err(BlockchainError::Timeout(self.config.rpc_timeout_secs)),
        }
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        self.with_failover("eth_chainId", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    /// Get the latest block number.
    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        self.with_failover("eth_blockNumber", |p| async move { p.get_block_number().await })
            .await
    }

    /// Get the balance of an address in wei.
    pub async fn get_balance(&self, address: Address) -> BlockchainResult<U256> {
        self.with_failover("eth_getBalance", |p| async move { p.get_balance(address).await })
            .await
    }

    /// Transaction count including pending transactions.
    ///
    /// Falls back to the `latest` block tag when the node rejects `pending`.
    pub async fn get_pending_nonce(&self, address: Address) -> BlockchainResult<u64> {
        let pending = self
            .with_failover("eth_getTransactionCount", |p| async move {
                p.get_transaction_count(address).pending().await
            })
            .await;

        match pending {
            Ok(nonce) => Ok(nonce),
            Err(e) => {
                tracing::warn!(error = %e, "Pending nonce unavailable, falling back to latest");
                self.with_failover("eth_getTransactionCount", |p| async move {
                    p.get_transaction_count(address).latest().await
                })
                .await
            }
        }
    }

    /// Get current gas price in wei.
    pub async fn get_gas_price(&self) -> BlockchainResult<u128> {
        self.with_failover("eth_gasPrice", |p| async move { p.get_gas_price().await })
            .await
    }

    /// Estimate gas for a call.
    pub async fn estimate_gas(&self, tx: TransactionRequest) -> BlockchainResult<u64> {
        self.with_failover("eth_estimateGas", |p| {
            let tx = tx.clone();
            async move { p.estimate_gas(tx).await }
        })
        .await
    }

    /// Execute a read-only call and return the raw return data.
    pub async fn call(&self, tx: TransactionRequest) -> BlockchainResult<Bytes> {
        self.with_failover("eth_call", |p| {
            let tx = tx.clone();
            async move { p.call(tx).await }
        })
        .await
    }

    /// Broadcast a signed, EIP-2718 encoded transaction.
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> BlockchainResult<TxHash> {
        self.with_failover("eth_sendRawTransaction", |p| {
            let raw = raw.to_vec();
            async move {
                p.send_raw_transaction(&raw)
                    .await
                    .map(|pending| *pending.tx_hash())
            }
        })
        .await
    }

    /// Get a transaction receipt by hash.
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> BlockchainResult<Option<TransactionReceipt>> {
        self.with_failover("eth_getTransactionReceipt", |p| async move {
            p.get_transaction_receipt(tx_hash).await
        })
        .await
    }

    /// Deployed bytecode at `address` (empty for accounts).
    pub async fn get_code(&self, address: Address) -> BlockchainResult<Bytes> {
        self.with_failover("eth_getCode", |p| async move { p.get_code_at(address).await })
            .await
    }

    /// Check if the blockchain is reachable and healthy.
    ///
    /// Returns true if we can query the block number.
    pub async fn is_healthy(&self) -> bool {
        let healthy = self.get_block_number().await.is_ok();
        metrics::record_rpc_health(healthy);
        healthy
    }

    pub fn config(&self) -> &BlockchainConfig {
        &self.config
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Get the number of confirmation blocks required.
    pub fn confirmation_blocks(&self) -> u32 {
        self.config.confirmation_blocks
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("providers", &self.providers.len())
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
