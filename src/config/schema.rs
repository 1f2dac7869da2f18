//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the agent.
//! All types derive Serde traits for deserialization from config files.
//! Secrets are deliberately absent: they come from the environment only
//! (see `config::secrets`).

use serde::{Deserialize, Serialize};

/// Root configuration for the protection agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    /// Blockchain node and contract settings.
    pub blockchain: BlockchainConfig,

    /// Transaction submission / retry settings.
    pub submission: SubmissionConfig,

    /// Decentralized storage settings.
    pub storage: StorageConfig,

    /// GitHub REST API settings.
    pub github: GitHubConfig,

    /// Language model settings.
    pub llm: LlmConfig,

    /// Violation scanning settings.
    pub scan: ScanConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl AgentConfig {
    /// Apply environment variable overrides on top of file values.
    ///
    /// Recognised: `FILECOIN_RPC_URL`, `LOCAL_IPFS_URL`, `USE_LOCAL_MODEL`, `LOG_LEVEL`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env_overrides`](Self::apply_env_overrides) with an injectable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FILECOIN_RPC_URL").filter(|v| !v.is_empty()) {
            self.blockchain.rpc_url = url;
        }
        if let Some(url) = lookup("LOCAL_IPFS_URL").filter(|v| !v.is_empty()) {
            self.storage.local_ipfs_url = url;
        }
        if let Some(flag) = lookup("USE_LOCAL_MODEL") {
            self.llm.use_local_model = flag.eq_ignore_ascii_case("true");
        }
        if let Some(level) = lookup("LOG_LEVEL").filter(|v| !v.is_empty()) {
            self.observability.log_level = level.to_lowercase();
        }
    }
}

/// Blockchain integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Chain ID (314159 for Filecoin Calibration).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Number of block confirmations required for finality.
    pub confirmation_blocks: u32,

    /// Maximum time to wait for a receipt, in seconds.
    pub confirmation_timeout_secs: u64,

    /// Receipt polling interval in seconds.
    pub confirmation_poll_secs: u64,

    /// Gas price multiplier (1.0 = node price, 1.2 = 20% buffer).
    pub gas_price_multiplier: f64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,

    /// Block explorer base URL.
    pub explorer_url: String,

    /// Deployed contract addresses.
    pub contracts: ContractAddresses,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://rpc.ankr.com/filecoin_testnet".to_string(),
            failover_urls: vec![
                "https://api.calibration.node.glif.io/rpc/v1".to_string(),
                "https://filecoin-calibration.chainup.net/rpc/v1".to_string(),
            ],
            chain_id: 314159,
            rpc_timeout_secs: 30,
            confirmation_blocks: 1,
            confirmation_timeout_secs: 300,
            confirmation_poll_secs: 2,
            gas_price_multiplier: 1.0,
            max_gas_price_gwei: 500,
            explorer_url: "https://calibration.filscan.io".to_string(),
            contracts: ContractAddresses::default(),
        }
    }
}

/// Addresses of the deployed protection contracts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractAddresses {
    pub github_protection: String,
    pub link_registry: String,
    pub infringement_bounty: String,
}

impl Default for ContractAddresses {
    fn default() -> Self {
        Self {
            github_protection: "0x19054030669efBFc413bA3729b63eCfD3Bdc22B5".to_string(),
            link_registry: "0x5fa19b4a48C20202055c8a6fdf16688633617D50".to_string(),
            infringement_bounty: "0xA2cD4CC41b8DCE00D002Aa4B29050f2d53705400".to_string(),
        }
    }
}

/// Transaction submission configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Maximum number of submission attempts per transaction.
    pub max_attempts: u32,

    /// Age after which a cached nonce is re-read from the node, in seconds.
    pub nonce_ttl_secs: u64,

    /// Delay before retrying after a nonce conflict, in milliseconds.
    pub nonce_retry_delay_ms: u64,

    /// Base delay between retries for other errors, in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Cap for exponential retry delay, in milliseconds.
    pub retry_max_delay_ms: u64,

    /// Use exponential instead of fixed retry delay.
    pub exponential_backoff: bool,

    /// Gas added on top of the estimate for repository registration / violation reports.
    pub register_gas_buffer: u64,

    /// Gas added on top of the estimate for link registry / bounty calls.
    pub link_gas_buffer: u64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            nonce_ttl_secs: 30,
            nonce_retry_delay_ms: 2000,
            retry_base_delay_ms: 1000,
            retry_max_delay_ms: 8000,
            exponential_backoff: false,
            register_gas_buffer: 50_000,
            link_gas_buffer: 30_000,
        }
    }
}

/// Decentralized storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Pinata API base URL.
    pub pinata_api_url: String,

    /// Web3.Storage API base URL.
    pub web3_storage_api_url: String,

    /// Local IPFS node HTTP API URL.
    pub local_ipfs_url: String,

    /// Directory that receives copies when no IPFS service is reachable.
    pub local_fallback_dir: String,

    /// Public gateways, in preference order.
    pub gateways: Vec<String>,

    /// Upload request timeout in seconds.
    pub upload_timeout_secs: u64,

    /// Verification rounds after a Pinata upload.
    pub verify_attempts: u32,

    /// Delay between verification rounds in seconds.
    pub verify_delay_secs: u64,

    /// Per-gateway HEAD timeout in seconds.
    pub verify_timeout_secs: u64,

    /// Number of gateways probed per verification round.
    pub verify_gateways: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            pinata_api_url: "https://api.pinata.cloud".to_string(),
            web3_storage_api_url: "https://api.web3.storage".to_string(),
            local_ipfs_url: "http://localhost:5001".to_string(),
            local_fallback_dir: "local_storage".to_string(),
            gateways: vec![
                "https://ipfs.io".to_string(),
                "https://gateway.pinata.cloud".to_string(),
                "https://cloudflare-ipfs.com".to_string(),
                "https://dweb.link".to_string(),
            ],
            upload_timeout_secs: 300,
            verify_attempts: 3,
            verify_delay_secs: 5,
            verify_timeout_secs: 10,
            verify_gateways: 2,
        }
    }
}

/// GitHub API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// REST API base URL.
    pub api_url: String,

    /// Maximum blobs scanned per audit.
    pub max_files: usize,

    /// Maximum commits scanned per audit.
    pub max_commits: usize,

    /// Maximum shared files fetched when comparing two repositories.
    pub max_compare_files: usize,

    /// Maximum candidates returned by repository search.
    pub search_limit: usize,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            max_files: 50,
            max_commits: 20,
            max_compare_files: 20,
            search_limit: 10,
            timeout_secs: 30,
        }
    }
}

/// Language model configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Use a local OpenAI-compatible server (Ollama) instead of the hosted API.
    pub use_local_model: bool,

    /// Hosted API base URL.
    pub api_url: String,

    /// Hosted model name.
    pub model: String,

    /// Local server base URL.
    pub local_api_url: String,

    /// Local model name.
    pub local_model: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            use_local_model: false,
            api_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            local_api_url: "http://localhost:11434/v1".to_string(),
            local_model: "llama3.2:3b".to_string(),
            timeout_secs: 120,
            temperature: 0.1,
        }
    }
}

/// Violation scanning configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Similarity above which a DMCA notice is filed (0.0 - 1.0).
    pub similarity_threshold: f64,

    /// Minimum model confidence for bounty claims.
    pub bounty_confidence: f64,

    /// Directory for generated license / DMCA / audit documents.
    pub output_dir: String,

    /// Optional JSON file persisting the registered-repository cache.
    pub cache_path: Option<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            bounty_confidence: 0.8,
            output_dir: "reports".to_string(),
            cache_path: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
