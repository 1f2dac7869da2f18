//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, thresholds within bounds)
//! - Check that URLs and contract addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AgentConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use alloy::primitives::Address;

use crate::config::schema::AgentConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if let Err(e) = url::Url::parse(value) {
        errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e)));
    }
}

fn check_positive(errors: &mut Vec<ValidationError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::new(field, "must be greater than zero"));
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<Address>().is_err() {
        errors.push(ValidationError::new(field, format!("invalid address '{}'", value)));
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let chain = &config.blockchain;
    check_url(&mut errors, "blockchain.rpc_url", &chain.rpc_url);
    for (i, url) in chain.failover_urls.iter().enumerate() {
        check_url(&mut errors, &format!("blockchain.failover_urls[{}]", i), url);
    }
    check_positive(&mut errors, "blockchain.rpc_timeout_secs", chain.rpc_timeout_secs);
    check_positive(
        &mut errors,
        "blockchain.confirmation_timeout_secs",
        chain.confirmation_timeout_secs,
    );
    check_positive(&mut errors, "blockchain.confirmation_poll_secs", chain.confirmation_poll_secs);
    if chain.gas_price_multiplier < 1.0 || !chain.gas_price_multiplier.is_finite() {
        errors.push(ValidationError::new(
            "blockchain.gas_price_multiplier",
            "must be a finite value >= 1.0",
        ));
    }
    check_positive(&mut errors, "blockchain.max_gas_price_gwei", chain.max_gas_price_gwei);
    check_address(&mut errors, "blockchain.contracts.github_protection", &chain.contracts.github_protection);
    check_address(&mut errors, "blockchain.contracts.link_registry", &chain.contracts.link_registry);
    check_address(
        &mut errors,
        "blockchain.contracts.infringement_bounty",
        &chain.contracts.infringement_bounty,
    );

    if config.submission.max_attempts == 0 {
        errors.push(ValidationError::new("submission.max_attempts", "must be at least 1"));
    }
    check_positive(&mut errors, "submission.nonce_ttl_secs", config.submission.nonce_ttl_secs);
    if config.submission.retry_max_delay_ms < config.submission.retry_base_delay_ms {
        errors.push(ValidationError::new(
            "submission.retry_max_delay_ms",
            "must be >= retry_base_delay_ms",
        ));
    }

    let storage = &config.storage;
    check_url(&mut errors, "storage.pinata_api_url", &storage.pinata_api_url);
    check_url(&mut errors, "storage.web3_storage_api_url", &storage.web3_storage_api_url);
    check_url(&mut errors, "storage.local_ipfs_url", &storage.local_ipfs_url);
    for (i, url) in storage.gateways.iter().enumerate() {
        check_url(&mut errors, &format!("storage.gateways[{}]", i), url);
    }
    check_positive(&mut errors, "storage.upload_timeout_secs", storage.upload_timeout_secs);
    check_positive(&mut errors, "storage.verify_timeout_secs", storage.verify_timeout_secs);
    if storage.local_fallback_dir.trim().is_empty() {
        errors.push(ValidationError::new("storage.local_fallback_dir", "must not be empty"));
    }

    check_url(&mut errors, "github.api_url", &config.github.api_url);
    check_url(&mut errors, "llm.api_url", &config.llm.api_url);
    check_url(&mut errors, "llm.local_api_url", &config.llm.local_api_url);
    check_positive(&mut errors, "llm.timeout_secs", config.llm.timeout_secs);

    let threshold = config.scan.similarity_threshold;
    if !(threshold > 0.0 && threshold <= 1.0) {
        errors.push(ValidationError::new(
            "scan.similarity_threshold",
            "must be within (0.0, 1.0]",
        ));
    }
    if !(0.0..=1.0).contains(&config.scan.bounty_confidence) {
        errors.push(ValidationError::new("scan.bounty_confidence", "must be within [0.0, 1.0]"));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
