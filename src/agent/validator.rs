//! Pre-flight checks for a deployment.
//!
//! Each check builds the client it needs from config and secrets, so the
//! validator runs even when the agent itself could not be constructed.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;

use crate::analysis::LlmClient;
use crate::blockchain::network::{wei_to_fil, FAUCET_URL};
use crate::blockchain::{BlockchainClient, ProtectionContracts, Wallet};
use crate::config::secrets::{is_valid_api_key, is_valid_private_key};
use crate::config::{AgentConfig, Secrets};
use crate::resilience::with_timeout;
use crate::storage::StorageManager;

/// Balance below which the wallet check warns, in tFIL.
pub const LOW_BALANCE_FIL: f64 = 0.01;

/// Upper bound for a single check.
const CHECK_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub status: CheckStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CheckResult {
    fn new(name: &'static str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name,
            status,
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub passed: usize,
    pub warnings: usize,
    pub critical: usize,
    /// True when no check is critical.
    pub ready: bool,
    pub checks: Vec<CheckResult>,
}

impl ValidationReport {
    pub fn from_checks(checks: Vec<CheckResult>) -> Self {
        let count = |s: CheckStatus| checks.iter().filter(|c| c.status == s).count();
        let critical = count(CheckStatus::Critical);
        Self {
            passed: count(CheckStatus::Passed),
            warnings: count(CheckStatus::Warning),
            critical,
            ready: critical == 0,
            checks,
        }
    }
}

/// Zero is critical, anything under [`LOW_BALANCE_FIL`] is a warning.
pub fn classify_balance(balance_fil: f64) -> CheckStatus {
    if balance_fil <= 0.0 {
        CheckStatus::Critical
    } else if balance_fil < LOW_BALANCE_FIL {
        CheckStatus::Warning
    } else {
        CheckStatus::Passed
    }
}

pub struct SetupValidator {
    config: AgentConfig,
    secrets: Secrets,
}

impl SetupValidator {
    pub fn new(config: AgentConfig, secrets: Secrets) -> Self {
        Self { config, secrets }
    }

    /// Run every check in order.
    pub async fn run(&self) -> ValidationReport {
        let mut checks = vec![self.check_environment()];
        checks.push(bounded("network", CheckStatus::Critical, self.check_network()).await);
        checks.push(bounded("wallet", CheckStatus::Critical, self.check_wallet()).await);
        checks.push(bounded("contracts", CheckStatus::Critical, self.check_contracts()).await);
        checks.push(bounded("storage", CheckStatus::Warning, self.check_storage()).await);
        checks.push(bounded("llm", CheckStatus::Warning, self.check_llm()).await);

        let report = ValidationReport::from_checks(checks);
        tracing::info!(
            passed = report.passed,
            warnings = report.warnings,
            critical = report.critical,
            "Setup validation finished"
        );
        report
    }

    pub fn check_environment(&self) -> CheckResult {
        let use_local = self.config.llm.use_local_model;
        let missing = self.secrets.missing_required(use_local);
        if !missing.is_empty() {
            return CheckResult::new(
                "environment",
                CheckStatus::Critical,
                format!("Missing required variables: {}", missing.join(", ")),
            );
        }

        let mut problems = Vec::new();
        if let Some(key) = &self.secrets.private_key {
            if !is_valid_private_key(key) {
                problems.push("PRIVATE_KEY is not 64 hex characters");
            }
        }
        if !use_local {
            if let Some(key) = &self.secrets.openai_api_key {
                if !is_valid_api_key("openai", key) {
                    problems.push("OPENAI_API_KEY has an unexpected format");
                }
            }
        }
        if let Some(token) = &self.secrets.github_token {
            if !is_valid_api_key("github", token) {
                problems.push("GITHUB_TOKEN has an unexpected format");
            }
        }

        let details = json!({
            "github_token": self.secrets.github_token.is_some(),
            "pinata": self.secrets.pinata().is_some(),
            "web3_storage": self.secrets.web3_storage_token.is_some(),
            "local_model": use_local,
        });

        if problems.is_empty() {
            CheckResult::new("environment", CheckStatus::Passed, "Required variables present")
                .with_details(details)
        } else {
            CheckResult::new("environment", CheckStatus::Warning, problems.join("; "))
                .with_details(details)
        }
    }

    pub async fn check_network(&self) -> CheckResult {
        let client = match BlockchainClient::from_config(self.config.blockchain.clone()) {
            Ok(c) => c,
            Err(e) => return CheckResult::new("network", CheckStatus::Critical, e.to_string()),
        };
        let chain_id = match client.get_chain_id().await {
            Ok(id) => id.0,
            Err(e) => return CheckResult::new("network", CheckStatus::Critical, e.to_string()),
        };
        if chain_id != self.config.blockchain.chain_id {
            return CheckResult::new(
                "network",
                CheckStatus::Critical,
                format!(
                    "Chain ID mismatch: expected {}, got {}",
                    self.config.blockchain.chain_id, chain_id
                ),
            );
        }
        let block = client.get_block_number().await.ok();
        CheckResult::new("network", CheckStatus::Passed, format!("Connected to chain {}", chain_id))
            .with_details(json!({ "chain_id": chain_id, "block_number": block }))
    }

    pub async fn check_wallet(&self) -> CheckResult {
        let wallet = match Wallet::from_secrets(&self.secrets, self.config.blockchain.chain_id) {
            Ok(w) => w,
            Err(e) => return CheckResult::new("wallet", CheckStatus::Critical, e.to_string()),
        };
        let client = match BlockchainClient::from_config(self.config.blockchain.clone()) {
            Ok(c) => c,
            Err(e) => return CheckResult::new("wallet", CheckStatus::Critical, e.to_string()),
        };
        let balance = match client.get_balance(wallet.address()).await {
            Ok(b) => wei_to_fil(b),
            Err(e) => return CheckResult::new("wallet", CheckStatus::Critical, e.to_string()),
        };

        let status = classify_balance(balance);
        let message = match status {
            CheckStatus::Passed => format!("Balance {:.4} tFIL", balance),
            _ => format!("Balance {:.4} tFIL, fund the wallet at {}", balance, FAUCET_URL),
        };
        CheckResult::new("wallet", status, message).with_details(json!({
            "address": wallet.address().to_string(),
            "balance_fil": balance,
        }))
    }

    pub async fn check_contracts(&self) -> CheckResult {
        let contracts = BlockchainClient::from_config(self.config.blockchain.clone()).and_then(
            |client| ProtectionContracts::new(client, None, self.config.submission.clone()),
        );
        let contracts = match contracts {
            Ok(c) => c,
            Err(e) => return CheckResult::new("contracts", CheckStatus::Critical, e.to_string()),
        };

        let statuses = contracts.check_contract_code().await;
        let missing: Vec<&str> = statuses
            .iter()
            .filter(|s| !s.deployed)
            .map(|s| s.name.as_str())
            .collect();
        let details = serde_json::to_value(&statuses).unwrap_or_default();
        if missing.is_empty() {
            CheckResult::new("contracts", CheckStatus::Passed, "All contracts deployed")
                .with_details(details)
        } else {
            CheckResult::new(
                "contracts",
                CheckStatus::Critical,
                format!("No code at: {}", missing.join(", ")),
            )
            .with_details(details)
        }
    }

    /// Local files always work, so storage is never critical.
    pub async fn check_storage(&self) -> CheckResult {
        let manager = match StorageManager::new(self.config.storage.clone(), &self.secrets) {
            Ok(m) => m,
            Err(e) => return CheckResult::new("storage", CheckStatus::Warning, e.to_string()),
        };
        let report = manager.service_status().await;
        let any_ipfs =
            report.pinata.available || report.web3_storage.available || report.local_ipfs.available;
        let details = serde_json::to_value(&report).unwrap_or_default();
        if any_ipfs {
            CheckResult::new("storage", CheckStatus::Passed, "IPFS upload available")
                .with_details(details)
        } else {
            CheckResult::new(
                "storage",
                CheckStatus::Warning,
                "No IPFS service reachable, documents will be stored locally",
            )
            .with_details(details)
        }
    }

    /// Analyzers fall back to heuristics, so the model is never critical.
    pub async fn check_llm(&self) -> CheckResult {
        let client = match LlmClient::new(&self.config.llm, self.secrets.openai_api_key.as_deref()) {
            Ok(c) => c,
            Err(e) => return CheckResult::new("llm", CheckStatus::Warning, e.to_string()),
        };
        if client.is_reachable().await {
            CheckResult::new("llm", CheckStatus::Passed, format!("Model {} reachable", client.model()))
        } else {
            CheckResult::new(
                "llm",
                CheckStatus::Warning,
                format!("Model {} unreachable, heuristic analysis only", client.model()),
            )
        }
    }
}

/// Run `check`, reporting `on_timeout` when it outlives [`CHECK_TIMEOUT`].
async fn bounded<F>(name: &'static str, on_timeout: CheckStatus, check: F) -> CheckResult
where
    F: Future<Output = CheckResult>,
{
    match with_timeout(CHECK_TIMEOUT, check).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(check = name, error = %e, "Setup check timed out");
            CheckResult::new(name, on_timeout, e.to_string())
        }
    }
}
