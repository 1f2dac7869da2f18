//! Agent results and errors.
//!
//! Every operation returns one of these structs; the CLI prints them as JSON.

use serde::Serialize;
use thiserror::Error;

use crate::agent::bounty::{BountyClaim, LeaderboardEntry};
use crate::agent::cache::CacheStats;
use crate::analysis::{AnalysisError, AuditReport, SimilarityReport};
use crate::blockchain::contracts::{ContractAddressSet, CostEstimate, OnChainRepository};
use crate::blockchain::network::NetworkInfo;
use crate::blockchain::BlockchainError;
use crate::github::GitHubError;
use crate::storage::{ServiceStatusReport, StorageError, StorageService};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Invalid repository URL: {0}")]
    Url(#[from] GitHubError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Blockchain(#[from] BlockchainError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Repository already registered with ID {repo_id}: {url}")]
    AlreadyRegistered { repo_id: u64, url: String },

    /// The license is already stored; only the contract call failed.
    #[error("Blockchain registration failed (license stored at {license_cid}): {source}")]
    Registration {
        license_cid: String,
        #[source]
        source: BlockchainError,
    },

    #[error("Repository {0} not found")]
    RepositoryNotFound(u64),

    #[error("No registered repositories to scan")]
    NoRepositories,

    #[error("A registered repository ID is required")]
    RepoIdRequired,

    #[error("Similarity too low for a bounty claim: {score:.2} (minimum {threshold:.2})")]
    SimilarityTooLow { score: f64, threshold: f64 },

    #[error("Infringement already reported for {0}")]
    AlreadyReported(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("No signing account configured")]
    NoAccount,

    #[error("No bounty rewards to withdraw")]
    NothingToWithdraw,
}

pub type AgentResult<T> = Result<T, AgentError>;

/// A generated document and where it ended up.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRef {
    pub path: String,
    pub cid: String,
    pub url: String,
    pub service: StorageService,
    pub verified: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TxSummary {
    pub tx_hash: String,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub explorer_url: String,
}

/// The link registry call is best-effort during registration.
#[derive(Debug, Clone, Serialize)]
pub struct LinkOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx: Option<TxSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterResult {
    pub repo_id: u64,
    pub github_url: String,
    pub license_type: String,
    pub repo_hash: String,
    pub fingerprint: String,
    pub key_features: Vec<String>,
    pub registration: TxSummary,
    pub link_registry: LinkOutcome,
    pub license: DocumentRef,
}

/// A comparison target that is already registered on chain.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RegistryMatch {
    pub repo_id: u64,
    pub url: String,
    pub owner: String,
    pub license_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareResult {
    pub similarity: SimilarityReport,
    pub registered_matches: Vec<RegistryMatch>,
    pub recommendation: String,
    pub next_actions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DmcaFiling {
    pub notice_id: String,
    pub original_repo_id: u64,
    pub infringing_url: String,
    pub similarity_score: f64,
    pub evidence_hash: String,
    pub document: DocumentRef,
    pub dmca_filing: TxSummary,
    pub violation_report: TxSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub repositories_scanned: usize,
    pub candidates_compared: usize,
    pub violations_found: usize,
    pub dmca_notices_filed: usize,
    pub filings: Vec<DmcaFiling>,
    /// Per-candidate failures that did not stop the scan.
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditOutcome {
    pub audit: AuditReport,
    /// Uploaded report, present when there were findings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<DocumentRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BountyReport {
    pub claim: BountyClaim,
    pub dmca: DmcaFiling,
    pub infringement: TxSummary,
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct BountyBalance {
    pub address: String,
    pub claimable_wei: String,
    pub claimable_fil: f64,
    pub tracked_pending_fil: f64,
    pub reports: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawResult {
    pub address: String,
    pub amount_fil: f64,
    pub tx: TxSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard {
    pub reporters: usize,
    pub entries: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub network: NetworkInfo,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_fil: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_repositories: Option<u64>,
    pub contracts: ContractAddressSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_costs: Option<CostEstimate>,
    pub storage: ServiceStatusReport,
    pub cache: CacheStats,
    pub bounty_reporters: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub total_count: u64,
    pub returned_count: usize,
    pub repositories: Vec<OnChainRepository>,
}

/// Result of a workflow step that does not abort the workflow.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepResult<T> {
    Completed(T),
    Failed { error: String },
}

impl<T> StepResult<T> {
    pub fn from_result<E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => StepResult::Completed(value),
            Err(e) => StepResult::Failed {
                error: e.to_string(),
            },
        }
    }

    pub fn completed(&self) -> Option<&T> {
        match self {
            StepResult::Completed(value) => Some(value),
            StepResult::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WorkflowSummary {
    pub repo_id: u64,
    pub license_cid: String,
    pub security_findings: usize,
    pub violations_found: usize,
    pub dmca_notices_filed: usize,
    pub steps_failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub registration: RegisterResult,
    pub audit: StepResult<AuditOutcome>,
    pub scan: StepResult<ScanResult>,
    pub summary: WorkflowSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_result_serialization() {
        let ok: StepResult<QueryResult> = StepResult::from_result::<AgentError>(Ok(QueryResult {
            total_count: 0,
            returned_count: 0,
            repositories: vec![],
        }));
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["total_count"], 0);
        assert!(ok.completed().is_some());

        let failed: StepResult<QueryResult> =
            StepResult::from_result(Err(AgentError::NoRepositories));
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "No registered repositories to scan");
        assert!(failed.completed().is_none());
    }

    #[test]
    fn test_registration_error_keeps_license_cid() {
        let err = AgentError::Registration {
            license_cid: "local:///tmp/LICENSE.md".to_string(),
            source: BlockchainError::NotAvailable("No private key configured".to_string()),
        };
        assert!(err.to_string().contains("local:///tmp/LICENSE.md"));
    }
}
