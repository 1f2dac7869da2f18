//! The protection agent: sequences analysis, storage and contract calls.
//!
//! Submission is sequential. Every on-chain write goes through one
//! `TxSubmitter`, so the nonce cache is never shared between tasks.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use alloy::primitives::{Address, U256};

use crate::agent::bounty::BountyLedger;
use crate::agent::cache::{CachedRepository, RepositoryCache};
use crate::agent::types::*;
use crate::agent::validator::{SetupValidator, ValidationReport};
use crate::analysis::{
    next_actions, recommendation, render_audit_report, render_dmca_notice, render_license,
    write_document, DmcaNotice, LicenseType, LlmClient, RepositoryAnalyzer, SecurityScanner,
    SimilarityAnalyzer, SimilarityReport,
};
use crate::blockchain::contracts::OnChainRepository;
use crate::blockchain::fingerprint::{self, RepoIdentity};
use crate::blockchain::network::{wei_to_fil, NetworkInfo};
use crate::blockchain::{
    BlockchainClient, BlockchainError, ProtectionContracts, RepositoryRegistration, TxOutcome,
    Wallet,
};
use crate::config::{AgentConfig, Secrets};
use crate::github::{require_github_repository, GitHubClient};
use crate::observability::metrics;
use crate::storage::{url_for, StorageManager, StoredContent};

/// Reported on bounty claims until the contract pays out.
pub const BOUNTY_STATUS_PENDING: &str = "pending_verification";

pub struct ProtectionAgent {
    config: AgentConfig,
    secrets: Secrets,
    contracts: ProtectionContracts,
    storage: StorageManager,
    similarity: SimilarityAnalyzer,
    scanner: SecurityScanner,
    cache: RepositoryCache,
    bounties: BountyLedger,
    network: NetworkInfo,
}

impl ProtectionAgent {
    /// Build every client. Only the RPC configuration is mandatory: without
    /// a private key the agent is read-only, without a model it uses heuristics.
    pub fn new(config: AgentConfig, secrets: Secrets) -> AgentResult<Self> {
        let client = BlockchainClient::from_config(config.blockchain.clone())?;
        let wallet = match Wallet::from_secrets(&secrets, config.blockchain.chain_id) {
            Ok(wallet) => Some(wallet),
            Err(e) => {
                tracing::warn!(error = %e, "Wallet unavailable");
                None
            }
        };
        let contracts = ProtectionContracts::new(client, wallet, config.submission.clone())?;
        let storage = StorageManager::new(config.storage.clone(), &secrets)?;

        let github = GitHubClient::new(&config.github, secrets.github_token.clone())?;
        let llm = match LlmClient::new(&config.llm, secrets.openai_api_key.as_deref()) {
            Ok(llm) => Some(llm),
            Err(e) => {
                tracing::warn!(error = %e, "Language model unavailable, using heuristics");
                None
            }
        };
        let scanner = SecurityScanner::new(
            github.clone(),
            llm.clone(),
            config.github.max_files,
            config.github.max_commits,
        );
        let similarity = SimilarityAnalyzer::new(
            RepositoryAnalyzer::new(github, llm),
            config.github.max_compare_files,
        );

        let cache = match &config.scan.cache_path {
            Some(path) => RepositoryCache::load_from_file(path)?,
            None => RepositoryCache::new(None),
        };
        let network =
            NetworkInfo::calibration(config.blockchain.chain_id, &config.blockchain.explorer_url);

        tracing::info!(
            account = ?contracts.account(),
            storage = ?storage.priority(),
            "Protection agent ready"
        );

        Ok(Self {
            config,
            secrets,
            contracts,
            storage,
            similarity,
            scanner,
            cache,
            bounties: BountyLedger::new(),
            network,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn contracts(&self) -> &ProtectionContracts {
        &self.contracts
    }

    pub fn cache(&self) -> &RepositoryCache {
        &self.cache
    }

    pub fn bounties(&self) -> &BountyLedger {
        &self.bounties
    }

    fn output_dir(&self) -> &Path {
        Path::new(&self.config.scan.output_dir)
    }

    fn threshold(&self) -> f64 {
        self.config.scan.similarity_threshold
    }

    fn tx_summary(&self, tx: &TxOutcome) -> TxSummary {
        let tx_hash = tx.tx_hash.to_string();
        TxSummary {
            explorer_url: self.network.tx_url(&tx_hash),
            tx_hash,
            block_number: tx.block_number,
            gas_used: tx.gas_used,
        }
    }

    fn document_ref(&self, path: &Path, stored: &StoredContent) -> DocumentRef {
        let cid = stored.cid.to_string();
        let url = url_for(&cid, None, &self.storage.config().gateways).unwrap_or_else(|_| cid.clone());
        DocumentRef {
            path: path.display().to_string(),
            cid,
            url,
            service: stored.service,
            verified: stored.verified,
        }
    }

    fn require_account(&self) -> AgentResult<Address> {
        self.contracts.account().ok_or(AgentError::NoAccount)
    }

    /// Write `body` under the output directory and upload it.
    async fn store_document(
        &self,
        name: &str,
        body: &str,
        metadata: HashMap<String, String>,
    ) -> AgentResult<DocumentRef> {
        let path: PathBuf = write_document(self.output_dir(), name, body).await?;
        let stored = self.storage.upload(&path, &metadata).await?;
        Ok(self.document_ref(&path, &stored))
    }

    /// A registered repository. Empty slots read back with id 0 and unknown
    /// ids revert; both are `RepositoryNotFound`. Node failures are returned.
    pub async fn repository(&self, repo_id: u64) -> AgentResult<OnChainRepository> {
        match self.contracts.get_repository(repo_id).await {
            Ok(repo) if repo.id != 0 && !repo.github_url.is_empty() => Ok(repo),
            Ok(_) => Err(AgentError::RepositoryNotFound(repo_id)),
            Err(BlockchainError::Rpc(message)) if message.contains("revert") => {
                tracing::debug!(repo_id, error = %message, "Repository read reverted");
                Err(AgentError::RepositoryNotFound(repo_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// `repository` for sweeps over every id: unreadable slots are skipped.
    async fn repository_or_skip(&self, repo_id: u64) -> Option<OnChainRepository> {
        match self.repository(repo_id).await {
            Ok(repo) => Some(repo),
            Err(AgentError::RepositoryNotFound(_)) => {
                tracing::debug!(repo_id, "Skipping empty repository slot");
                None
            }
            Err(e) => {
                tracing::warn!(repo_id, error = %e, "Repository read failed, skipping");
                None
            }
        }
    }

    /// Every repository on chain, oldest first. Unreadable slots are skipped.
    pub async fn registered_repositories(&self) -> AgentResult<Vec<OnChainRepository>> {
        let total = self.contracts.total_repositories().await?;
        let mut repos = Vec::new();
        for repo_id in 1..=total {
            if let Some(repo) = self.repository_or_skip(repo_id).await {
                repos.push(repo);
            }
        }
        Ok(repos)
    }

    async fn find_registered(&self, url: &str) -> AgentResult<Option<OnChainRepository>> {
        Ok(self
            .registered_repositories()
            .await?
            .into_iter()
            .find(|r| r.github_url == url))
    }

    /// Register `url` with a generated license.
    pub async fn register(&self, url: &str, license: LicenseType) -> AgentResult<RegisterResult> {
        let url = require_github_repository(url)?.cleaned;
        tracing::info!(url = %url, license = %license, "Starting registration");

        if let Some(existing) = self.find_registered(&url).await? {
            return Err(AgentError::AlreadyRegistered {
                repo_id: existing.id,
                url,
            });
        }

        let analysis = self.similarity.analyzer().analyze(&url).await?;
        let data = &analysis.repo_data;
        let repo_hash = fingerprint::repo_hash(&RepoIdentity {
            url: &url,
            name: &data.name,
            description: &data.description,
            language: &data.language,
            created_at: &data.created_at,
            files: &data.files,
        });
        let code_fingerprint = fingerprint::fingerprint(&url, &data.created_at, data.size);
        let key_features = fingerprint::format_key_features(&analysis.key_features);

        let body = render_license(&url, license, data);
        let metadata = HashMap::from([
            ("type".to_string(), "license_document".to_string()),
            ("repository".to_string(), url.clone()),
            ("license_type".to_string(), license.to_string()),
        ]);
        let document = self
            .store_document(&format!("LICENSE_{}_{}.md", data.owner, data.name), &body, metadata)
            .await?;

        let link_registry = match self.contracts.add_link(&url, &document.cid).await {
            Ok(tx) => LinkOutcome {
                success: true,
                tx: Some(self.tx_summary(&tx)),
                error: None,
            },
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Link registry update failed");
                LinkOutcome {
                    success: false,
                    tx: None,
                    error: Some(e.to_string()),
                }
            }
        };

        let registration = RepositoryRegistration {
            github_url: url.clone(),
            repo_hash: repo_hash.clone(),
            fingerprint: code_fingerprint.clone(),
            key_features: key_features.clone(),
            license_type: license.to_string(),
            ipfs_metadata: document.cid.clone(),
        };
        let receipt = self
            .contracts
            .register_repository(&registration)
            .await
            .map_err(|source| AgentError::Registration {
                license_cid: document.cid.clone(),
                source,
            })?;

        self.cache.insert(CachedRepository {
            repo_id: receipt.repo_id,
            github_url: url.clone(),
            repo_hash: repo_hash.clone(),
            fingerprint: code_fingerprint.clone(),
            license_type: license.to_string(),
            license_cid: document.cid.clone(),
            key_features: key_features.clone(),
            registered_at: chrono::Utc::now().to_rfc3339(),
            tx_hash: receipt.tx.tx_hash.to_string(),
        });
        metrics::record_registration();
        tracing::info!(repo_id = receipt.repo_id, url = %url, "Registration complete");

        Ok(RegisterResult {
            repo_id: receipt.repo_id,
            github_url: url,
            license_type: license.to_string(),
            repo_hash,
            fingerprint: code_fingerprint,
            key_features,
            registration: self.tx_summary(&receipt.tx),
            link_registry,
            license: document,
        })
    }

    /// Compare two repositories and check both against the registry.
    pub async fn compare(&self, url_a: &str, url_b: &str) -> AgentResult<CompareResult> {
        let a = require_github_repository(url_a)?.cleaned;
        let b = require_github_repository(url_b)?.cleaned;
        tracing::info!(original = %a, candidate = %b, "Comparing repositories");

        let similarity = self.similarity.compare(&a, &b).await?;

        let registered = match self.registered_repositories().await {
            Ok(repos) => repos,
            Err(e) => {
                tracing::warn!(error = %e, "Registry lookup failed");
                Vec::new()
            }
        };
        let registered_matches: Vec<RegistryMatch> = registered
            .into_iter()
            .filter(|r| r.github_url == a || r.github_url == b)
            .map(|r| RegistryMatch {
                repo_id: r.id,
                url: r.github_url,
                owner: r.owner.to_string(),
                license_type: r.license_type,
            })
            .collect();

        let score = similarity.similarity_score;
        Ok(CompareResult {
            recommendation: recommendation(score, registered_matches.len()),
            next_actions: next_actions(score, !registered_matches.is_empty()),
            similarity,
            registered_matches,
        })
    }

    /// Notice, upload, `fileDMCA`, then `reportViolation`.
    async fn file_dmca(
        &self,
        original: &OnChainRepository,
        infringing_url: &str,
        report: &SimilarityReport,
    ) -> AgentResult<DmcaFiling> {
        let timestamp = chrono::Utc::now().to_rfc3339();
        let score = report.similarity_score;
        let notice = DmcaNotice {
            notice_id: format!("dmca_{}", uuid::Uuid::new_v4().simple()),
            evidence_hash: fingerprint::evidence_hash(
                infringing_url,
                score,
                &timestamp,
                &report.evidence,
            ),
            timestamp,
            original_repo_id: original.id,
            original_url: original.github_url.clone(),
            owner: original.owner.to_string(),
            license_type: original.license_type.clone(),
            infringing_url: infringing_url.to_string(),
            similarity_score: score,
            evidence: report.evidence.clone(),
        };

        let metadata = HashMap::from([
            ("type".to_string(), "dmca_notice".to_string()),
            ("original_repository".to_string(), original.github_url.clone()),
            ("infringing_repository".to_string(), infringing_url.to_string()),
            ("similarity_score".to_string(), format!("{:.4}", score)),
        ]);
        let document = self
            .store_document(
                &format!("{}.md", notice.notice_id),
                &render_dmca_notice(&notice),
                metadata,
            )
            .await?;

        let dmca_tx = self.contracts.file_dmca(infringing_url, &document.cid).await?;
        let violation = self
            .contracts
            .report_violation(original.id, infringing_url, &document.cid, score)
            .await?;

        metrics::record_dmca_filed();
        tracing::info!(
            notice_id = %notice.notice_id,
            original = original.id,
            infringing = %infringing_url,
            similarity = score,
            "DMCA notice filed"
        );

        Ok(DmcaFiling {
            notice_id: notice.notice_id,
            original_repo_id: original.id,
            infringing_url: infringing_url.to_string(),
            similarity_score: score,
            evidence_hash: notice.evidence_hash,
            document,
            dmca_filing: self.tx_summary(&dmca_tx),
            violation_report: self.tx_summary(&violation.tx),
            violation_id: violation.violation_id,
        })
    }

    /// Search for copies of one or all registered repositories and file
    /// notices for those above the similarity threshold.
    pub async fn scan(&self, repo_id: Option<u64>) -> AgentResult<ScanResult> {
        let repos = match repo_id {
            Some(id) => vec![self.repository(id).await?],
            None => self.registered_repositories().await?,
        };
        if repos.is_empty() {
            return Err(AgentError::NoRepositories);
        }
        tracing::info!(repositories = repos.len(), "Scanning for violations");

        let mut result = ScanResult {
            repositories_scanned: repos.len(),
            candidates_compared: 0,
            violations_found: 0,
            dmca_notices_filed: 0,
            filings: Vec::new(),
            errors: Vec::new(),
        };

        for repo in &repos {
            let candidates = match self
                .similarity
                .search_similar(&repo.github_url, &repo.key_features, self.config.github.search_limit)
                .await
            {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::warn!(url = %repo.github_url, error = %e, "Search failed");
                    result.errors.push(format!("{}: search failed: {}", repo.github_url, e));
                    continue;
                }
            };

            for candidate in candidates.iter().filter(|c| **c != repo.github_url) {
                let report = match self.similarity.compare(&repo.github_url, candidate).await {
                    Ok(report) => report,
                    Err(e) => {
                        result.errors.push(format!("{}: comparison failed: {}", candidate, e));
                        continue;
                    }
                };
                result.candidates_compared += 1;

                if report.similarity_score <= self.threshold() {
                    continue;
                }
                result.violations_found += 1;
                match self.file_dmca(repo, candidate, &report).await {
                    Ok(filing) => {
                        result.dmca_notices_filed += 1;
                        result.filings.push(filing);
                    }
                    Err(e) => {
                        tracing::error!(infringing = %candidate, error = %e, "DMCA filing failed");
                        result.errors.push(format!("{}: DMCA filing failed: {}", candidate, e));
                    }
                }
            }
        }

        Ok(result)
    }

    /// Security audit; reports with findings are uploaded as evidence.
    pub async fn audit(&self, url: &str, include_commits: bool) -> AgentResult<AuditOutcome> {
        let url = require_github_repository(url)?.cleaned;
        let audit = self.scanner.audit(&url, include_commits).await?;
        if audit.findings.is_empty() {
            return Ok(AuditOutcome {
                audit,
                evidence: None,
            });
        }

        let metadata = HashMap::from([
            ("type".to_string(), "security_audit_report".to_string()),
            ("repository".to_string(), url.clone()),
            ("findings_count".to_string(), audit.total_findings.to_string()),
            (
                "scan_type".to_string(),
                if include_commits { "comprehensive" } else { "standard" }.to_string(),
            ),
        ]);
        let evidence = self
            .store_document(
                &format!("{}.md", audit.audit_id),
                &render_audit_report(&audit),
                metadata,
            )
            .await?;

        Ok(AuditOutcome {
            audit,
            evidence: Some(evidence),
        })
    }

    /// Report `infringing_url` as a copy of repository `repo_id` and claim the bounty.
    pub async fn report_bounty(
        &self,
        infringing_url: &str,
        repo_id: Option<u64>,
    ) -> AgentResult<BountyReport> {
        let repo_id = repo_id.ok_or(AgentError::RepoIdRequired)?;
        let reporter = self.require_account()?;
        let infringing_url = require_github_repository(infringing_url)?.cleaned;
        let original = self.repository(repo_id).await?;

        if self.contracts.link_record(&infringing_url).await?.exists {
            return Err(AgentError::AlreadyReported(infringing_url));
        }

        let report = self
            .similarity
            .compare(&original.github_url, &infringing_url)
            .await?;
        let score = report.similarity_score;
        if score < self.threshold() {
            return Err(AgentError::SimilarityTooLow {
                score,
                threshold: self.threshold(),
            });
        }

        let dmca = self.file_dmca(&original, &infringing_url, &report).await?;
        let tx = self
            .contracts
            .report_infringement(&infringing_url, &original.ipfs_metadata, &dmca.document.cid)
            .await?;
        let infringement = self.tx_summary(&tx);

        let claim = self.bounties.record_claim(
            &reporter.to_string(),
            &infringing_url,
            repo_id,
            score,
            Some(infringement.tx_hash.clone()),
        );

        Ok(BountyReport {
            claim,
            dmca,
            infringement,
            status: BOUNTY_STATUS_PENDING,
        })
    }

    /// Claimable reward of `address`, or of the signing account.
    pub async fn bounty_balance(&self, address: Option<&str>) -> AgentResult<BountyBalance> {
        let address = match address {
            Some(raw) => raw
                .trim()
                .parse::<Address>()
                .map_err(|_| AgentError::InvalidAddress(raw.to_string()))?,
            None => self.require_account()?,
        };
        let rewards = self.contracts.bounty_rewards(address).await?;
        let key = address.to_string();
        let record = self.bounties.record(&key);

        Ok(BountyBalance {
            claimable_wei: rewards.to_string(),
            claimable_fil: wei_to_fil(rewards),
            tracked_pending_fil: record.as_ref().map(|r| r.pending_fil).unwrap_or(0.0),
            reports: record.map(|r| r.reports).unwrap_or(0),
            address: key,
        })
    }

    pub async fn withdraw_bounty(&self) -> AgentResult<WithdrawResult> {
        let account = self.require_account()?;
        let rewards = self.contracts.bounty_rewards(account).await?;
        if rewards == U256::ZERO {
            return Err(AgentError::NothingToWithdraw);
        }

        let tx = self.contracts.withdraw_bounty().await?;
        let address = account.to_string();
        self.bounties.mark_withdrawn(&address);
        let amount_fil = wei_to_fil(rewards);
        tracing::info!(address = %address, amount_fil, "Bounty withdrawn");

        Ok(WithdrawResult {
            address,
            amount_fil,
            tx: self.tx_summary(&tx),
        })
    }

    pub fn leaderboard(&self) -> Leaderboard {
        Leaderboard {
            reporters: self.bounties.reporter_count(),
            entries: self.bounties.leaderboard(),
        }
    }

    /// Snapshot of every subsystem. Unreachable parts are left out, never fatal.
    pub async fn status(&self) -> StatusReport {
        let client = self.contracts.client();
        let block_number = client.get_block_number().await.ok();
        let balance_fil = match self.contracts.account() {
            Some(_) => self.contracts.account_balance().await.ok().map(wei_to_fil),
            None => None,
        };
        let total_repositories = self.contracts.total_repositories().await.ok();
        let operation_costs = self.contracts.estimate_operation_costs().await.ok();

        StatusReport {
            network: self.network.clone(),
            connected: block_number.is_some(),
            block_number,
            account: self.contracts.account().map(|a| a.to_string()),
            balance_fil,
            total_repositories,
            contracts: *self.contracts.addresses(),
            operation_costs,
            storage: self.storage.service_status().await,
            cache: self.cache.stats(),
            bounty_reporters: self.bounties.reporter_count(),
            llm_model: self
                .similarity
                .analyzer()
                .llm()
                .map(|llm| llm.model().to_string()),
        }
    }

    /// The most recent `limit` repositories, oldest first.
    pub async fn query(&self, limit: usize) -> AgentResult<QueryResult> {
        let total = self.contracts.total_repositories().await?;
        let start = total.saturating_sub(limit as u64) + 1;
        let mut repositories = Vec::new();
        for repo_id in start..=total {
            if let Some(repo) = self.repository_or_skip(repo_id).await {
                repositories.push(repo);
            }
        }
        Ok(QueryResult {
            total_count: total,
            returned_count: repositories.len(),
            repositories,
        })
    }

    /// Register, audit, then scan. Only a failed registration aborts.
    pub async fn workflow(&self, url: &str) -> AgentResult<WorkflowResult> {
        tracing::info!(url, "Step 1: registration");
        let registration = self.register(url, LicenseType::Mit).await?;

        tracing::info!(url, "Step 2: security audit");
        let audit = StepResult::from_result(self.audit(&registration.github_url, true).await);

        tracing::info!(url, "Step 3: violation scan");
        let scan = StepResult::from_result(self.scan(Some(registration.repo_id)).await);

        let steps_failed = [audit.completed().is_none(), scan.completed().is_none()]
            .iter()
            .filter(|failed| **failed)
            .count();
        let summary = WorkflowSummary {
            repo_id: registration.repo_id,
            license_cid: registration.license.cid.clone(),
            security_findings: audit.completed().map(|a| a.audit.total_findings).unwrap_or(0),
            violations_found: scan.completed().map(|s| s.violations_found).unwrap_or(0),
            dmca_notices_filed: scan.completed().map(|s| s.dmca_notices_filed).unwrap_or(0),
            steps_failed,
        };
        tracing::info!(repo_id = summary.repo_id, steps_failed, "Workflow complete");

        Ok(WorkflowResult {
            registration,
            audit,
            scan,
            summary,
        })
    }

    pub async fn validate(&self) -> ValidationReport {
        SetupValidator::new(self.config.clone(), self.secrets.clone())
            .run()
            .await
    }
}
