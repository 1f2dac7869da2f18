//! In-memory bounty ledger.
//!
//! The contract tracks the claimable reward. The ledger keeps the per-reporter
//! history the contract does not expose: what was reported and when.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

use crate::observability::metrics;

/// Base reward per confirmed report, in tFIL.
pub const BASE_BOUNTY_FIL: f64 = 1.0;
/// The similarity multiplier is capped at this value.
pub const MAX_MULTIPLIER: f64 = 2.0;
/// Leaderboard length.
pub const LEADERBOARD_SIZE: usize = 10;

/// Reward for a report at `similarity` (0.0 - 1.0).
pub fn bounty_amount(similarity: f64) -> f64 {
    BASE_BOUNTY_FIL * (2.0 * similarity.clamp(0.0, 1.0)).min(MAX_MULTIPLIER)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BountyClaim {
    pub claim_id: String,
    pub reporter: String,
    pub infringing_url: String,
    pub original_repo_id: u64,
    pub similarity_score: f64,
    pub amount_fil: f64,
    pub tx_hash: Option<String>,
    pub timestamp: String,
    pub withdrawn: bool,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ReporterRecord {
    pub reporter: String,
    pub reports: u64,
    pub pending_fil: f64,
    pub withdrawn_fil: f64,
    pub claims: Vec<BountyClaim>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub reporter: String,
    pub reports: u64,
    pub total_earned_fil: f64,
}

/// Claims keyed by reporter address (lowercase hex).
#[derive(Clone, Default)]
pub struct BountyLedger {
    inner: Arc<DashMap<String, ReporterRecord>>,
}

impl BountyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_claim(
        &self,
        reporter: &str,
        infringing_url: &str,
        original_repo_id: u64,
        similarity_score: f64,
        tx_hash: Option<String>,
    ) -> BountyClaim {
        let key = reporter.to_lowercase();
        let claim = BountyClaim {
            claim_id: format!("bounty_{}", uuid::Uuid::new_v4().simple()),
            reporter: key.clone(),
            infringing_url: infringing_url.to_string(),
            original_repo_id,
            similarity_score,
            amount_fil: bounty_amount(similarity_score),
            tx_hash,
            timestamp: chrono::Utc::now().to_rfc3339(),
            withdrawn: false,
        };

        let mut entry = self.inner.entry(key.clone()).or_insert_with(|| ReporterRecord {
            reporter: key,
            ..Default::default()
        });
        entry.reports += 1;
        entry.pending_fil += claim.amount_fil;
        entry.claims.push(claim.clone());

        metrics::record_bounty_claim();
        tracing::info!(
            reporter = %claim.reporter,
            amount_fil = claim.amount_fil,
            url = %claim.infringing_url,
            "Bounty claim recorded"
        );
        claim
    }

    pub fn record(&self, reporter: &str) -> Option<ReporterRecord> {
        self.inner
            .get(&reporter.to_lowercase())
            .map(|r| r.value().clone())
    }

    /// Pending amount tracked locally, in tFIL.
    pub fn pending(&self, reporter: &str) -> f64 {
        self.record(reporter).map(|r| r.pending_fil).unwrap_or(0.0)
    }

    /// Marks every open claim as paid out. Returns the amount moved.
    pub fn mark_withdrawn(&self, reporter: &str) -> f64 {
        let Some(mut entry) = self.inner.get_mut(&reporter.to_lowercase()) else {
            return 0.0;
        };
        let amount = entry.pending_fil;
        for claim in entry.claims.iter_mut() {
            claim.withdrawn = true;
        }
        entry.withdrawn_fil += amount;
        entry.pending_fil = 0.0;
        amount
    }

    /// Top reporters by report count, then by earnings.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut records: Vec<ReporterRecord> =
            self.inner.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| {
            b.reports.cmp(&a.reports).then_with(|| {
                let ea = a.pending_fil + a.withdrawn_fil;
                let eb = b.pending_fil + b.withdrawn_fil;
                eb.partial_cmp(&ea).unwrap_or(std::cmp::Ordering::Equal)
            })
        });
        records
            .into_iter()
            .take(LEADERBOARD_SIZE)
            .enumerate()
            .map(|(i, r)| LeaderboardEntry {
                rank: i + 1,
                reporter: r.reporter,
                reports: r.reports,
                total_earned_fil: r.pending_fil + r.withdrawn_fil,
            })
            .collect()
    }

    pub fn reporter_count(&self) -> usize {
        self.inner.len()
    }
}
