//! Analysis results and errors.

use serde::Serialize;
use thiserror::Error;

use crate::github::GitHubError;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("GitHub error: {0}")]
    GitHub(#[from] GitHubError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("No API key configured for the hosted model")]
    MissingApiKey,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Repository metadata captured for hashing and prompting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepoData {
    pub url: String,
    pub owner: String,
    pub name: String,
    pub description: String,
    pub language: String,
    pub created_at: String,
    pub size: u64,
    pub stars: u64,
    pub forks: u64,
    pub default_branch: Option<String>,
    /// At most 50 file paths from the tree.
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepoAnalysis {
    pub repo_data: RepoData,
    pub key_features: Vec<String>,
    pub summary: String,
}

/// A shared file and how alike the two copies are.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FileMatch {
    pub path: String,
    pub similarity: f64,
}

/// Outcome of comparing two repositories.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityReport {
    pub original_url: String,
    pub candidate_url: String,
    /// Score used for decisions: the model's when it answered, the heuristic otherwise.
    pub similarity_score: f64,
    pub structure_similarity: f64,
    pub code_similarity: f64,
    pub heuristic_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub shared_files: usize,
    /// Top matching files, best first.
    pub evidence: Vec<FileMatch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Secret,
    SecurityIssue,
}

#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub pattern_name: String,
    pub severity: Severity,
    pub description: String,
    pub recommendation: String,
    pub file_path: String,
    /// 1-based.
    pub line_number: usize,
    pub matched_text: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn tally(findings: &[Finding]) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            match finding.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub audit_id: String,
    pub timestamp: String,
    pub url: String,
    pub files_scanned: usize,
    pub commits_scanned: usize,
    pub total_findings: usize,
    pub severity: SeverityCounts,
    pub findings: Vec<Finding>,
    pub summary: String,
}

/// Everything a DMCA notice states.
#[derive(Debug, Clone, Serialize)]
pub struct DmcaNotice {
    pub notice_id: String,
    pub timestamp: String,
    pub original_repo_id: u64,
    pub original_url: String,
    pub owner: String,
    pub license_type: String,
    pub infringing_url: String,
    pub similarity_score: f64,
    pub evidence: Vec<FileMatch>,
    pub evidence_hash: String,
}
