//! Analysis subsystem.
//!
//! # Data Flow
//! ```text
//! GitHub URL
//!     → analyzer.rs (metadata, file list, key features, summary)
//!     → similarity.rs (structure + shingle heuristics, model judgment)
//!     → scanner.rs (secrets and anti-patterns, audit summary)
//!     → documents.rs (license, DMCA notice, audit report as Markdown)
//! ```
//!
//! The language model is optional. Every step has a deterministic result
//! without one.

pub mod analyzer;
pub mod documents;
pub mod llm;
pub mod scanner;
pub mod similarity;
pub mod types;

pub use analyzer::RepositoryAnalyzer;
pub use documents::{
    render_audit_report, render_dmca_notice, render_license, write_document, LicenseType,
};
pub use llm::LlmClient;
pub use scanner::{scan_content, SecurityScanner};
pub use similarity::{next_actions, recommendation, SimilarityAnalyzer};
pub use types::{
    AnalysisError, AnalysisResult, AuditReport, DmcaNotice, FileMatch, Finding, RepoAnalysis,
    RepoData, Severity, SimilarityReport,
};
