//! Secret and anti-pattern scanning over repository files and commit messages.

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

use crate::analysis::llm::LlmClient;
use crate::analysis::types::{
    AnalysisResult, AuditReport, Finding, FindingKind, Severity, SeverityCounts,
};
use crate::github::{require_github_repository, GitHubClient};

pub const SECRET_MATCH_CHARS: usize = 50;
pub const ISSUE_MATCH_CHARS: usize = 100;
pub const FALLBACK_SUMMARY: &str = "Security audit completed. Manual review of findings recommended.";
const CLEAN_SUMMARY: &str = "No security findings.";

const AUDITOR_ROLE: &str = "You are an application security auditor. Summarize audit findings \
and give the top recommendations in a few sentences.";

struct Pattern {
    name: &'static str,
    kind: FindingKind,
    severity: Severity,
    description: &'static str,
    recommendation: &'static str,
    regex: Regex,
}

/// (name, severity, case-insensitive, pattern, description, recommendation)
const SECRET_RULES: &[(&str, Severity, bool, &str, &str, &str)] = &[
    (
        "aws_access_key",
        Severity::Critical,
        false,
        r"AKIA[0-9A-Z]{16}",
        "AWS access key ID",
        "Revoke the key in IAM and load credentials from the environment",
    ),
    (
        "github_token",
        Severity::Critical,
        false,
        r"(?:gh[pousr]_[A-Za-z0-9]{36}|github_pat_[A-Za-z0-9_]{22,})",
        "GitHub access token",
        "Revoke the token in GitHub settings",
    ),
    (
        "private_key",
        Severity::Critical,
        false,
        r"-----BEGIN (?:RSA |EC |DSA |OPENSSH |PGP )?PRIVATE KEY-----",
        "Private key block",
        "Remove the key from the repository and rotate it",
    ),
    (
        "ethereum_private_key",
        Severity::Critical,
        true,
        r#"(?:private[_-]?key|priv[_-]?key)\s*[:=]\s*["']?(?:0x)?[0-9a-f]{64}"#,
        "Ethereum private key",
        "Move funds to a fresh account and keep keys out of source",
    ),
    (
        "openai_api_key",
        Severity::High,
        false,
        r"sk-[A-Za-z0-9_-]{20,}",
        "OpenAI API key",
        "Revoke the key in the OpenAI dashboard",
    ),
    (
        "slack_token",
        Severity::High,
        false,
        r"xox[baprs]-[A-Za-z0-9-]{10,}",
        "Slack token",
        "Revoke the token in the Slack admin console",
    ),
    (
        "generic_api_key",
        Severity::Medium,
        true,
        r#"(?:api[_-]?key|apikey|secret[_-]?key|access[_-]?token)\s*[:=]\s*["'][A-Za-z0-9_\-]{16,}["']"#,
        "Hardcoded API key",
        "Load the value from configuration or the environment",
    ),
    (
        "jwt",
        Severity::Medium,
        false,
        r"eyJ[A-Za-z0-9_-]{10,}\.eyJ[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}",
        "JSON Web Token",
        "Do not commit issued tokens",
    ),
];

const ISSUE_RULES: &[(&str, Severity, &str, &str)] = &[
    (
        "sql_injection",
        Severity::High,
        r"(SELECT|INSERT|UPDATE|DELETE).*(\+|%s|\$\{)",
        "Potential SQL injection vulnerability",
    ),
    (
        "command_injection",
        Severity::High,
        r"(exec|system|shell_exec|eval)\s*\(",
        "Potential command injection vulnerability",
    ),
    (
        "hardcoded_password",
        Severity::Medium,
        r#"(password|passwd|pwd)\s*=\s*["'][^"']{3,}["']"#,
        "Hardcoded password detected",
    ),
    (
        "debug_code",
        Severity::Low,
        r"(console\.log|print\(|debug|TODO|FIXME)",
        "Debug code or TODO comments found",
    ),
];

const PLACEHOLDER_MARKERS: &[&str] = &[
    "example", "your_", "your-", "xxxx", "placeholder", "dummy", "sample", "changeme", "<", "fake",
    "redacted",
];

fn compile(pattern: &str, case_insensitive: bool) -> Option<Regex> {
    match RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .multi_line(true)
        .build()
    {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(pattern, error = %e, "Invalid scan pattern");
            None
        }
    }
}

fn secret_patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        SECRET_RULES
            .iter()
            .filter_map(|&(name, severity, case_insensitive, pattern, description, recommendation)| {
                let regex = compile(pattern, case_insensitive)?;
                Some(Pattern {
                    name,
                    kind: FindingKind::Secret,
                    severity,
                    description,
                    recommendation,
                    regex,
                })
            })
            .collect()
    })
}

fn issue_patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        ISSUE_RULES
            .iter()
            .filter_map(|&(name, severity, pattern, description)| {
                Some(Pattern {
                    name,
                    kind: FindingKind::SecurityIssue,
                    severity,
                    description,
                    recommendation: "",
                    regex: compile(pattern, true)?,
                })
            })
            .collect()
    })
}

/// False for documentation placeholders and low-entropy filler.
pub fn is_likely_real_secret(matched: &str) -> bool {
    let lower = matched.to_ascii_lowercase();
    if PLACEHOLDER_MARKERS.iter().any(|m| lower.contains(m)) {
        return false;
    }
    let mut distinct: Vec<char> = lower.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    distinct.sort_unstable();
    distinct.dedup();
    distinct.len() >= 6
}

fn truncate_match(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_string()
    }
}

fn line_of(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count() + 1
}

fn scan_with(patterns: &[Pattern], content: &str, path: &str, max_chars: usize) -> Vec<Finding> {
    let mut findings = Vec::new();
    for pattern in patterns {
        for m in pattern.regex.find_iter(content) {
            if pattern.kind == FindingKind::Secret && !is_likely_real_secret(m.as_str()) {
                continue;
            }
            let recommendation = if pattern.recommendation.is_empty() {
                format!("Review and remediate {}", pattern.name)
            } else {
                pattern.recommendation.to_string()
            };
            findings.push(Finding {
                kind: pattern.kind,
                pattern_name: pattern.name.to_string(),
                severity: pattern.severity,
                description: pattern.description.to_string(),
                recommendation,
                file_path: path.to_string(),
                line_number: line_of(content, m.start()),
                matched_text: truncate_match(m.as_str(), max_chars),
            });
        }
    }
    findings
}

/// Secret findings only.
pub fn scan_secrets(content: &str, path: &str) -> Vec<Finding> {
    scan_with(secret_patterns(), content, path, SECRET_MATCH_CHARS)
}

/// Secrets and anti-patterns in one file.
pub fn scan_content(content: &str, path: &str) -> Vec<Finding> {
    let mut findings = scan_secrets(content, path);
    findings.extend(scan_with(issue_patterns(), content, path, ISSUE_MATCH_CHARS));
    findings
}

pub struct SecurityScanner {
    github: GitHubClient,
    llm: Option<LlmClient>,
    max_files: usize,
    max_commits: usize,
}

impl SecurityScanner {
    pub fn new(github: GitHubClient, llm: Option<LlmClient>, max_files: usize, max_commits: usize) -> Self {
        Self {
            github,
            llm,
            max_files,
            max_commits,
        }
    }

    /// Scan up to `max_files` blobs and, when asked, recent commit messages.
    pub async fn audit(&self, url: &str, include_commits: bool) -> AnalysisResult<AuditReport> {
        let cleaned = require_github_repository(url)?;
        let owner = cleaned.owner.clone().unwrap_or_default();
        let repo = cleaned.repo.clone().unwrap_or_default();
        tracing::info!(url = %cleaned.cleaned, include_commits, "Starting security audit");

        let default_branch = match self.github.get_repository(&owner, &repo).await {
            Ok(info) => info.default_branch,
            Err(e) => {
                tracing::debug!(error = %e, "Repository metadata unavailable");
                None
            }
        };

        let mut findings = Vec::new();
        let mut files_scanned = 0;
        match self.github.get_tree(&owner, &repo, default_branch.as_deref()).await {
            Ok(tree) => {
                for entry in tree.iter().filter(|e| e.is_blob()).take(self.max_files) {
                    files_scanned += 1;
                    match self.github.get_file_content(&owner, &repo, &entry.path).await {
                        Ok(Some(content)) => findings.extend(scan_content(&content, &entry.path)),
                        Ok(None) => tracing::debug!(path = %entry.path, "Skipping binary file"),
                        Err(e) => tracing::debug!(path = %entry.path, error = %e, "File unavailable"),
                    }
                }
            }
            Err(e) => tracing::warn!(url = %cleaned.cleaned, error = %e, "Could not list files"),
        }

        let mut commits_scanned = 0;
        if include_commits {
            match self.github.list_commits(&owner, &repo, self.max_commits).await {
                Ok(commits) => {
                    for commit in commits {
                        let message = if commit.commit.message.is_empty() {
                            match self.github.get_commit_message(&owner, &repo, &commit.sha).await {
                                Ok(message) => message,
                                Err(e) => {
                                    tracing::debug!(sha = %commit.sha, error = %e, "Commit unavailable");
                                    continue;
                                }
                            }
                        } else {
                            commit.commit.message
                        };
                        let short: String = commit.sha.chars().take(8).collect();
                        findings.extend(scan_secrets(&message, &format!("commit:{}", short)));
                        commits_scanned += 1;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Could not list commits"),
            }
        }

        let severity = SeverityCounts::tally(&findings);
        let mut report = AuditReport {
            audit_id: format!("audit_{}", uuid::Uuid::new_v4().simple()),
            timestamp: chrono::Utc::now().to_rfc3339(),
            url: cleaned.cleaned,
            files_scanned,
            commits_scanned,
            total_findings: findings.len(),
            severity,
            findings,
            summary: CLEAN_SUMMARY.to_string(),
        };
        if report.total_findings > 0 {
            report.summary = self.summarize(&report).await;
        }

        tracing::info!(
            url = %report.url,
            files = report.files_scanned,
            commits = report.commits_scanned,
            findings = report.total_findings,
            critical = report.severity.critical,
            "Security audit complete"
        );
        Ok(report)
    }

    async fn summarize(&self, report: &AuditReport) -> String {
        let Some(llm) = &self.llm else {
            return FALLBACK_SUMMARY.to_string();
        };

        let samples = report
            .findings
            .iter()
            .take(5)
            .map(|f| format!("- {}: {} in {}", f.severity.as_str().to_uppercase(), f.description, f.file_path))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Repository: {}\nTotal findings: {}\nCritical: {}\nHigh: {}\nMedium: {}\nLow: {}\n\n\
             Sample findings:\n{}",
            report.url,
            report.total_findings,
            report.severity.critical,
            report.severity.high,
            report.severity.medium,
            report.severity.low,
            samples
        );

        match llm.complete(AUDITOR_ROLE, &prompt).await {
            Ok(summary) if !summary.is_empty() => summary,
            Ok(_) => FALLBACK_SUMMARY.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Audit summary failed");
                FALLBACK_SUMMARY.to_string()
            }
        }
    }
}
