//! Repository similarity: structure and shingle heuristics, then the model's judgment.
//!
//! ```text
//! structure = |paths_a ∩ paths_b| / |paths_a ∪ paths_b|
//! code      = mean over shared source files of jaccard(5-token shingles)
//! heuristic = 0.3 × structure + 0.7 × code
//! ```
//!
//! When a model is configured and replies with parseable JSON, its
//! `similarity` becomes the decision score as-is.

use std::collections::HashSet;

use crate::analysis::analyzer::RepositoryAnalyzer;
use crate::analysis::llm::extract_json;
use crate::analysis::types::{AnalysisResult, FileMatch, RepoAnalysis, SimilarityReport};
use crate::github::{clean_url, GitHubClient};

pub const STRUCTURE_WEIGHT: f64 = 0.3;
pub const CODE_WEIGHT: f64 = 0.7;
pub const SHINGLE_SIZE: usize = 5;
pub const MAX_EVIDENCE: usize = 5;

const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "ts", "jsx", "tsx", "go", "java", "kt", "c", "h", "cpp", "hpp", "cc", "cs",
    "rb", "php", "swift", "scala", "sol", "sh", "lua", "dart",
];

const JUDGE_ROLE: &str = "You are a software forensics expert. You judge whether one code \
repository was copied from another. Reply only with JSON.";

/// Jaccard index. Two empty sets score 0.
pub fn jaccard<T: Eq + std::hash::Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

pub fn is_source_file(path: &str) -> bool {
    path.rsplit_once('.')
        .map(|(_, ext)| SOURCE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Lowercased tokens with whole-line comments and blank lines removed.
pub fn normalize_tokens(source: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for line in source.lines() {
        let line = line.trim();
        if line.is_empty()
            || line.starts_with("//")
            || line.starts_with('#')
            || line.starts_with("/*")
            || line.starts_with('*')
        {
            continue;
        }

        let mut word = String::new();
        for c in line.chars() {
            if c.is_alphanumeric() || c == '_' {
                word.extend(c.to_lowercase());
            } else {
                if !word.is_empty() {
                    tokens.push(std::mem::take(&mut word));
                }
                if !c.is_whitespace() {
                    tokens.push(c.to_string());
                }
            }
        }
        if !word.is_empty() {
            tokens.push(word);
        }
    }
    tokens
}

/// Overlapping `SHINGLE_SIZE`-token windows. Short inputs form one shingle.
pub fn shingles(tokens: &[String]) -> HashSet<String> {
    if tokens.is_empty() {
        return HashSet::new();
    }
    if tokens.len() < SHINGLE_SIZE {
        return std::iter::once(tokens.join(" ")).collect();
    }
    tokens.windows(SHINGLE_SIZE).map(|w| w.join(" ")).collect()
}

pub fn code_similarity(a: &str, b: &str) -> f64 {
    jaccard(&shingles(&normalize_tokens(a)), &shingles(&normalize_tokens(b)))
}

pub fn structure_similarity(a: &[String], b: &[String]) -> f64 {
    let a: HashSet<&String> = a.iter().collect();
    let b: HashSet<&String> = b.iter().collect();
    jaccard(&a, &b)
}

pub fn heuristic_score(structure: f64, code: f64) -> f64 {
    STRUCTURE_WEIGHT * structure + CODE_WEIGHT * code
}

/// Human-readable verdict for a comparison.
pub fn recommendation(score: f64, registered_matches: usize) -> String {
    let pct = score * 100.0;
    if registered_matches > 0 {
        format!(
            "REGISTERED: {} of the repositories is registered on chain. Similarity: {:.2}%",
            registered_matches, pct
        )
    } else if score > 0.8 {
        format!("HIGH SIMILARITY ({:.2}%): strong evidence of copying. File a DMCA notice.", pct)
    } else if score > 0.6 {
        format!(
            "MODERATE SIMILARITY ({:.2}%): investigate further and consider registering the original.",
            pct
        )
    } else if score > 0.4 {
        format!("LOW SIMILARITY ({:.2}%): minor overlap, likely independent work.", pct)
    } else {
        format!("MINIMAL SIMILARITY ({:.2}%): the repositories appear independent.", pct)
    }
}

pub fn next_actions(score: f64, has_registered_matches: bool) -> Vec<String> {
    let mut actions = Vec::new();
    if score > 0.7 {
        actions.push("Generate and file DMCA notice");
        actions.push("Report violation on chain");
        actions.push("Gather additional evidence");
    }
    if score > 0.5 && !has_registered_matches {
        actions.push("Register original repository on chain");
        actions.push("Generate license documentation");
    }
    if has_registered_matches {
        actions.push("Check existing protection status");
        actions.push("Review license compliance");
    }
    actions.push("Monitor for future violations");
    actions.into_iter().map(String::from).collect()
}

pub struct SimilarityAnalyzer {
    analyzer: RepositoryAnalyzer,
    max_compare_files: usize,
}

impl SimilarityAnalyzer {
    pub fn new(analyzer: RepositoryAnalyzer, max_compare_files: usize) -> Self {
        Self {
            analyzer,
            max_compare_files,
        }
    }

    pub fn analyzer(&self) -> &RepositoryAnalyzer {
        &self.analyzer
    }

    fn github(&self) -> &GitHubClient {
        self.analyzer.github()
    }

    /// Analyze both repositories, then compare them.
    pub async fn compare(&self, original_url: &str, candidate_url: &str) -> AnalysisResult<SimilarityReport> {
        let original = self.analyzer.analyze(original_url).await?;
        let candidate = self.analyzer.analyze(candidate_url).await?;
        self.compare_analyses(&original, &candidate).await
    }

    pub async fn compare_analyses(
        &self,
        original: &RepoAnalysis,
        candidate: &RepoAnalysis,
    ) -> AnalysisResult<SimilarityReport> {
        let a = &original.repo_data;
        let b = &candidate.repo_data;
        let structure = structure_similarity(&a.files, &b.files);

        let candidate_files: HashSet<&String> = b.files.iter().collect();
        let shared: Vec<&String> = a
            .files
            .iter()
            .filter(|f| candidate_files.contains(f) && is_source_file(f))
            .take(self.max_compare_files)
            .collect();

        let mut matches = Vec::with_capacity(shared.len());
        for path in &shared {
            let left = self.github().get_file_content(&a.owner, &a.name, path).await;
            let right = self.github().get_file_content(&b.owner, &b.name, path).await;
            match (left, right) {
                (Ok(Some(left)), Ok(Some(right))) => matches.push(FileMatch {
                    path: (*path).clone(),
                    similarity: code_similarity(&left, &right),
                }),
                (Ok(_), Ok(_)) => {}
                (Err(e), _) | (_, Err(e)) => {
                    tracing::debug!(path = %path, error = %e, "Skipping file in comparison");
                }
            }
        }

        let code = if matches.is_empty() {
            0.0
        } else {
            matches.iter().map(|m| m.similarity).sum::<f64>() / matches.len() as f64
        };
        let heuristic = heuristic_score(structure, code);

        matches.sort_by(|x, y| y.similarity.total_cmp(&x.similarity));
        matches.truncate(MAX_EVIDENCE);

        let mut report = SimilarityReport {
            original_url: a.url.clone(),
            candidate_url: b.url.clone(),
            similarity_score: heuristic,
            structure_similarity: structure,
            code_similarity: code,
            heuristic_score: heuristic,
            llm_confidence: None,
            reasoning: None,
            shared_files: shared.len(),
            evidence: matches,
        };

        if let Some(llm) = self.analyzer.llm() {
            let prompt = judgment_prompt(original, candidate, &report);
            match llm.complete(JUDGE_ROLE, &prompt).await {
                Ok(reply) => apply_judgment(&mut report, &reply),
                Err(e) => tracing::warn!(error = %e, "Model judgment failed, using heuristic score"),
            }
        }

        tracing::info!(
            original = %report.original_url,
            candidate = %report.candidate_url,
            score = report.similarity_score,
            heuristic = report.heuristic_score,
            "Comparison complete"
        );
        Ok(report)
    }

    /// Candidate copies of `url` found by repository search, excluding itself.
    pub async fn search_similar(&self, url: &str, key_features: &[String], limit: usize) -> AnalysisResult<Vec<String>> {
        let cleaned = clean_url(url)?;
        let name = cleaned.repo.clone().unwrap_or_default();
        let query = search_query(&name, key_features);

        let results = self.github().search_repositories(&query, limit).await?;
        let candidates = results
            .into_iter()
            .filter_map(|r| clean_url(&r.html_url).ok())
            .filter(|c| c.is_repository() && c.cleaned != cleaned.cleaned)
            .map(|c| c.cleaned)
            .collect::<Vec<_>>();

        tracing::debug!(url = %cleaned.cleaned, query = %query, found = candidates.len(), "Similar repositories");
        Ok(candidates)
    }
}

/// Repository name plus the first words of the leading key feature.
pub fn search_query(name: &str, key_features: &[String]) -> String {
    let mut terms = vec![name.to_string()];
    if let Some(feature) = key_features.first() {
        terms.extend(
            feature
                .split_whitespace()
                .filter(|w| w.chars().all(|c| c.is_alphanumeric() || c == '-'))
                .take(3)
                .map(str::to_string),
        );
    }
    format!("{} in:name,description,readme", terms.join(" "))
}

fn judgment_prompt(original: &RepoAnalysis, candidate: &RepoAnalysis, report: &SimilarityReport) -> String {
    let evidence = report
        .evidence
        .iter()
        .map(|m| format!("- {} ({:.0}% shingle overlap)", m.path, m.similarity * 100.0))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Original: {}\nSummary: {}\nFeatures: {}\n\n\
         Candidate: {}\nSummary: {}\nFeatures: {}\n\n\
         Structure similarity: {:.2}\nCode similarity: {:.2}\nShared files:\n{}\n\n\
         Reply with JSON: {{\"similarity\": <0.0-1.0>, \"confidence\": <0.0-1.0>, \"reasoning\": \"<short>\"}}",
        original.repo_data.url,
        original.summary,
        original.key_features.join("; "),
        candidate.repo_data.url,
        candidate.summary,
        candidate.key_features.join("; "),
        report.structure_similarity,
        report.code_similarity,
        evidence,
    )
}

/// Adopt the model's score when its reply parses.
pub fn apply_judgment(report: &mut SimilarityReport, reply: &str) {
    let Some(json) = extract_json(reply) else {
        tracing::debug!("Model judgment was not JSON");
        return;
    };
    let Some(similarity) = json["similarity"].as_f64().filter(|s| s.is_finite()) else {
        return;
    };
    report.similarity_score = similarity.clamp(0.0, 1.0);
    report.llm_confidence = json["confidence"].as_f64().map(|c| c.clamp(0.0, 1.0));
    report.reasoning = json["reasoning"].as_str().map(str::to_string);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_report() -> SimilarityReport {
        SimilarityReport {
            original_url: String::new(),
            candidate_url: String::new(),
            similarity_score: 0.4,
            structure_similarity: 0.5,
            code_similarity: 0.35,
            heuristic_score: 0.4,
            llm_confidence: None,
            reasoning: None,
            shared_files: 0,
            evidence: Vec::new(),
        }
    }

    #[test]
    fn test_structure_similarity() {
        let a: Vec<String> = ["a.rs", "b.rs", "c.rs"].map(String::from).to_vec();
        let b: Vec<String> = ["b.rs", "c.rs", "d.rs"].map(String::from).to_vec();
        assert!((structure_similarity(&a, &b) - 0.5).abs() < 1e-9);
        assert_eq!(structure_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_code_similarity_ignores_comments_and_whitespace() {
        let a = "fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n";
        let b = "// helper\nfn add(a: i32,   b: i32) -> i32 {\n\n  a + b\n}";
        assert!((code_similarity(a, b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_code_similarity_distinct_sources() {
        let a = "fn add(a: i32, b: i32) -> i32 { a + b }";
        let b = "class Parser: def parse(self, text): return text.split()";
        assert!(code_similarity(a, b) < 0.05);
    }

    #[test]
    fn test_short_input_single_shingle() {
        let tokens = normalize_tokens("let x");
        assert_eq!(tokens, vec!["let", "x"]);
        assert_eq!(shingles(&tokens).len(), 1);
        assert!(shingles(&[]).is_empty());
    }

    #[test]
    fn test_heuristic_weights() {
        assert!((heuristic_score(1.0, 0.0) - 0.3).abs() < 1e-9);
        assert!((heuristic_score(0.0, 1.0) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_source_file_filter() {
        assert!(is_source_file("src/lib.rs"));
        assert!(is_source_file("contracts/Token.SOL"));
        assert!(!is_source_file("README.md"));
        assert!(!is_source_file("Makefile"));
    }

    #[test]
    fn test_recommendation_thresholds() {
        assert!(recommendation(0.85, 0).starts_with("HIGH"));
        assert!(recommendation(0.7, 0).starts_with("MODERATE"));
        assert!(recommendation(0.5, 0).starts_with("LOW"));
        assert!(recommendation(0.1, 0).starts_with("MINIMAL"));
        assert!(recommendation(0.1, 1).starts_with("REGISTERED"));
    }

    #[test]
    fn test_next_actions() {
        let high = next_actions(0.9, false);
        assert!(high.contains(&"Generate and file DMCA notice".to_string()));
        assert!(high.contains(&"Register original repository on chain".to_string()));
        assert_eq!(high.last().map(String::as_str), Some("Monitor for future violations"));

        let registered = next_actions(0.6, true);
        assert!(!registered.contains(&"Register original repository on chain".to_string()));
        assert!(registered.contains(&"Review license compliance".to_string()));

        assert_eq!(next_actions(0.1, false), vec!["Monitor for future violations"]);
    }

    #[test]
    fn test_apply_judgment_trusts_model() {
        let mut report = empty_report();
        apply_judgment(
            &mut report,
            r#"{"similarity": 0.92, "confidence": 0.8, "reasoning": "same layout"}"#,
        );
        assert!((report.similarity_score - 0.92).abs() < 1e-9);
        assert!((report.heuristic_score - 0.4).abs() < 1e-9);
        assert_eq!(report.reasoning.as_deref(), Some("same layout"));
    }

    #[test]
    fn test_apply_judgment_keeps_heuristic_on_garbage() {
        let mut report = empty_report();
        apply_judgment(&mut report, "I think they are similar");
        assert!((report.similarity_score - 0.4).abs() < 1e-9);
        apply_judgment(&mut report, r#"{"similarity": "high"}"#);
        assert!((report.similarity_score - 0.4).abs() < 1e-9);
        assert!(report.llm_confidence.is_none());
    }

    #[test]
    fn test_search_query() {
        let features = vec!["Async HTTP client".to_string()];
        assert_eq!(
            search_query("widget", &features),
            "widget Async HTTP client in:name,description,readme"
        );
        assert_eq!(search_query("widget", &[]), "widget in:name,description,readme");
    }
}
