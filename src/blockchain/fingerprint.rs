//! Deterministic identifiers stored on chain alongside a repository.

use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};

/// Maximum key features stored per repository.
pub const MAX_KEY_FEATURES: usize = 5;
/// Maximum characters per stored key feature.
pub const MAX_FEATURE_CHARS: usize = 100;

/// Fields that identify a repository snapshot.
#[derive(Debug, Clone, Copy)]
pub struct RepoIdentity<'a> {
    pub url: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub language: &'a str,
    pub created_at: &'a str,
    pub files: &'a [String],
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// sha256 over canonical (sorted-key) JSON of the identity and its first ten files.
pub fn repo_hash(identity: &RepoIdentity<'_>) -> String {
    let mut files: Vec<&String> = identity.files.iter().take(10).collect();
    files.sort();

    // serde_json maps are ordered by key, so this serialization is canonical.
    let canonical = json!({
        "url": identity.url,
        "name": identity.name,
        "description": identity.description,
        "language": identity.language,
        "created_at": identity.created_at,
        "files": files,
    });
    sha256_hex(canonical.to_string().as_bytes())
}

/// sha256 of `url:created_at:size`.
pub fn fingerprint(url: &str, created_at: &str, size: u64) -> String {
    sha256_hex(format!("{}:{}:{}", url, created_at, size).as_bytes())
}

/// Trim free-form features to what the contract stores.
pub fn format_key_features<S: AsRef<str>>(features: &[S]) -> Vec<String> {
    features
        .iter()
        .map(|f| f.as_ref().trim())
        .filter(|f| !f.is_empty())
        .take(MAX_KEY_FEATURES)
        .map(|f| f.chars().take(MAX_FEATURE_CHARS).collect())
        .collect()
}

/// Split newline separated text into stored features.
pub fn key_features_from_text(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(|l| l.trim().trim_start_matches(['-', '*', '•']).trim())
        .collect();
    format_key_features(&lines)
}

/// Similarity in [0, 1] as an integer percentage for the contract.
pub fn similarity_to_int(similarity: f64) -> u64 {
    if !similarity.is_finite() {
        return 0;
    }
    (similarity * 100.0).clamp(0.0, 100.0) as u64
}

/// sha256 of the violation evidence (top five items).
pub fn evidence_hash<T: Serialize>(
    violating_url: &str,
    similarity: f64,
    timestamp: &str,
    evidence: &[T],
) -> String {
    let top: Vec<&T> = evidence.iter().take(5).collect();
    let canonical = json!({
        "violating_url": violating_url,
        "similarity_score": similarity,
        "timestamp": timestamp,
        "evidence": top,
    });
    sha256_hex(canonical.to_string().as_bytes())
}
