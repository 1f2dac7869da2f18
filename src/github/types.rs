//! GitHub API types and errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("Invalid URL input")]
    InvalidInput,

    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Not a GitHub repository URL: {0}")]
    NotARepository(String),

    #[error("GitHub API returned {status} for {path}")]
    Api { status: u16, path: String },

    #[error("Repository tree not found on any branch: {0}")]
    TreeNotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type GitHubResult<T> = Result<T, GitHubError>;

/// Subset of `GET /repos/{owner}/{repo}`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RepositoryInfo {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl TreeEntry {
    pub fn is_blob(&self) -> bool {
        self.kind == "blob"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TreeResponse {
    #[serde(default)]
    pub tree: Vec<TreeEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ContentResponse {
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub content: String,
}

/// One entry of `GET /repos/{owner}/{repo}/commits`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommitSummary {
    pub sha: String,
    pub url: String,
    #[serde(default)]
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub items: Vec<RepositoryInfo>,
}
