//! GitHub subsystem: URL cleaning and the REST client used for
//! analysis, audits and similarity search.

pub mod client;
pub mod repo_url;
pub mod types;

pub use client::GitHubClient;
pub use repo_url::{
    api_url, clean_url, extract_urls_from_text, normalize_github_url, require_github_repository,
    CleanedUrl, Platform, UrlKind,
};
pub use types::{CommitSummary, GitHubError, GitHubResult, RepositoryInfo, TreeEntry};
