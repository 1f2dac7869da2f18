//! GitHub REST client.

use std::time::Duration;

use base64::Engine;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::config::GitHubConfig;
use crate::github::types::{
    CommitSummary, ContentResponse, GitHubError, GitHubResult, RepositoryInfo, SearchResponse,
    TreeEntry, TreeResponse,
};

const USER_AGENT: &str = concat!("repo-guardian/", env!("CARGO_PKG_VERSION"));

/// Thin client over the endpoints the agent needs.
#[derive(Clone)]
pub struct GitHubClient {
    http: Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig, token: Option<String>) -> GitHubResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let request = self
            .http
            .get(format!("{}/{}", self.api_url, path.trim_start_matches('/')))
            .header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => request.header("Authorization", format!("token {}", token)),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> GitHubResult<T> {
        let response = self.get(path).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(path = %path, status = %status, "GitHub request failed");
            return Err(GitHubError::Api {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        Ok(response.json().await?)
    }

    pub async fn get_repository(&self, owner: &str, repo: &str) -> GitHubResult<RepositoryInfo> {
        self.get_json(&format!("repos/{}/{}", owner, repo), &[]).await
    }

    /// Recursive tree of the default branch, falling back to `main` then `master`.
    pub async fn get_tree(
        &self,
        owner: &str,
        repo: &str,
        default_branch: Option<&str>,
    ) -> GitHubResult<Vec<TreeEntry>> {
        let mut branches: Vec<&str> = Vec::with_capacity(3);
        if let Some(branch) = default_branch {
            branches.push(branch);
        }
        for fallback in ["main", "master"] {
            if !branches.contains(&fallback) {
                branches.push(fallback);
            }
        }

        for branch in branches {
            let path = format!("repos/{}/{}/git/trees/{}", owner, repo, branch);
            match self
                .get_json::<TreeResponse>(&path, &[("recursive", "1".to_string())])
                .await
            {
                Ok(tree) => {
                    tracing::debug!(owner, repo, branch, entries = tree.tree.len(), "Fetched tree");
                    return Ok(tree.tree);
                }
                Err(GitHubError::Api { status, .. }) => {
                    tracing::debug!(owner, repo, branch, status, "No tree on branch");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(GitHubError::TreeNotFound(format!("{}/{}", owner, repo)))
    }

    /// Decoded UTF-8 file content. `Ok(None)` for binary or undecodable files.
    pub async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> GitHubResult<Option<String>> {
        let body: ContentResponse = self
            .get_json(&format!("repos/{}/{}/contents/{}", owner, repo, path), &[])
            .await?;

        if body.encoding.as_deref() != Some("base64") {
            return Ok(Some(body.content));
        }

        let compact: String = body.content.chars().filter(|c| !c.is_whitespace()).collect();
        let decoded = match base64::engine::general_purpose::STANDARD.decode(compact) {
            Ok(bytes) => bytes,
            Err(_) => return Ok(None),
        };
        Ok(String::from_utf8(decoded).ok())
    }

    pub async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        limit: usize,
    ) -> GitHubResult<Vec<CommitSummary>> {
        let mut commits: Vec<CommitSummary> = self
            .get_json(
                &format!("repos/{}/{}/commits", owner, repo),
                &[("per_page", limit.to_string())],
            )
            .await?;
        commits.truncate(limit);
        Ok(commits)
    }

    /// Full commit message for `sha`.
    pub async fn get_commit_message(&self, owner: &str, repo: &str, sha: &str) -> GitHubResult<String> {
        let commit: CommitSummary = self
            .get_json(&format!("repos/{}/{}/commits/{}", owner, repo, sha), &[])
            .await?;
        Ok(commit.commit.message)
    }

    /// Repository search, best match first.
    pub async fn search_repositories(&self, query: &str, limit: usize) -> GitHubResult<Vec<RepositoryInfo>> {
        let response: SearchResponse = self
            .get_json(
                "search/repositories",
                &[("q", query.to_string()), ("per_page", limit.to_string())],
            )
            .await?;
        let mut items = response.items;
        items.truncate(limit);
        Ok(items)
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_token() {
        let client = GitHubClient::new(&GitHubConfig::default(), Some("ghp_secret".into())).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("authenticated: true"));
    }

    #[test]
    fn test_api_url_trailing_slash() {
        let config = GitHubConfig {
            api_url: "http://localhost:1/".into(),
            ..GitHubConfig::default()
        };
        let client = GitHubClient::new(&config, None).unwrap();
        assert_eq!(client.api_url, "http://localhost:1");
        assert!(!client.is_authenticated());
    }
}
