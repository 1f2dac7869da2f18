//! Repository metadata and key-feature extraction.

use std::collections::BTreeSet;

use crate::analysis::llm::{extract_json, LlmClient};
use crate::analysis::types::{AnalysisResult, RepoAnalysis, RepoData};
use crate::blockchain::fingerprint::{format_key_features, key_features_from_text};
use crate::github::{require_github_repository, GitHubClient};

/// File paths kept per analysis.
pub const MAX_ANALYSIS_FILES: usize = 50;

const ANALYST_ROLE: &str = "You are a software analyst. You describe what makes a code \
repository distinctive so that copies of it can be recognised.";

pub struct RepositoryAnalyzer {
    github: GitHubClient,
    llm: Option<LlmClient>,
}

impl RepositoryAnalyzer {
    pub fn new(github: GitHubClient, llm: Option<LlmClient>) -> Self {
        Self { github, llm }
    }

    pub fn github(&self) -> &GitHubClient {
        &self.github
    }

    pub fn llm(&self) -> Option<&LlmClient> {
        self.llm.as_ref()
    }

    /// Metadata, file list, key features and a summary for a GitHub repository.
    pub async fn analyze(&self, url: &str) -> AnalysisResult<RepoAnalysis> {
        let repo_data = self.fetch_repo_data(url).await?;

        let (key_features, summary) = match &self.llm {
            Some(llm) => match self.describe(llm, &repo_data).await {
                Ok(described) => described,
                Err(e) => {
                    tracing::warn!(url = %repo_data.url, error = %e, "Model analysis failed, using heuristics");
                    heuristic_description(&repo_data)
                }
            },
            None => heuristic_description(&repo_data),
        };

        tracing::info!(
            url = %repo_data.url,
            files = repo_data.files.len(),
            features = key_features.len(),
            "Repository analyzed"
        );

        Ok(RepoAnalysis {
            repo_data,
            key_features,
            summary,
        })
    }

    /// Metadata and up to [`MAX_ANALYSIS_FILES`] blob paths.
    pub async fn fetch_repo_data(&self, url: &str) -> AnalysisResult<RepoData> {
        let cleaned = require_github_repository(url)?;
        let owner = cleaned.owner.clone().unwrap_or_default();
        let name = cleaned.repo.clone().unwrap_or_default();

        let info = self.github.get_repository(&owner, &name).await?;
        let files = match self
            .github
            .get_tree(&owner, &name, info.default_branch.as_deref())
            .await
        {
            Ok(tree) => tree
                .into_iter()
                .filter(|e| e.is_blob())
                .map(|e| e.path)
                .take(MAX_ANALYSIS_FILES)
                .collect(),
            Err(e) => {
                tracing::warn!(url = %cleaned.cleaned, error = %e, "Tree unavailable");
                Vec::new()
            }
        };

        Ok(RepoData {
            url: cleaned.cleaned,
            owner,
            name: info.name,
            description: info.description.unwrap_or_default(),
            language: info.language.unwrap_or_default(),
            created_at: info.created_at.unwrap_or_default(),
            size: info.size,
            stars: info.stargazers_count,
            forks: info.forks_count,
            default_branch: info.default_branch,
            files,
        })
    }

    async fn describe(&self, llm: &LlmClient, data: &RepoData) -> AnalysisResult<(Vec<String>, String)> {
        let prompt = format!(
            "Repository: {url}\nDescription: {description}\nLanguage: {language}\n\
             Files:\n{files}\n\n\
             Reply with JSON: {{\"summary\": \"<two sentences>\", \"key_features\": [\"<feature>\", ...]}} \
             listing at most 5 distinctive features.",
            url = data.url,
            description = data.description,
            language = data.language,
            files = data.files.join("\n"),
        );
        let reply = llm.complete(ANALYST_ROLE, &prompt).await?;

        if let Some(json) = extract_json(&reply) {
            let features: Vec<String> = json["key_features"]
                .as_array()
                .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default();
            let summary = json["summary"].as_str().unwrap_or_default().to_string();
            if !features.is_empty() {
                return Ok((format_key_features(&features), summary));
            }
        }

        let features = key_features_from_text(&reply);
        let summary = reply.lines().next().unwrap_or_default().trim().to_string();
        Ok((features, summary))
    }
}

/// Features and summary without a model: language, description and top-level directories.
pub fn heuristic_description(data: &RepoData) -> (Vec<String>, String) {
    let mut features = Vec::new();
    if !data.language.is_empty() {
        features.push(format!("Written in {}", data.language));
    }
    if !data.description.is_empty() {
        features.push(data.description.clone());
    }
    let top_dirs: BTreeSet<&str> = data
        .files
        .iter()
        .filter_map(|f| f.split_once('/').map(|(dir, _)| dir))
        .collect();
    for dir in top_dirs {
        features.push(format!("{}/ module", dir));
    }

    let summary = if data.description.is_empty() {
        format!("{} repository with {} files", data.name, data.files.len())
    } else {
        format!("{}: {}", data.name, data.description)
    };
    (format_key_features(&features), summary)
}
