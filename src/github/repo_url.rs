//! Repository URL cleaning and validation.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::github::types::{GitHubError, GitHubResult};

/// Hosting platforms recognised by [`clean_url`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    GitHub,
    GitLab,
    Bitbucket,
}

impl Platform {
    pub fn host(&self) -> &'static str {
        match self {
            Platform::GitHub => "github.com",
            Platform::GitLab => "gitlab.com",
            Platform::Bitbucket => "bitbucket.org",
        }
    }

    fn from_host(host: &str) -> Option<Self> {
        let host = host.strip_prefix("www.").unwrap_or(host);
        [Platform::GitHub, Platform::GitLab, Platform::Bitbucket]
            .into_iter()
            .find(|p| p.host() == host)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlKind {
    Repository,
    User,
    Unknown,
}

/// Result of URL cleaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanedUrl {
    pub original: String,
    pub cleaned: String,
    pub platform: Platform,
    pub kind: UrlKind,
    pub owner: Option<String>,
    pub repo: Option<String>,
}

impl CleanedUrl {
    pub fn is_repository(&self) -> bool {
        self.kind == UrlKind::Repository
    }

    /// `owner/repo` for repository URLs.
    pub fn full_name(&self) -> Option<String> {
        match (&self.owner, &self.repo) {
            (Some(owner), Some(repo)) => Some(format!("{}/{}", owner, repo)),
            _ => None,
        }
    }
}

/// Clean and classify a repository or profile URL.
///
/// `github.com/a/b.git`, `www.github.com/a/b/` and `https://github.com/a/b?tab=x`
/// all clean to `https://github.com/a/b`.
pub fn clean_url(input: &str) -> GitHubResult<CleanedUrl> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(GitHubError::InvalidInput);
    }

    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else if trimmed.contains('.') {
        format!("https://{}", trimmed)
    } else {
        return Err(GitHubError::InvalidFormat(trimmed.to_string()));
    };

    let parsed = url::Url::parse(&with_scheme)
        .map_err(|_| GitHubError::InvalidFormat(trimmed.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| GitHubError::InvalidFormat(trimmed.to_string()))?
        .to_ascii_lowercase();
    let platform =
        Platform::from_host(&host).ok_or_else(|| GitHubError::UnsupportedPlatform(host.clone()))?;

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let (kind, owner, repo, cleaned) = match segments.as_slice() {
        [owner, repo] => {
            let repo = repo.strip_suffix(".git").unwrap_or(repo);
            (
                UrlKind::Repository,
                Some(owner.to_string()),
                Some(repo.to_string()),
                format!("https://{}/{}/{}", platform.host(), owner, repo),
            )
        }
        [owner] if platform == Platform::GitHub => (
            UrlKind::User,
            Some(owner.to_string()),
            None,
            format!("https://{}/{}", platform.host(), owner),
        ),
        _ => (UrlKind::Unknown, None, None, with_scheme.clone()),
    };

    Ok(CleanedUrl {
        original: with_scheme,
        cleaned,
        platform,
        kind,
        owner,
        repo,
    })
}

/// Cleaned URL, rejecting anything but a GitHub repository.
pub fn require_github_repository(input: &str) -> GitHubResult<CleanedUrl> {
    let cleaned = clean_url(input)?;
    if cleaned.platform != Platform::GitHub || !cleaned.is_repository() {
        return Err(GitHubError::NotARepository(cleaned.cleaned));
    }
    Ok(cleaned)
}

fn normalize_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"(?i)github\.com/([^/]+)/([^/]+)\.git", "github.com/$1/$2"),
            (r"(?i)github\.com/([^/]+)/([^/]+)/.*", "github.com/$1/$2"),
            (r"(?i)www\.github\.com", "github.com"),
        ]
        .into_iter()
        .filter_map(|(p, r)| Regex::new(p).ok().map(|re| (re, r)))
        .collect()
    })
}

/// Lenient rewrite for GitHub URLs that keeps unrecognised input intact.
pub fn normalize_github_url(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    let mut cleaned = url.to_string();
    for (pattern, replacement) in normalize_patterns() {
        cleaned = pattern.replace_all(&cleaned, *replacement).into_owned();
    }
    if !cleaned.starts_with("http://") && !cleaned.starts_with("https://") {
        cleaned = format!("https://{}", cleaned);
    }
    cleaned
}

/// Every supported-platform URL in free text, cleaned.
pub fn extract_urls_from_text(text: &str) -> Vec<String> {
    static URL_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = URL_RE
        .get_or_init(|| Regex::new(r"(?i)https?://[-\w.]+(?::\d+)?(?:/[\w/_.\-]*)?").ok())
        .as_ref()
    else {
        return Vec::new();
    };

    re.find_iter(text)
        .filter_map(|m| clean_url(m.as_str().trim_end_matches('.')).ok())
        .map(|c| c.cleaned)
        .collect()
}

/// REST endpoint for a repository URL. GitHub and GitLab only.
pub fn api_url(input: &str) -> Option<String> {
    let cleaned = clean_url(input).ok()?;
    let (owner, repo) = (cleaned.owner?, cleaned.repo?);
    match cleaned.platform {
        Platform::GitHub => Some(format!("https://api.github.com/repos/{}/{}", owner, repo)),
        Platform::GitLab => Some(format!(
            "https://gitlab.com/api/v4/projects/{}%2F{}",
            owner, repo
        )),
        Platform::Bitbucket => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_repository_variants() {
        for input in [
            "https://github.com/rust-lang/rust",
            "github.com/rust-lang/rust",
            "  https://www.github.com/rust-lang/rust/  ",
            "https://github.com/rust-lang/rust.git",
            "https://github.com/rust-lang/rust?tab=readme",
        ] {
            let cleaned = clean_url(input).unwrap();
            assert_eq!(cleaned.cleaned, "https://github.com/rust-lang/rust", "{}", input);
            assert_eq!(cleaned.kind, UrlKind::Repository);
            assert_eq!(cleaned.full_name().as_deref(), Some("rust-lang/rust"));
        }
    }

    #[test]
    fn test_clean_other_platforms() {
        let gitlab = clean_url("gitlab.com/group/project").unwrap();
        assert_eq!(gitlab.platform, Platform::GitLab);
        assert_eq!(gitlab.cleaned, "https://gitlab.com/group/project");

        let bitbucket = clean_url("https://bitbucket.org/team/repo").unwrap();
        assert_eq!(bitbucket.platform, Platform::Bitbucket);
        assert!(bitbucket.is_repository());
    }

    #[test]
    fn test_clean_user_and_unknown() {
        let user = clean_url("https://github.com/octocat").unwrap();
        assert_eq!(user.kind, UrlKind::User);
        assert_eq!(user.cleaned, "https://github.com/octocat");

        let deep = clean_url("https://github.com/a/b/tree/main").unwrap();
        assert_eq!(deep.kind, UrlKind::Unknown);
    }

    #[test]
    fn test_clean_errors() {
        assert!(matches!(clean_url("   "), Err(GitHubError::InvalidInput)));
        assert!(matches!(clean_url("notaurl"), Err(GitHubError::InvalidFormat(_))));
        assert!(matches!(
            clean_url("https://example.com/a/b"),
            Err(GitHubError::UnsupportedPlatform(_))
        ));
    }

    #[test]
    fn test_require_github_repository() {
        assert!(require_github_repository("github.com/a/b").is_ok());
        assert!(matches!(
            require_github_repository("gitlab.com/a/b"),
            Err(GitHubError::NotARepository(_))
        ));
        assert!(require_github_repository("github.com/a").is_err());
    }

    #[test]
    fn test_normalize_github_url() {
        assert_eq!(
            normalize_github_url("www.github.com/a/b/blob/main/x.rs"),
            "https://github.com/a/b"
        );
        assert_eq!(normalize_github_url("github.com/a/b.git"), "https://github.com/a/b");
        assert_eq!(normalize_github_url(""), "");
    }

    #[test]
    fn test_extract_urls_from_text() {
        let text = "Copied from https://github.com/a/b. Also see https://example.com/x and \
                    https://gitlab.com/c/d";
        assert_eq!(
            extract_urls_from_text(text),
            vec!["https://github.com/a/b", "https://gitlab.com/c/d"]
        );
    }

    #[test]
    fn test_api_url() {
        assert_eq!(
            api_url("github.com/a/b").as_deref(),
            Some("https://api.github.com/repos/a/b")
        );
        assert_eq!(
            api_url("gitlab.com/a/b").as_deref(),
            Some("https://gitlab.com/api/v4/projects/a%2Fb")
        );
        assert_eq!(api_url("bitbucket.org/a/b"), None);
        assert_eq!(api_url("github.com/a"), None);
    }
}
