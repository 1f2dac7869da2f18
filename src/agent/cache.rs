//! Registered repository caching and persistence.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

/// What the agent remembers about a repository it registered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedRepository {
    pub repo_id: u64,
    pub github_url: String,
    pub repo_hash: String,
    pub fingerprint: String,
    pub license_type: String,
    pub license_cid: String,
    pub key_features: Vec<String>,
    pub registered_at: String,
    pub tx_hash: String,
}

/// Statistics reported by `status`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub repositories_cached: usize,
    pub persistent: bool,
}

/// A thread-safe cache of registered repositories keyed by on-chain id.
#[derive(Clone, Default)]
pub struct RepositoryCache {
    inner: Arc<DashMap<u64, CachedRepository>>,
    persistence_path: Option<String>,
}

impl RepositoryCache {
    pub fn new(persistence_path: Option<String>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            persistence_path,
        }
    }

    /// Load from file if it exists, otherwise start empty.
    pub fn load_from_file(path: &str) -> std::io::Result<Self> {
        let cache = Self::new(Some(path.to_string()));
        if Path::new(path).exists() {
            let reader = BufReader::new(File::open(path)?);
            let map: BTreeMap<u64, CachedRepository> = serde_json::from_reader(reader)?;
            for (id, repo) in map {
                cache.inner.insert(id, repo);
            }
            tracing::info!(path, repositories = cache.inner.len(), "Loaded repository cache");
        }
        Ok(cache)
    }

    /// Write the cache when a persistence path is configured.
    pub fn save_to_file(&self) -> std::io::Result<()> {
        if let Some(path) = &self.persistence_path {
            if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let writer = BufWriter::new(File::create(path)?);
            let map: BTreeMap<u64, CachedRepository> = self
                .inner
                .iter()
                .map(|r| (*r.key(), r.value().clone()))
                .collect();
            serde_json::to_writer_pretty(writer, &map)?;
            tracing::debug!(path = %path, repositories = map.len(), "Saved repository cache");
        }
        Ok(())
    }

    /// Insert and persist. A failed save is logged, the entry stays cached.
    pub fn insert(&self, repo: CachedRepository) {
        self.inner.insert(repo.repo_id, repo);
        if let Err(e) = self.save_to_file() {
            tracing::warn!(error = %e, "Failed to persist repository cache");
        }
    }

    pub fn get(&self, repo_id: u64) -> Option<CachedRepository> {
        self.inner.get(&repo_id).map(|r| r.value().clone())
    }

    pub fn find_by_url(&self, url: &str) -> Option<CachedRepository> {
        self.inner
            .iter()
            .find(|r| r.value().github_url == url)
            .map(|r| r.value().clone())
    }

    pub fn count(&self) -> usize {
        self.inner.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            repositories_cached: self.inner.len(),
            persistent: self.persistence_path.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(id: u64, url: &str) -> CachedRepository {
        CachedRepository {
            repo_id: id,
            github_url: url.to_string(),
            repo_hash: "h".into(),
            fingerprint: "f".into(),
            license_type: "MIT".into(),
            license_cid: "local:///tmp/LICENSE.md".into(),
            key_features: vec!["Rust".into()],
            registered_at: "2024-01-01T00:00:00Z".into(),
            tx_hash: "0x01".into(),
        }
    }

    #[test]
    fn test_cache_operations() {
        let cache = RepositoryCache::new(None);
        assert!(cache.get(1).is_none());

        cache.insert(repo(1, "https://github.com/a/b"));
        cache.insert(repo(2, "https://github.com/c/d"));
        assert_eq!(cache.count(), 2);
        assert_eq!(cache.get(2).unwrap().github_url, "https://github.com/c/d");
        assert_eq!(cache.find_by_url("https://github.com/a/b").unwrap().repo_id, 1);
        assert!(cache.find_by_url("https://github.com/x/y").is_none());
        assert!(!cache.stats().persistent);
    }

    #[test]
    fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("repos.json");
        let path = path.to_str().unwrap();

        let cache = RepositoryCache::new(Some(path.to_string()));
        cache.insert(repo(7, "https://github.com/a/b"));

        let loaded = RepositoryCache::load_from_file(path).unwrap();
        assert_eq!(loaded.get(7).unwrap(), repo(7, "https://github.com/a/b"));
        assert!(loaded.stats().persistent);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let cache = RepositoryCache::load_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(cache.count(), 0);
    }
}
