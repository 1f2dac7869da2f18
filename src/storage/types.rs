//! Storage types and errors.

use std::fmt;
use std::path::PathBuf;

use serde::{Serialize, Serializer};
use thiserror::Error;

pub const LOCAL_SCHEME: &str = "local://";

/// Upload backends, in the order they are considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageService {
    Pinata,
    Web3Storage,
    LocalIpfs,
    LocalFile,
}

impl StorageService {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageService::Pinata => "pinata",
            StorageService::Web3Storage => "web3_storage",
            StorageService::LocalIpfs => "local_ipfs",
            StorageService::LocalFile => "local_file",
        }
    }
}

impl fmt::Display for StorageService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pointer to stored content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentId {
    /// IPFS CID (v0 `Qm…` or v1 `b…`).
    Ipfs(String),
    /// Absolute path of a local copy.
    Local(PathBuf),
}

impl ContentId {
    /// Parse and validate a CID or `local://` pointer.
    pub fn parse(value: &str) -> StorageResult<Self> {
        let value = value.trim();
        if let Some(path) = value.strip_prefix(LOCAL_SCHEME) {
            if path.is_empty() {
                return Err(StorageError::InvalidCid(value.to_string()));
            }
            return Ok(ContentId::Local(PathBuf::from(path)));
        }
        if is_valid_ipfs_cid(value) {
            Ok(ContentId::Ipfs(value.to_string()))
        } else {
            Err(StorageError::InvalidCid(value.to_string()))
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ContentId::Local(_))
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentId::Ipfs(cid) => f.write_str(cid),
            ContentId::Local(path) => write!(f, "{}{}", LOCAL_SCHEME, path.display()),
        }
    }
}

impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// `Qm…` of length 46 (CIDv0) or `b…` of length >= 50 (base32 CIDv1).
pub fn is_valid_ipfs_cid(value: &str) -> bool {
    let alnum = value.chars().all(|c| c.is_ascii_alphanumeric());
    alnum
        && ((value.starts_with("Qm") && value.len() == 46)
            || (value.starts_with('b') && value.len() >= 50))
}

/// CID or `local://` pointer.
pub fn is_valid_content_id(value: &str) -> bool {
    ContentId::parse(value).is_ok()
}

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize)]
pub struct StoredContent {
    pub cid: ContentId,
    pub service: StorageService,
    /// Whether a gateway served the content right after upload.
    pub verified: bool,
}

/// Reachability of one storage backend.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ServiceStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ServiceStatus {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            reason: Some(reason.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatusReport {
    pub pinata: ServiceStatus,
    pub web3_storage: ServiceStatus,
    pub local_ipfs: ServiceStatus,
    /// Upload order currently in effect.
    pub priority: Vec<StorageService>,
}

/// A pin reported by Pinata.
#[derive(Debug, Clone, Serialize)]
pub struct PinnedContent {
    pub hash: String,
    pub size: u64,
    pub pinned_at: String,
    pub metadata: serde_json::Value,
}

/// What is known about a stored item.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ContentMetadata {
    pub hash: String,
    /// `local_file`, `pinata` or `ipfs`.
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} error: {message}")]
    Service {
        service: StorageService,
        message: String,
    },

    #[error("All storage services failed: {0}")]
    AllServicesFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid content id: {0}")]
    InvalidCid(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    const CID_V0: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
    const CID_V1: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

    #[test]
    fn test_cid_validation() {
        assert!(is_valid_ipfs_cid(CID_V0));
        assert!(is_valid_ipfs_cid(CID_V1));
        assert!(!is_valid_ipfs_cid("Qmshort"));
        assert!(!is_valid_ipfs_cid("bafyshort"));
        assert!(!is_valid_ipfs_cid(""));
        assert!(is_valid_content_id("local:///tmp/license.md"));
        assert!(!is_valid_content_id("local://"));
    }

    #[test]
    fn test_content_id_display_round_trip() {
        let local = ContentId::parse("local:///tmp/x.md").unwrap();
        assert!(local.is_local());
        assert_eq!(local.to_string(), "local:///tmp/x.md");

        let ipfs = ContentId::parse(CID_V1).unwrap();
        assert_eq!(ipfs.to_string(), CID_V1);
        assert_eq!(serde_json::to_string(&ipfs).unwrap(), format!("\"{}\"", CID_V1));
    }

    #[test]
    fn test_invalid_content_id() {
        assert!(matches!(ContentId::parse("nope"), Err(StorageError::InvalidCid(_))));
    }

    #[test]
    fn test_service_names() {
        assert_eq!(StorageService::Web3Storage.to_string(), "web3_storage");
        assert_eq!(
            serde_json::to_string(&StorageService::LocalIpfs).unwrap(),
            "\"local_ipfs\""
        );
    }
}
