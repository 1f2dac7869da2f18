//! Upload with ordered fallback across storage services.
//!
//! # Responsibilities
//! - Pick the usable services from the available credentials
//! - Upload through the first service that accepts the file
//! - Verify gateway availability after pinning
//! - Report pins, metadata and service health
//!
//! # Design Decisions
//! - The local file copy is always last, so an upload only fails when the
//!   disk fails too
//! - Verification failures are logged, never fatal: gateways lag behind pins

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::time::sleep;

use crate::config::{Secrets, StorageConfig};
use crate::observability::metrics;
use crate::storage::gateway::{file_type, gateway_urls};
use crate::storage::types::{
    ContentId, ContentMetadata, PinnedContent, ServiceStatus, ServiceStatusReport, StorageError,
    StorageResult, StorageService, StoredContent,
};

const SERVICE_TAG: &str = "repo_guardian";
const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
const NETWORK_TAG: &str = "filecoin_calibration";

#[derive(Deserialize)]
struct PinataPinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

#[derive(Deserialize)]
struct Web3StorageResponse {
    cid: String,
}

#[derive(Deserialize)]
struct IpfsAddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

#[derive(Deserialize)]
struct IpfsIdResponse {
    #[serde(rename = "ID")]
    id: Option<String>,
}

#[derive(Deserialize, Default)]
struct PinListResponse {
    #[serde(default)]
    rows: Vec<PinListRow>,
}

#[derive(Deserialize)]
struct PinListRow {
    ipfs_pin_hash: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    date_pinned: String,
    #[serde(default)]
    metadata: serde_json::Value,
}

/// Upload order for the given credentials.
pub fn service_priority(secrets: &Secrets) -> Vec<StorageService> {
    let mut services = Vec::with_capacity(4);
    if secrets.pinata().is_some() {
        services.push(StorageService::Pinata);
    }
    if secrets.web3_storage_token.is_some() {
        services.push(StorageService::Web3Storage);
    }
    services.push(StorageService::LocalIpfs);
    services.push(StorageService::LocalFile);
    services
}

/// Storage client over Pinata, Web3.Storage, a local IPFS node and the local disk.
#[derive(Clone)]
pub struct StorageManager {
    http: Client,
    config: StorageConfig,
    pinata: Option<(String, String)>,
    web3_token: Option<String>,
    priority: Vec<StorageService>,
}

impl StorageManager {
    pub fn new(config: StorageConfig, secrets: &Secrets) -> StorageResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.upload_timeout_secs))
            .user_agent(concat!("repo-guardian/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let priority = service_priority(secrets);
        tracing::info!(
            services = %priority.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", "),
            "Storage manager initialized"
        );

        Ok(Self {
            http,
            config,
            pinata: secrets.pinata().map(|(k, s)| (k.to_string(), s.to_string())),
            web3_token: secrets.web3_storage_token.clone(),
            priority,
        })
    }

    pub fn priority(&self) -> &[StorageService] {
        &self.priority
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    fn api(base: &str, path: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn pinata_request(&self, builder: reqwest::RequestBuilder) -> StorageResult<reqwest::RequestBuilder> {
        let (key, secret) = self.pinata.as_ref().ok_or_else(|| StorageError::Service {
            service: StorageService::Pinata,
            message: "credentials not configured".to_string(),
        })?;
        Ok(builder
            .header("pinata_api_key", key)
            .header("pinata_secret_api_key", secret))
    }

    /// Upload `path`, trying each service in priority order.
    pub async fn upload(
        &self,
        path: &Path,
        metadata: &HashMap<String, String>,
    ) -> StorageResult<StoredContent> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(StorageError::FileNotFound(path.to_path_buf()));
        }

        let mut failures = Vec::new();
        for service in &self.priority {
            match self.upload_with(*service, path, metadata).await {
                Ok(stored) => {
                    metrics::record_upload(service.as_str(), true);
                    tracing::info!(
                        service = %service,
                        cid = %stored.cid,
                        verified = stored.verified,
                        "File stored"
                    );
                    return Ok(stored);
                }
                Err(e) => {
                    metrics::record_upload(service.as_str(), false);
                    tracing::warn!(service = %service, error = %e, "Upload failed, trying next service");
                    failures.push(format!("{}: {}", service, e));
                }
            }
        }

        Err(StorageError::AllServicesFailed(failures.join("; ")))
    }

    async fn upload_with(
        &self,
        service: StorageService,
        path: &Path,
        metadata: &HashMap<String, String>,
    ) -> StorageResult<StoredContent> {
        match service {
            StorageService::Pinata => {
                let cid = self.upload_to_pinata(path, metadata).await?;
                let verified = self
                    .verify_with_retry(
                        &cid,
                        self.config.verify_attempts,
                        Duration::from_secs(self.config.verify_timeout_secs),
                    )
                    .await;
                if !verified {
                    tracing::warn!(cid = %cid, "Upload not yet visible on gateways");
                }
                Ok(StoredContent { cid, service, verified })
            }
            StorageService::Web3Storage => Ok(StoredContent {
                cid: self.upload_to_web3_storage(path).await?,
                service,
                verified: false,
            }),
            StorageService::LocalIpfs => Ok(StoredContent {
                cid: self.upload_to_local_ipfs(path).await?,
                service,
                verified: false,
            }),
            StorageService::LocalFile => Ok(StoredContent {
                cid: self.store_locally(path).await?,
                service,
                verified: true,
            }),
        }
    }

    async fn file_part(path: &Path) -> StorageResult<Part> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Part::bytes(bytes).file_name(name))
    }

    fn pinata_metadata(path: &Path, extra: &HashMap<String, String>) -> serde_json::Value {
        let mut keyvalues = serde_json::Map::new();
        keyvalues.insert("service".into(), SERVICE_TAG.into());
        keyvalues.insert("version".into(), SERVICE_VERSION.into());
        keyvalues.insert("timestamp".into(), chrono::Utc::now().timestamp().to_string().into());
        keyvalues.insert("file_type".into(), file_type(path).into());
        keyvalues.insert("network".into(), NETWORK_TAG.into());
        for (k, v) in extra {
            keyvalues.insert(k.clone(), v.clone().into());
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload");
        serde_json::json!({ "name": name, "keyvalues": keyvalues })
    }

    async fn upload_to_pinata(
        &self,
        path: &Path,
        metadata: &HashMap<String, String>,
    ) -> StorageResult<ContentId> {
        let url = Self::api(&self.config.pinata_api_url, "pinning/pinFileToIPFS");
        let form = Form::new()
            .part("file", Self::file_part(path).await?)
            .text("pinataMetadata", Self::pinata_metadata(path, metadata).to_string())
            .text(
                "pinataOptions",
                serde_json::json!({ "cidVersion": 1, "wrapWithDirectory": false }).to_string(),
            );

        let response = self
            .pinata_request(self.http.post(url))?
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        let body: PinataPinResponse = response.json().await?;
        ContentId::parse(&body.ipfs_hash)
    }

    async fn upload_to_web3_storage(&self, path: &Path) -> StorageResult<ContentId> {
        let token = self.web3_token.as_ref().ok_or_else(|| StorageError::Service {
            service: StorageService::Web3Storage,
            message: "token not configured".to_string(),
        })?;
        let url = Self::api(&self.config.web3_storage_api_url, "upload");
        let form = Form::new().part("file", Self::file_part(path).await?);

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        let body: Web3StorageResponse = response.json().await?;
        ContentId::parse(&body.cid)
    }

    async fn upload_to_local_ipfs(&self, path: &Path) -> StorageResult<ContentId> {
        let url = Self::api(&self.config.local_ipfs_url, "api/v0/add");
        let form = Form::new().part("file", Self::file_part(path).await?);

        let response = self
            .http
            .post(url)
            .query(&[("pin", "true"), ("cid-version", "1")])
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        let body: IpfsAddResponse = response.json().await?;
        ContentId::parse(&body.hash)
    }

    /// Copy into the fallback directory and point at the copy.
    async fn store_locally(&self, path: &Path) -> StorageResult<ContentId> {
        let dir = PathBuf::from(&self.config.local_fallback_dir);
        tokio::fs::create_dir_all(&dir).await?;

        let name = path
            .file_name()
            .ok_or_else(|| StorageError::FileNotFound(path.to_path_buf()))?;
        let target = dir.join(name);
        let source = tokio::fs::canonicalize(path).await?;
        let absolute_dir = tokio::fs::canonicalize(&dir).await?;
        let target_abs = absolute_dir.join(name);

        if source != target_abs {
            tokio::fs::copy(&source, &target).await?;
        }

        tracing::warn!(path = %target_abs.display(), "Stored locally, content is not on IPFS");
        Ok(ContentId::Local(target_abs))
    }

    /// Probe gateways for `cid`, `attempts` rounds at most.
    pub async fn verify_with_retry(&self, cid: &ContentId, attempts: u32, timeout: Duration) -> bool {
        if let ContentId::Local(path) = cid {
            return tokio::fs::try_exists(path).await.unwrap_or(false);
        }

        let urls = gateway_urls(cid, &self.config.gateways);
        let probe: Vec<&String> = urls.iter().take(self.config.verify_gateways.max(1)).collect();
        let attempts = attempts.max(1);

        for attempt in 0..attempts {
            tracing::debug!(cid = %cid, attempt = attempt + 1, attempts, "Verifying content");
            for url in &probe {
                match self.http.head(url.as_str()).timeout(timeout).send().await {
                    Ok(resp) if resp.status() == StatusCode::OK => {
                        tracing::debug!(url = %url, "Content verified");
                        return true;
                    }
                    Ok(resp) => tracing::debug!(url = %url, status = %resp.status(), "Gateway miss"),
                    Err(e) => tracing::debug!(url = %url, error = %e, "Gateway error"),
                }
            }
            if attempt + 1 < attempts {
                sleep(Duration::from_secs(self.config.verify_delay_secs)).await;
            }
        }

        tracing::debug!(cid = %cid, attempts, "Could not verify content");
        false
    }

    /// Everything known about a stored item.
    pub async fn metadata(&self, cid: &ContentId) -> ContentMetadata {
        let hash = cid.to_string();

        if let ContentId::Local(path) = cid {
            return match tokio::fs::metadata(path).await {
                Ok(meta) => ContentMetadata {
                    hash,
                    kind: "local_file".to_string(),
                    size: Some(meta.len()),
                    modified: meta
                        .modified()
                        .ok()
                        .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339()),
                    ..ContentMetadata::default()
                },
                Err(_) => ContentMetadata {
                    hash,
                    kind: "local_file".to_string(),
                    error: Some("File not found".to_string()),
                    ..ContentMetadata::default()
                },
            };
        }

        if self.pinata.is_some() {
            match self.pin_list(Some(&hash), 1).await {
                Ok(rows) => {
                    if let Some(row) = rows.into_iter().next() {
                        return ContentMetadata {
                            hash,
                            kind: "pinata".to_string(),
                            size: Some(row.size),
                            pinned_at: Some(row.date_pinned),
                            metadata: Some(row.metadata),
                            ..ContentMetadata::default()
                        };
                    }
                }
                Err(e) => tracing::debug!(error = %e, "Pinata metadata unavailable"),
            }
        }

        let verified = self
            .verify_with_retry(cid, 1, Duration::from_secs(self.config.verify_timeout_secs))
            .await;
        ContentMetadata {
            hash,
            kind: "ipfs".to_string(),
            verified: Some(verified),
            ..ContentMetadata::default()
        }
    }

    async fn pin_list(&self, hash: Option<&str>, limit: usize) -> StorageResult<Vec<PinListRow>> {
        let url = Self::api(&self.config.pinata_api_url, "data/pinList");
        let mut query: Vec<(&str, String)> = vec![
            ("status", "pinned".to_string()),
            ("pageLimit", limit.to_string()),
        ];
        match hash {
            Some(h) => query.push(("hashContains", h.to_string())),
            None => query.push(("metadata[keyvalues][service]", SERVICE_TAG.to_string())),
        }

        let response = self
            .pinata_request(self.http.get(url))?
            .query(&query)
            .send()
            .await?
            .error_for_status()?;
        let body: PinListResponse = response.json().await?;
        Ok(body.rows)
    }

    /// Pins created by this agent. Empty without Pinata credentials.
    pub async fn list_pinned(&self) -> StorageResult<Vec<PinnedContent>> {
        if self.pinata.is_none() {
            return Ok(Vec::new());
        }
        let rows = self.pin_list(None, 100).await?;
        Ok(rows
            .into_iter()
            .map(|row| PinnedContent {
                hash: row.ipfs_pin_hash,
                size: row.size,
                pinned_at: row.date_pinned,
                metadata: row.metadata,
            })
            .collect())
    }

    /// Remove a Pinata pin. Returns false without credentials.
    pub async fn unpin(&self, cid: &ContentId) -> StorageResult<bool> {
        let ContentId::Ipfs(hash) = cid else {
            return Err(StorageError::InvalidCid(cid.to_string()));
        };
        if self.pinata.is_none() {
            tracing::warn!("Cannot unpin: Pinata credentials not configured");
            return Ok(false);
        }

        let url = Self::api(&self.config.pinata_api_url, &format!("pinning/unpin/{}", hash));
        self.pinata_request(self.http.delete(url))?
            .send()
            .await?
            .error_for_status()?;
        tracing::info!(cid = %hash, "Content unpinned");
        Ok(true)
    }

    /// Probe every backend.
    pub async fn service_status(&self) -> ServiceStatusReport {
        let probe_timeout = Duration::from_secs(self.config.verify_timeout_secs);

        let pinata = if self.pinata.is_some() {
            let url = Self::api(&self.config.pinata_api_url, "data/testAuthentication");
            match self.pinata_request(self.http.get(url).timeout(probe_timeout)) {
                Ok(request) => match request.send().await {
                    Ok(resp) => {
                        let ok = resp.status().is_success();
                        ServiceStatus {
                            available: ok,
                            authenticated: Some(ok),
                            ..ServiceStatus::default()
                        }
                    }
                    Err(e) => ServiceStatus::unavailable(e.to_string()),
                },
                Err(e) => ServiceStatus::unavailable(e.to_string()),
            }
        } else {
            ServiceStatus::unavailable("No credentials")
        };

        let web3_storage = match &self.web3_token {
            Some(token) => {
                let url = Self::api(&self.config.web3_storage_api_url, "user/account");
                match self.http.get(url).bearer_auth(token).timeout(probe_timeout).send().await {
                    Ok(resp) => {
                        let ok = resp.status().is_success();
                        ServiceStatus {
                            available: ok,
                            authenticated: Some(ok),
                            ..ServiceStatus::default()
                        }
                    }
                    Err(e) => ServiceStatus::unavailable(e.to_string()),
                }
            }
            None => ServiceStatus::unavailable("No token"),
        };

        let local_url = Self::api(&self.config.local_ipfs_url, "api/v0/id");
        let local_ipfs = match self.http.post(local_url).timeout(probe_timeout).send().await {
            Ok(resp) if resp.status().is_success() => {
                let node_id = resp.json::<IpfsIdResponse>().await.ok().and_then(|b| b.id);
                ServiceStatus {
                    available: true,
                    node_id,
                    ..ServiceStatus::default()
                }
            }
            Ok(resp) => ServiceStatus::unavailable(format!("HTTP {}", resp.status())),
            Err(e) => ServiceStatus::unavailable(e.to_string()),
        };

        ServiceStatusReport {
            pinata,
            web3_storage,
            local_ipfs,
            priority: self.priority.clone(),
        }
    }
}

impl std::fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageManager")
            .field("priority", &self.priority)
            .field("local_ipfs_url", &self.config.local_ipfs_url)
            .finish()
    }
}
