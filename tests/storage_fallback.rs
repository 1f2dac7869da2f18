//! Upload fallback order against mock storage services.

mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::json;

use common::{start_programmable_backend, MockRequest};
use repo_guardian::config::{Secrets, StorageConfig};
use repo_guardian::storage::{ContentId, StorageManager, StorageService};

const CID_V1: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

fn pinata_secrets() -> Secrets {
    Secrets {
        pinata_api_key: Some("test-key".into()),
        pinata_api_secret: Some("test-secret".into()),
        ..Secrets::default()
    }
}

fn config(dir: &std::path::Path, pinata: String, local_ipfs: String, gateway: String) -> StorageConfig {
    StorageConfig {
        pinata_api_url: pinata,
        local_ipfs_url: local_ipfs,
        local_fallback_dir: dir.join("fallback").display().to_string(),
        gateways: vec![gateway],
        upload_timeout_secs: 5,
        verify_attempts: 1,
        verify_delay_secs: 0,
        verify_timeout_secs: 2,
        ..StorageConfig::default()
    }
}

type Seen = Arc<Mutex<Vec<MockRequest>>>;

async fn recording_backend(seen: Seen, status: u16, body: String) -> String {
    let addr = start_programmable_backend(move |req| {
        let seen = seen.clone();
        let body = body.clone();
        async move {
            seen.lock().unwrap().push(req);
            (status, body)
        }
    })
    .await;
    format!("http://{}", addr)
}

async fn license_file(dir: &std::path::Path) -> std::path::PathBuf {
    let file = dir.join("LICENSE_octocat_hello.md");
    tokio::fs::write(&file, "# MIT License\n").await.unwrap();
    file
}

#[tokio::test]
async fn test_pinata_failure_falls_back_to_local_ipfs() {
    let dir = tempfile::tempdir().unwrap();
    let pinata_seen: Seen = Default::default();
    let ipfs_seen: Seen = Default::default();

    let pinata = recording_backend(pinata_seen.clone(), 401, r#"{"error":"bad key"}"#.into()).await;
    let ipfs = recording_backend(ipfs_seen.clone(), 200, json!({ "Hash": CID_V1 }).to_string()).await;

    let manager = StorageManager::new(
        config(dir.path(), pinata, ipfs, "http://127.0.0.1:1".into()),
        &pinata_secrets(),
    )
    .unwrap();
    let file = license_file(dir.path()).await;

    let stored = manager.upload(&file, &HashMap::new()).await.unwrap();
    assert_eq!(stored.service, StorageService::LocalIpfs);
    assert_eq!(stored.cid, ContentId::Ipfs(CID_V1.to_string()));
    assert!(!stored.verified);

    let pinata_requests = pinata_seen.lock().unwrap();
    assert_eq!(pinata_requests.len(), 1);
    assert_eq!(pinata_requests[0].path_only(), "/pinning/pinFileToIPFS");
    assert_eq!(
        pinata_requests[0].headers.get("pinata_api_key").map(String::as_str),
        Some("test-key")
    );

    let ipfs_requests = ipfs_seen.lock().unwrap();
    assert_eq!(ipfs_requests.len(), 1);
    assert_eq!(ipfs_requests[0].method, "POST");
    assert_eq!(ipfs_requests[0].path_only(), "/api/v0/add");
    assert!(ipfs_requests[0].path.contains("pin=true"));
    assert!(ipfs_requests[0].path.contains("cid-version=1"));
    let body = String::from_utf8_lossy(&ipfs_requests[0].body);
    assert!(body.contains("# MIT License"));
    assert!(body.contains("LICENSE_octocat_hello.md"));
}

#[tokio::test]
async fn test_pinata_upload_is_verified_on_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let gateway_seen: Seen = Default::default();

    let pinata = recording_backend(
        Default::default(),
        200,
        json!({ "IpfsHash": CID_V1, "PinSize": 14 }).to_string(),
    )
    .await;
    let gateway = recording_backend(gateway_seen.clone(), 200, String::new()).await;

    let manager = StorageManager::new(
        config(dir.path(), pinata, "http://127.0.0.1:1".into(), gateway),
        &pinata_secrets(),
    )
    .unwrap();
    let file = license_file(dir.path()).await;

    let stored = manager.upload(&file, &HashMap::new()).await.unwrap();
    assert_eq!(stored.service, StorageService::Pinata);
    assert!(stored.verified);

    let gateway_requests = gateway_seen.lock().unwrap();
    assert_eq!(gateway_requests[0].method, "HEAD");
    assert_eq!(gateway_requests[0].path, format!("/ipfs/{}", CID_V1));
}

#[tokio::test]
async fn test_all_services_down_stores_local_copy() {
    let dir = tempfile::tempdir().unwrap();
    let pinata = recording_backend(Default::default(), 500, String::new()).await;
    let ipfs = recording_backend(Default::default(), 503, String::new()).await;

    let manager = StorageManager::new(
        config(dir.path(), pinata, ipfs, "http://127.0.0.1:1".into()),
        &pinata_secrets(),
    )
    .unwrap();
    let file = license_file(dir.path()).await;

    let stored = manager.upload(&file, &HashMap::new()).await.unwrap();
    assert_eq!(stored.service, StorageService::LocalFile);
    let ContentId::Local(path) = &stored.cid else {
        panic!("expected a local pointer");
    };
    assert!(path.starts_with(dir.path().join("fallback").canonicalize().unwrap()));
    assert_eq!(
        tokio::fs::read_to_string(path).await.unwrap(),
        "# MIT License\n"
    );
}

#[tokio::test]
async fn test_invalid_cid_from_service_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let ipfs = recording_backend(
        Default::default(),
        200,
        json!({ "Hash": "not-a-cid" }).to_string(),
    )
    .await;

    let manager = StorageManager::new(
        config(dir.path(), "http://127.0.0.1:1".into(), ipfs, "http://127.0.0.1:1".into()),
        &Secrets::default(),
    )
    .unwrap();
    let file = license_file(dir.path()).await;

    // The bogus CID is treated as a failed upload, so the local copy wins.
    let stored = manager.upload(&file, &HashMap::new()).await.unwrap();
    assert_eq!(stored.service, StorageService::LocalFile);
}

#[tokio::test]
async fn test_list_pinned_reads_pinata_rows() {
    let dir = tempfile::tempdir().unwrap();
    let seen: Seen = Default::default();
    let pinata = recording_backend(
        seen.clone(),
        200,
        json!({
            "count": 1,
            "rows": [{
                "ipfs_pin_hash": CID_V1,
                "size": 1024,
                "date_pinned": "2024-01-01T00:00:00Z",
                "metadata": { "name": "LICENSE.md" }
            }]
        })
        .to_string(),
    )
    .await;

    let manager = StorageManager::new(
        config(dir.path(), pinata, "http://127.0.0.1:1".into(), "http://127.0.0.1:1".into()),
        &pinata_secrets(),
    )
    .unwrap();

    let pins = manager.list_pinned().await.unwrap();
    assert_eq!(pins.len(), 1);
    assert_eq!(pins[0].hash, CID_V1);
    assert_eq!(pins[0].size, 1024);

    let requests = seen.lock().unwrap();
    assert_eq!(requests[0].path_only(), "/data/pinList");
    assert!(requests[0].path.contains("status=pinned"));
}
