//! Gateway URL helpers.

use std::path::Path;

use crate::storage::types::{is_valid_ipfs_cid, ContentId, StorageError, StorageResult};

/// Gateway URLs for a CID, in gateway order. A local pointer maps to itself.
pub fn gateway_urls(cid: &ContentId, gateways: &[String]) -> Vec<String> {
    match cid {
        ContentId::Local(_) => vec![cid.to_string()],
        ContentId::Ipfs(hash) => gateways
            .iter()
            .map(|g| format!("{}/ipfs/{}", g.trim_end_matches('/'), hash))
            .collect(),
    }
}

/// A single URL for a CID, on `preferred_gateway` when given, otherwise
/// on the first configured gateway.
pub fn url_for(cid: &str, preferred_gateway: Option<&str>, gateways: &[String]) -> StorageResult<String> {
    let content = ContentId::parse(cid)?;
    let ContentId::Ipfs(hash) = &content else {
        return Ok(content.to_string());
    };

    let gateway = preferred_gateway
        .or_else(|| gateways.first().map(String::as_str))
        .unwrap_or("https://ipfs.io");
    Ok(format!("{}/ipfs/{}", gateway.trim_end_matches('/'), hash))
}

/// CID from a `…/ipfs/<cid>/…` gateway URL.
pub fn extract_cid(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("/ipfs/")?;
    let cid = rest.split(['/', '?', '#']).next()?;
    is_valid_ipfs_cid(cid).then(|| cid.to_string())
}

/// Coarse content category from the file extension.
pub fn file_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "document",
        Some("json") => "metadata",
        Some("txt") => "text",
        Some("md") => "markdown",
        Some("png" | "jpg" | "jpeg") => "image",
        _ => "unknown",
    }
}

/// Reject pointers that are neither CIDs nor local paths.
pub fn require_cid(value: &str) -> StorageResult<ContentId> {
    ContentId::parse(value).map_err(|_| StorageError::InvalidCid(value.to_string()))
}
