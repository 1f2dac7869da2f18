//! Decentralized storage subsystem.
//!
//! # Data Flow
//! ```text
//! Secrets (PINATA_*, WEB3_STORAGE_TOKEN) → service_priority
//!     → manager.rs (upload with fallback, verification, pins, status)
//!     → gateway.rs (gateway URLs, CID extraction)
//! ```
//!
//! Uploads never fail while the local disk is writable: the last service
//! in the priority list is a plain file copy addressed as `local://<path>`.

pub mod gateway;
pub mod manager;
pub mod types;

pub use gateway::{extract_cid, gateway_urls, url_for};
pub use manager::{service_priority, StorageManager};
pub use types::{
    is_valid_content_id, is_valid_ipfs_cid, ContentId, ContentMetadata, PinnedContent,
    ServiceStatus, ServiceStatusReport, StorageError, StorageResult, StorageService,
    StoredContent,
};
