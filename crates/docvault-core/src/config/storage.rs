//! Object storage configuration.

use serde::{Deserialize, Serialize};

/// S3-compatible object storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// S3 bucket name.
    #[serde(default)]
    pub bucket: String,
    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,
    /// S3 endpoint URL (for non-AWS services like MinIO).
    #[serde(default)]
    pub endpoint: String,
    /// Whether to force path-style addressing (required by MinIO).
    #[serde(default)]
    pub force_path_style: bool,
    /// TTL in seconds for presigned upload URLs.
    #[serde(default = "default_upload_url_ttl")]
    pub upload_url_ttl_seconds: u64,
    /// TTL in seconds for presigned download URLs.
    #[serde(default = "default_download_url_ttl")]
    pub download_url_ttl_seconds: u64,
    /// Per-call timeout in seconds for object store operations.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: default_region(),
            endpoint: String::new(),
            force_path_style: false,
            upload_url_ttl_seconds: default_upload_url_ttl(),
            download_url_ttl_seconds: default_download_url_ttl(),
            operation_timeout_seconds: default_operation_timeout(),
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_upload_url_ttl() -> u64 {
    // 7 days, matching the issued credential lifetime callers expect
    7 * 24 * 60 * 60
}

fn default_download_url_ttl() -> u64 {
    7 * 24 * 60 * 60
}

fn default_operation_timeout() -> u64 {
    10
}
