//! Object storage gateway trait for pluggable object store backends.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::result::AppResult;

/// A short-lived, single-use write credential for one object key.
///
/// Issued during upload reservation; the client uploads directly against
/// `url` and echoes the key back when confirming.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WriteCredential {
    /// Presigned upload URL (or equivalent scoped token).
    pub url: String,
    /// The object key the credential is scoped to.
    pub key: String,
    /// The bucket the key lives in.
    pub bucket: String,
    /// When the credential stops being honored.
    pub expires_at: DateTime<Utc>,
}

/// Trait for object storage backends.
///
/// Implementations exist for S3-compatible stores and an in-memory
/// store. The [`ObjectStorageGateway`] trait is defined here in
/// `docvault-core` and implemented in `docvault-storage`. Keys are
/// opaque byte strings; the core never inspects object contents.
#[async_trait]
pub trait ObjectStorageGateway: Send + Sync + std::fmt::Debug + 'static {
    /// Return the gateway type name (e.g., "s3", "memory").
    fn gateway_type(&self) -> &str;

    /// Issue a presigned write credential for the given key.
    async fn issue_write_credential(&self, key: &str, ttl: Duration)
    -> AppResult<WriteCredential>;

    /// Issue a presigned read URL for the given key.
    async fn issue_read_credential(&self, key: &str, ttl: Duration) -> AppResult<String>;

    /// Copy an object from one key to another within the bucket.
    async fn copy(&self, src_key: &str, dst_key: &str) -> AppResult<()>;

    /// Delete the object at the given key.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check whether an object exists at the given key.
    async fn exists(&self, key: &str) -> AppResult<bool>;
}
