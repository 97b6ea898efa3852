//! In-memory object storage gateway.
//!
//! Stores objects in a concurrent map and issues `memory://` pseudo
//! credentials. [`MemoryObjectStorageGateway::put`] stands in for the
//! client's direct upload against a write credential, and the failure
//! toggles let callers exercise copy/delete error paths.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;

use docvault_core::error::AppError;
use docvault_core::result::AppResult;
use docvault_core::traits::storage::{ObjectStorageGateway, WriteCredential};

/// Object storage gateway backed by a concurrent map.
#[derive(Debug, Clone)]
pub struct MemoryObjectStorageGateway {
    bucket: String,
    objects: Arc<DashMap<String, Bytes>>,
    failing_copies: Arc<AtomicU32>,
    failing_deletes: Arc<AtomicU32>,
}

impl MemoryObjectStorageGateway {
    /// Create an empty gateway for the given bucket name.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Arc::new(DashMap::new()),
            failing_copies: Arc::new(AtomicU32::new(0)),
            failing_deletes: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Store an object directly, as a client holding a write credential
    /// would.
    pub fn put(&self, key: &str, data: Bytes) {
        self.objects.insert(key.to_string(), data);
    }

    /// Fetch an object's bytes, if present.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.get(key).map(|b| b.clone())
    }

    /// Make the next `n` `copy` calls fail with `StorageUnavailable`.
    pub fn fail_copies(&self, n: u32) {
        self.failing_copies.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` `delete` calls fail with `StorageUnavailable`.
    pub fn fail_deletes(&self, n: u32) {
        self.failing_deletes.store(n, Ordering::SeqCst);
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ObjectStorageGateway for MemoryObjectStorageGateway {
    fn gateway_type(&self) -> &str {
        "memory"
    }

    async fn issue_write_credential(
        &self,
        key: &str,
        ttl: Duration,
    ) -> AppResult<WriteCredential> {
        Ok(WriteCredential {
            url: format!("memory://{}/{}", self.bucket, key),
            key: key.to_string(),
            bucket: self.bucket.clone(),
            expires_at: Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default(),
        })
    }

    async fn issue_read_credential(&self, key: &str, _ttl: Duration) -> AppResult<String> {
        if !self.objects.contains_key(key) {
            return Err(AppError::not_found(format!("No object at key '{key}'")));
        }
        Ok(format!("memory://{}/{}", self.bucket, key))
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> AppResult<()> {
        if Self::take_failure(&self.failing_copies) {
            return Err(AppError::storage_unavailable(format!(
                "Copy of '{src_key}' failed"
            )));
        }
        let data = self
            .objects
            .get(src_key)
            .map(|b| b.clone())
            .ok_or_else(|| AppError::not_found(format!("No object at key '{src_key}'")))?;
        self.objects.insert(dst_key.to_string(), data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        if Self::take_failure(&self.failing_deletes) {
            return Err(AppError::storage_unavailable(format!(
                "Delete of '{key}' failed"
            )));
        }
        self.objects.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.objects.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_copy_delete() {
        let gateway = MemoryObjectStorageGateway::new("vault");
        gateway.put("a/1.pdf", Bytes::from("pdf bytes"));

        assert!(gateway.exists("a/1.pdf").await.unwrap());
        gateway.copy("a/1.pdf", "b/1.pdf").await.unwrap();
        assert_eq!(gateway.get("b/1.pdf").unwrap(), Bytes::from("pdf bytes"));

        gateway.delete("a/1.pdf").await.unwrap();
        assert!(!gateway.exists("a/1.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_failure_injection_counts_down() {
        let gateway = MemoryObjectStorageGateway::new("vault");
        gateway.put("k", Bytes::from("x"));

        gateway.fail_deletes(1);
        assert!(gateway.delete("k").await.unwrap_err().is_retryable());
        gateway.delete("k").await.unwrap();
        assert!(!gateway.exists("k").await.unwrap());
    }
}
