//! S3-compatible object storage gateway.
//!
//! Issues presigned PUT/GET URLs so clients transfer bytes directly
//! against the object store; the application never proxies file
//! contents.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::presigning::PresigningConfig;
use chrono::Utc;
use tracing::info;

use docvault_core::config::StorageConfig;
use docvault_core::error::{AppError, ErrorKind};
use docvault_core::result::AppResult;
use docvault_core::traits::storage::{ObjectStorageGateway, WriteCredential};

/// Object storage gateway backed by an S3-compatible store.
#[derive(Debug, Clone)]
pub struct S3ObjectStorageGateway {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStorageGateway {
    /// Create a new gateway from configuration.
    ///
    /// Credentials come from the ambient AWS credential chain; the
    /// endpoint override and path-style flag support MinIO-style
    /// deployments.
    pub async fn new(config: &StorageConfig) -> AppResult<Self> {
        info!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = %config.endpoint,
            "Initializing S3 object storage gateway"
        );

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if !config.endpoint.is_empty() {
            loader = loader.endpoint_url(&config.endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        })
    }

    fn presigning(ttl: Duration) -> AppResult<PresigningConfig> {
        PresigningConfig::expires_in(ttl).map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Invalid presigning TTL", e)
        })
    }
}

#[async_trait]
impl ObjectStorageGateway for S3ObjectStorageGateway {
    fn gateway_type(&self) -> &str {
        "s3"
    }

    async fn issue_write_credential(
        &self,
        key: &str,
        ttl: Duration,
    ) -> AppResult<WriteCredential> {
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(Self::presigning(ttl)?)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::StorageUnavailable,
                    format!("Failed to presign upload for '{key}'"),
                    e,
                )
            })?;

        Ok(WriteCredential {
            url: presigned.uri().to_string(),
            key: key.to_string(),
            bucket: self.bucket.clone(),
            expires_at: Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default(),
        })
    }

    async fn issue_read_credential(&self, key: &str, ttl: Duration) -> AppResult<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(Self::presigning(ttl)?)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::StorageUnavailable,
                    format!("Failed to presign download for '{key}'"),
                    e,
                )
            })?;

        Ok(presigned.uri().to_string())
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> AppResult<()> {
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{}", self.bucket, src_key))
            .key(dst_key)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::StorageUnavailable,
                    format!("Failed to copy '{src_key}' to '{dst_key}'"),
                    e,
                )
            })?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::StorageUnavailable,
                    format!("Failed to delete '{key}'"),
                    e,
                )
            })?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().map(|se| se.is_not_found()) == Some(true) {
                    Ok(false)
                } else {
                    Err(AppError::with_source(
                        ErrorKind::StorageUnavailable,
                        format!("Failed to stat '{key}'"),
                        e,
                    ))
                }
            }
        }
    }
}
