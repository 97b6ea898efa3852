//! Two-phase upload coordination.
//!
//! Phase 1 (`reserve`) issues a presigned write credential for a fresh
//! object key and persists nothing. Phase 2 (`confirm`) verifies the
//! object arrived and creates the file record. A reservation that is
//! never confirmed leaves no database state behind.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use docvault_core::config::storage::StorageConfig;
use docvault_core::error::AppError;
use docvault_core::result::AppResult;
use docvault_core::sanitize::sanitize_file_name;
use docvault_core::traits::storage::ObjectStorageGateway;
use docvault_database::repositories::{FileStore, FolderStore};
use docvault_entity::file::{CreateFileRecord, FileRecord};
use docvault_entity::folder::Folder;
use docvault_entity::upload::{ReservedUpload, UploadReservation, UploadSpec};

use crate::context::RequestContext;

/// Pause before the single retry of a retryable gateway call.
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Drives the two-phase upload protocol and file object lifecycle.
#[derive(Debug, Clone)]
pub struct UploadCoordinator {
    folders: Arc<dyn FolderStore>,
    files: Arc<dyn FileStore>,
    gateway: Arc<dyn ObjectStorageGateway>,
    config: StorageConfig,
}

impl UploadCoordinator {
    /// Creates a new upload coordinator.
    pub fn new(
        folders: Arc<dyn FolderStore>,
        files: Arc<dyn FileStore>,
        gateway: Arc<dyn ObjectStorageGateway>,
        config: StorageConfig,
    ) -> Self {
        Self {
            folders,
            files,
            gateway,
            config,
        }
    }

    /// Fetch an active folder owned by the caller.
    async fn require_owned_folder(
        &self,
        ctx: &RequestContext,
        folder_id: Uuid,
    ) -> AppResult<Folder> {
        let folder = self
            .folders
            .find_by_id(folder_id)
            .await?
            .filter(|f| f.is_active)
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))?;
        if folder.owner_id != ctx.owner_id {
            return Err(AppError::cross_owner("Folder belongs to another owner"));
        }
        Ok(folder)
    }

    /// Fetch an active file record owned by the caller.
    async fn require_owned_file(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<FileRecord> {
        let file = self
            .files
            .find_by_id(file_id)
            .await?
            .filter(|f| f.is_active)
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))?;
        if file.owner_id != ctx.owner_id {
            return Err(AppError::cross_owner("File belongs to another owner"));
        }
        Ok(file)
    }

    /// Phase 1: reserve an object key and issue a write credential.
    ///
    /// Nothing is persisted; an abandoned reservation costs only an
    /// expired credential.
    pub async fn reserve(
        &self,
        ctx: &RequestContext,
        folder_id: Uuid,
        spec: &UploadSpec,
    ) -> AppResult<ReservedUpload> {
        if spec.size_bytes < 0 {
            return Err(AppError::validation("File size cannot be negative"));
        }
        let sanitized = sanitize_file_name(&spec.file_name);
        if sanitized.is_empty() {
            return Err(AppError::validation(format!(
                "File name '{}' contains no usable characters",
                spec.file_name
            )));
        }

        let folder = self.require_owned_folder(ctx, folder_id).await?;

        // The timestamp keeps repeated uploads of the same name from
        // colliding on the unique storage key.
        let storage_key = format!(
            "{}/{}_{}",
            folder.storage_prefix,
            Utc::now().timestamp_millis(),
            sanitized
        );

        let ttl = Duration::from_secs(self.config.upload_url_ttl_seconds);
        let credential = self
            .with_timeout(
                "issue_write_credential",
                self.gateway.issue_write_credential(&storage_key, ttl),
            )
            .await?;

        info!(
            owner_id = %ctx.owner_id,
            folder_id = %folder_id,
            key = %storage_key,
            gateway = self.gateway.gateway_type(),
            "Upload reserved"
        );

        Ok(ReservedUpload {
            reservation: UploadReservation {
                owner_id: ctx.owner_id,
                folder_id,
                storage_key,
                storage_bucket: credential.bucket.clone(),
                file_name: sanitized,
                original_name: spec.file_name.clone(),
                content_type: spec.content_type.clone(),
                size_bytes: spec.size_bytes,
                metadata: spec.metadata.clone(),
                expires_at: credential.expires_at,
            },
            credential,
        })
    }

    /// Phase 2: verify the object arrived and create the file record.
    ///
    /// Confirming the same reservation twice fails with `Conflict` on
    /// the unique storage key.
    pub async fn confirm(
        &self,
        ctx: &RequestContext,
        reservation: &UploadReservation,
    ) -> AppResult<FileRecord> {
        if reservation.owner_id != ctx.owner_id {
            return Err(AppError::cross_owner(
                "Reservation was issued to another owner",
            ));
        }
        self.require_owned_folder(ctx, reservation.folder_id).await?;

        let present = self
            .retry_once("exists", || self.gateway.exists(&reservation.storage_key))
            .await?;
        if !present {
            return Err(AppError::not_found(format!(
                "No uploaded object at key '{}'",
                reservation.storage_key
            )));
        }

        let file = self
            .files
            .create(&CreateFileRecord {
                owner_id: reservation.owner_id,
                folder_id: reservation.folder_id,
                name: reservation.file_name.clone(),
                original_name: reservation.original_name.clone(),
                storage_key: reservation.storage_key.clone(),
                storage_bucket: reservation.storage_bucket.clone(),
                content_type: reservation.content_type.clone(),
                size_bytes: reservation.size_bytes,
                metadata: reservation.metadata.clone(),
            })
            .await?;

        info!(
            owner_id = %ctx.owner_id,
            file_id = %file.id,
            key = %file.storage_key,
            "Upload confirmed"
        );

        Ok(file)
    }

    /// Move a file into another folder: copy the object to a key under
    /// the target prefix, delete the old object, update the record.
    ///
    /// A delete failure after a successful copy is tolerated; the worst
    /// case is a duplicate object, never a lost one.
    pub async fn move_file(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        target_folder_id: Uuid,
    ) -> AppResult<FileRecord> {
        let file = self.require_owned_file(ctx, file_id).await?;
        let target = self.require_owned_folder(ctx, target_folder_id).await?;

        let new_key = format!(
            "{}/{}_{}",
            target.storage_prefix,
            Utc::now().timestamp_millis(),
            file.name
        );

        self.retry_once("copy", || self.gateway.copy(&file.storage_key, &new_key))
            .await?;

        if let Err(err) = self
            .retry_once("delete", || self.gateway.delete(&file.storage_key))
            .await
        {
            warn!(
                file_id = %file_id,
                key = %file.storage_key,
                error = %err,
                "Old object left behind after move"
            );
        }

        let moved = self.files.relocate(file_id, target.id, &new_key).await?;

        info!(
            owner_id = %ctx.owner_id,
            file_id = %file_id,
            old_key = %file.storage_key,
            new_key = %new_key,
            "File moved"
        );

        Ok(moved)
    }

    /// Replace a file's metadata document.
    pub async fn update_metadata(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        metadata: Option<serde_json::Value>,
    ) -> AppResult<FileRecord> {
        self.require_owned_file(ctx, file_id).await?;
        let updated = self.files.update_metadata(file_id, metadata).await?;
        info!(owner_id = %ctx.owner_id, file_id = %file_id, "File metadata updated");
        Ok(updated)
    }

    /// Issue a presigned download URL for a file.
    pub async fn download_url(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<String> {
        let file = self.require_owned_file(ctx, file_id).await?;
        let ttl = Duration::from_secs(self.config.download_url_ttl_seconds);
        self.with_timeout(
            "issue_read_credential",
            self.gateway.issue_read_credential(&file.storage_key, ttl),
        )
        .await
    }

    /// Delete a file's object, then soft-delete its record.
    ///
    /// An object delete failure surfaces and leaves the record intact,
    /// so the file stays visible until the delete can be retried.
    pub async fn delete_file(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<bool> {
        let file = self.require_owned_file(ctx, file_id).await?;

        self.retry_once("delete", || self.gateway.delete(&file.storage_key))
            .await?;

        let deleted = self.files.soft_delete(file_id).await?;
        info!(
            owner_id = %ctx.owner_id,
            file_id = %file_id,
            key = %file.storage_key,
            "File deleted"
        );
        Ok(deleted)
    }

    /// Run a gateway call under the configured operation timeout.
    async fn with_timeout<T>(
        &self,
        label: &str,
        fut: impl Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        let limit = Duration::from_secs(self.config.operation_timeout_seconds);
        tokio::time::timeout(limit, fut).await.map_err(|_| {
            AppError::storage_unavailable(format!(
                "Storage operation '{label}' timed out after {}s",
                limit.as_secs()
            ))
        })?
    }

    /// Run a gateway call, retrying once after a short pause if the
    /// failure is retryable.
    async fn retry_once<T, F, Fut>(&self, label: &str, op: F) -> AppResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        match self.with_timeout(label, op()).await {
            Err(err) if err.is_retryable() => {
                warn!(error = %err, operation = label, "Storage call failed; retrying");
                tokio::time::sleep(RETRY_BACKOFF).await;
                self.with_timeout(label, op()).await
            }
            other => other,
        }
    }
}
