//! Store traits and their PostgreSQL implementations.
//!
//! `path` and `storage_prefix` are denormalized columns. The only write
//! paths that touch them are [`FolderStore::create`] and
//! [`FolderStore::relocate`]; everything else treats them as read-only
//! projections.

pub mod file;
pub mod folder;

pub use file::PgFileStore;
pub use folder::PgFolderStore;

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use docvault_core::result::AppResult;
use docvault_entity::file::{CreateFileRecord, FileRecord};
use docvault_entity::folder::{CreateFolder, Folder, PathRewrite};

/// Persistence seam for folder nodes.
#[async_trait]
pub trait FolderStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a folder by ID (active or not).
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Folder>>;

    /// Find an active folder by owner and materialized path.
    async fn find_by_path(&self, owner_id: Uuid, path: &str) -> AppResult<Option<Folder>>;

    /// List an owner's active root folders.
    async fn find_roots(&self, owner_id: Uuid) -> AppResult<Vec<Folder>>;

    /// List active direct children of a folder.
    async fn find_children(&self, parent_id: Uuid) -> AppResult<Vec<Folder>>;

    /// List all of an owner's active folders.
    async fn find_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<Folder>>;

    /// List all active descendants of a folder, parents before children.
    async fn find_descendants(&self, folder_id: Uuid) -> AppResult<Vec<Folder>>;

    /// Create a new folder. An active path collision within the owner
    /// fails with `Conflict`.
    async fn create(&self, data: &CreateFolder) -> AppResult<Folder>;

    /// Reparent and/or rename a folder and rewrite its whole subtree in
    /// one transaction.
    ///
    /// Either the folder row and every rewrite land together, or none
    /// do. Path uniqueness is re-enforced inside the same transaction
    /// that performs the updates.
    async fn relocate(
        &self,
        folder_id: Uuid,
        new_parent_id: Option<Uuid>,
        new_name: &str,
        new_path: &str,
        new_storage_prefix: &str,
        rewrites: &[PathRewrite],
    ) -> AppResult<Folder>;

    /// Soft-delete a folder. Returns `true` if a row changed.
    async fn soft_delete(&self, folder_id: Uuid) -> AppResult<bool>;

    /// Count a folder's active children.
    async fn count_active_children(&self, folder_id: Uuid) -> AppResult<u64>;
}

/// Persistence seam for file records.
#[async_trait]
pub trait FileStore: Send + Sync + std::fmt::Debug + 'static {
    /// Create a file record. A duplicate storage key fails with
    /// `Conflict`.
    async fn create(&self, data: &CreateFileRecord) -> AppResult<FileRecord>;

    /// Find a file record by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<FileRecord>>;

    /// List active files in a folder.
    async fn find_by_folder(&self, folder_id: Uuid) -> AppResult<Vec<FileRecord>>;

    /// List all of an owner's active files.
    async fn find_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<FileRecord>>;

    /// Count active files per folder for a set of folders.
    async fn count_by_folders(&self, folder_ids: &[Uuid]) -> AppResult<HashMap<Uuid, u64>>;

    /// Point a file at a new folder and storage key.
    async fn relocate(
        &self,
        file_id: Uuid,
        folder_id: Uuid,
        storage_key: &str,
    ) -> AppResult<FileRecord>;

    /// Replace a file's metadata document.
    async fn update_metadata(
        &self,
        file_id: Uuid,
        metadata: Option<serde_json::Value>,
    ) -> AppResult<FileRecord>;

    /// Soft-delete a file record. Returns `true` if a row changed.
    async fn soft_delete(&self, file_id: Uuid) -> AppResult<bool>;
}
