//! Folder entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A folder in a user's vault hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Folder {
    /// Unique folder identifier.
    pub id: Uuid,
    /// The vault owner. All path invariants are scoped per owner.
    pub owner_id: Uuid,
    /// Parent folder ID (null for root folders).
    pub parent_id: Option<Uuid>,
    /// Display name, user-supplied.
    pub name: String,
    /// Full materialized path (e.g., `docs/taxes`), sanitized and
    /// unique among the owner's active folders.
    pub path: String,
    /// The object-storage key prefix, always `{owner_id}/{path}`.
    pub storage_prefix: String,
    /// Soft-delete flag.
    pub is_active: bool,
    /// Arbitrary metadata (JSON), not interpreted by the core.
    pub metadata: Option<serde_json::Value>,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// When the folder was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    /// Check if this is a root folder (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Data required to create a new folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolder {
    /// The vault owner.
    pub owner_id: Uuid,
    /// Parent folder (None for root).
    pub parent_id: Option<Uuid>,
    /// Display name.
    pub name: String,
    /// Full materialized path.
    pub path: String,
    /// Derived object-storage key prefix.
    pub storage_prefix: String,
    /// Arbitrary metadata.
    pub metadata: Option<serde_json::Value>,
}

/// One entry in a cascading path rewrite during a folder move.
///
/// Rewrites are computed for the whole subtree up front and applied as a
/// single batch; `path` and `storage_prefix` are never patched anywhere
/// else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathRewrite {
    /// The folder to rewrite.
    pub folder_id: Uuid,
    /// The new materialized path.
    pub new_path: String,
    /// The new storage key prefix.
    pub new_storage_prefix: String,
}
