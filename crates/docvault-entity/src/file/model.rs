//! File record entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A stored document.
///
/// A row exists only after its object has been confirmed present in the
/// object store; the two-phase upload protocol is the sole write path
/// that creates one.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileRecord {
    /// Unique file identifier.
    pub id: Uuid,
    /// The vault owner.
    pub owner_id: Uuid,
    /// The active folder containing this file, owned by the same owner.
    pub folder_id: Uuid,
    /// Sanitized file name used in the storage key.
    pub name: String,
    /// The name the file was uploaded with.
    pub original_name: String,
    /// The object-storage key, unique across all records.
    pub storage_key: String,
    /// The bucket the object lives in.
    pub storage_bucket: String,
    /// MIME type, if the client reported one.
    pub content_type: Option<String>,
    /// File size in bytes.
    pub size_bytes: i64,
    /// Soft-delete flag.
    pub is_active: bool,
    /// Arbitrary metadata (JSON).
    pub metadata: Option<serde_json::Value>,
    /// When the record was created (i.e., when the upload was confirmed).
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    /// Get the file extension (lowercase), if any.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit('.')
            .next()
            .filter(|ext| *ext != self.name)
            .map(|ext| ext.to_lowercase())
    }
}

/// Data required to create a new file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFileRecord {
    /// The vault owner.
    pub owner_id: Uuid,
    /// The folder to place the file in.
    pub folder_id: Uuid,
    /// Sanitized file name.
    pub name: String,
    /// Original upload name.
    pub original_name: String,
    /// The object-storage key.
    pub storage_key: String,
    /// The bucket.
    pub storage_bucket: String,
    /// MIME type.
    pub content_type: Option<String>,
    /// File size in bytes.
    pub size_bytes: i64,
    /// Arbitrary metadata.
    pub metadata: Option<serde_json::Value>,
}
