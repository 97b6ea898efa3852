//! Upload reservation metadata.
//!
//! Phase 1 of the upload protocol issues a write credential and this
//! reservation; no database row exists until phase 2 confirms the
//! object is in place. An abandoned reservation leaves no stored state,
//! only an expired credential.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use docvault_core::traits::storage::WriteCredential;

/// The state machine for one upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    /// The client has asked to upload.
    Requested,
    /// A credential is issued; nothing is persisted.
    Reserved,
    /// The file record exists. Terminal.
    Confirmed,
    /// The client never confirmed. Terminal, no side effects.
    Abandoned,
}

/// What a client wants to upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSpec {
    /// Original file name.
    pub file_name: String,
    /// MIME type, if known.
    pub content_type: Option<String>,
    /// Size in bytes, as reported by the client.
    pub size_bytes: i64,
    /// Arbitrary metadata to attach to the record on confirm.
    pub metadata: Option<serde_json::Value>,
}

/// Everything the caller must echo back in the confirm phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReservation {
    /// The owner the reservation was issued to.
    pub owner_id: Uuid,
    /// The destination folder.
    pub folder_id: Uuid,
    /// The reserved object key (`{storage_prefix}/{timestamp}_{name}`).
    pub storage_key: String,
    /// The destination bucket.
    pub storage_bucket: String,
    /// Sanitized file name embedded in the key.
    pub file_name: String,
    /// The name the client supplied.
    pub original_name: String,
    /// MIME type.
    pub content_type: Option<String>,
    /// Size in bytes.
    pub size_bytes: i64,
    /// Metadata to attach on confirm.
    pub metadata: Option<serde_json::Value>,
    /// When the write credential expires.
    pub expires_at: DateTime<Utc>,
}

/// Phase-1 result: the credential plus the reservation to echo back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservedUpload {
    /// The short-lived write credential.
    pub credential: WriteCredential,
    /// Metadata for the confirm phase.
    pub reservation: UploadReservation,
}
