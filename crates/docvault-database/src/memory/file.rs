//! In-memory file store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use docvault_core::error::AppError;
use docvault_core::result::AppResult;
use docvault_entity::file::{CreateFileRecord, FileRecord};

use crate::repositories::FileStore;

/// File store backed by a concurrent map.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileStore {
    files: Arc<DashMap<Uuid, FileRecord>>,
    write_lock: Arc<Mutex<()>>,
}

impl MemoryFileStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn create(&self, data: &CreateFileRecord) -> AppResult<FileRecord> {
        let _guard = self.write_lock.lock().expect("file write lock poisoned");

        if self
            .files
            .iter()
            .any(|e| e.value().storage_key == data.storage_key)
        {
            return Err(AppError::conflict(format!(
                "A file record already exists for key '{}'",
                data.storage_key
            )));
        }

        let now = Utc::now();
        let file = FileRecord {
            id: Uuid::new_v4(),
            owner_id: data.owner_id,
            folder_id: data.folder_id,
            name: data.name.clone(),
            original_name: data.original_name.clone(),
            storage_key: data.storage_key.clone(),
            storage_bucket: data.storage_bucket.clone(),
            content_type: data.content_type.clone(),
            size_bytes: data.size_bytes,
            is_active: true,
            metadata: data.metadata.clone(),
            created_at: now,
            updated_at: now,
        };
        self.files.insert(file.id, file.clone());
        Ok(file)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<FileRecord>> {
        Ok(self.files.get(&id).map(|f| f.clone()))
    }

    async fn find_by_folder(&self, folder_id: Uuid) -> AppResult<Vec<FileRecord>> {
        let mut files: Vec<FileRecord> = self
            .files
            .iter()
            .map(|e| e.value().clone())
            .filter(|f| f.is_active && f.folder_id == folder_id)
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<FileRecord>> {
        let mut files: Vec<FileRecord> = self
            .files
            .iter()
            .map(|e| e.value().clone())
            .filter(|f| f.is_active && f.owner_id == owner_id)
            .collect();
        files.sort_by_key(|f| f.created_at);
        Ok(files)
    }

    async fn count_by_folders(&self, folder_ids: &[Uuid]) -> AppResult<HashMap<Uuid, u64>> {
        let mut counts = HashMap::new();
        for entry in self.files.iter() {
            let f = entry.value();
            if f.is_active && folder_ids.contains(&f.folder_id) {
                *counts.entry(f.folder_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn relocate(
        &self,
        file_id: Uuid,
        folder_id: Uuid,
        storage_key: &str,
    ) -> AppResult<FileRecord> {
        let _guard = self.write_lock.lock().expect("file write lock poisoned");

        let mut file = self
            .files
            .get_mut(&file_id)
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))?;
        file.folder_id = folder_id;
        file.storage_key = storage_key.to_string();
        file.updated_at = Utc::now();
        Ok(file.clone())
    }

    async fn update_metadata(
        &self,
        file_id: Uuid,
        metadata: Option<serde_json::Value>,
    ) -> AppResult<FileRecord> {
        let _guard = self.write_lock.lock().expect("file write lock poisoned");

        let mut file = self
            .files
            .get_mut(&file_id)
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))?;
        file.metadata = metadata;
        file.updated_at = Utc::now();
        Ok(file.clone())
    }

    async fn soft_delete(&self, file_id: Uuid) -> AppResult<bool> {
        let _guard = self.write_lock.lock().expect("file write lock poisoned");

        match self.files.get_mut(&file_id) {
            Some(mut f) if f.is_active => {
                f.is_active = false;
                f.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
