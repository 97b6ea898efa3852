//! In-memory folder store.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use docvault_core::error::AppError;
use docvault_core::result::AppResult;
use docvault_entity::folder::{CreateFolder, Folder, PathRewrite};

use crate::repositories::FolderStore;

/// Folder store backed by a concurrent map.
///
/// Mutations serialize through a single lock so that a relocate batch is
/// validated and applied as one unit, mirroring the Postgres
/// transaction.
#[derive(Debug, Clone, Default)]
pub struct MemoryFolderStore {
    folders: Arc<DashMap<Uuid, Folder>>,
    write_lock: Arc<Mutex<()>>,
}

impl MemoryFolderStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn path_taken(&self, owner_id: Uuid, path: &str, except: Option<Uuid>) -> bool {
        self.folders.iter().any(|entry| {
            let f = entry.value();
            f.owner_id == owner_id && f.is_active && f.path == path && Some(f.id) != except
        })
    }

    fn sorted(&self, mut folders: Vec<Folder>) -> Vec<Folder> {
        folders.sort_by(|a, b| a.path.cmp(&b.path));
        folders
    }
}

#[async_trait]
impl FolderStore for MemoryFolderStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Folder>> {
        Ok(self.folders.get(&id).map(|f| f.clone()))
    }

    async fn find_by_path(&self, owner_id: Uuid, path: &str) -> AppResult<Option<Folder>> {
        Ok(self
            .folders
            .iter()
            .map(|e| e.value().clone())
            .find(|f| f.owner_id == owner_id && f.is_active && f.path == path))
    }

    async fn find_roots(&self, owner_id: Uuid) -> AppResult<Vec<Folder>> {
        let roots = self
            .folders
            .iter()
            .map(|e| e.value().clone())
            .filter(|f| f.owner_id == owner_id && f.is_active && f.parent_id.is_none())
            .collect();
        Ok(self.sorted(roots))
    }

    async fn find_children(&self, parent_id: Uuid) -> AppResult<Vec<Folder>> {
        let children = self
            .folders
            .iter()
            .map(|e| e.value().clone())
            .filter(|f| f.is_active && f.parent_id == Some(parent_id))
            .collect();
        Ok(self.sorted(children))
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<Folder>> {
        let folders = self
            .folders
            .iter()
            .map(|e| e.value().clone())
            .filter(|f| f.owner_id == owner_id && f.is_active)
            .collect();
        Ok(self.sorted(folders))
    }

    async fn find_descendants(&self, folder_id: Uuid) -> AppResult<Vec<Folder>> {
        let all: Vec<Folder> = self
            .folders
            .iter()
            .map(|e| e.value().clone())
            .filter(|f| f.is_active)
            .collect();

        let mut result = Vec::new();
        let mut frontier = vec![folder_id];
        while let Some(parent) = frontier.pop() {
            for f in all.iter().filter(|f| f.parent_id == Some(parent)) {
                frontier.push(f.id);
                result.push(f.clone());
            }
        }
        Ok(self.sorted(result))
    }

    async fn create(&self, data: &CreateFolder) -> AppResult<Folder> {
        let _guard = self.write_lock.lock().expect("folder write lock poisoned");

        if self.path_taken(data.owner_id, &data.path, None) {
            return Err(AppError::conflict(format!(
                "Folder path '{}' already exists",
                data.path
            )));
        }

        let now = Utc::now();
        let folder = Folder {
            id: Uuid::new_v4(),
            owner_id: data.owner_id,
            parent_id: data.parent_id,
            name: data.name.clone(),
            path: data.path.clone(),
            storage_prefix: data.storage_prefix.clone(),
            is_active: true,
            metadata: data.metadata.clone(),
            created_at: now,
            updated_at: now,
        };
        self.folders.insert(folder.id, folder.clone());
        Ok(folder)
    }

    async fn relocate(
        &self,
        folder_id: Uuid,
        new_parent_id: Option<Uuid>,
        new_name: &str,
        new_path: &str,
        new_storage_prefix: &str,
        rewrites: &[PathRewrite],
    ) -> AppResult<Folder> {
        let _guard = self.write_lock.lock().expect("folder write lock poisoned");

        let owner_id = self
            .folders
            .get(&folder_id)
            .map(|f| f.owner_id)
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))?;

        // Validate the whole batch before applying anything, so a
        // failure never leaves a partial rewrite visible.
        let moved: std::collections::HashSet<Uuid> = std::iter::once(folder_id)
            .chain(rewrites.iter().map(|r| r.folder_id))
            .collect();
        if self.folders.iter().any(|entry| {
            let f = entry.value();
            f.owner_id == owner_id
                && f.is_active
                && !moved.contains(&f.id)
                && (f.path == new_path || rewrites.iter().any(|r| r.new_path == f.path))
        }) {
            return Err(AppError::conflict(format!(
                "Folder path '{new_path}' already exists"
            )));
        }
        for rewrite in rewrites {
            if !self.folders.contains_key(&rewrite.folder_id) {
                return Err(AppError::not_found(format!(
                    "Folder {} not found",
                    rewrite.folder_id
                )));
            }
        }

        let now = Utc::now();
        let folder = {
            let mut f = self
                .folders
                .get_mut(&folder_id)
                .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))?;
            f.parent_id = new_parent_id;
            f.name = new_name.to_string();
            f.path = new_path.to_string();
            f.storage_prefix = new_storage_prefix.to_string();
            f.updated_at = now;
            f.clone()
        };

        for rewrite in rewrites {
            if let Some(mut f) = self.folders.get_mut(&rewrite.folder_id) {
                f.path = rewrite.new_path.clone();
                f.storage_prefix = rewrite.new_storage_prefix.clone();
                f.updated_at = now;
            }
        }

        Ok(folder)
    }

    async fn soft_delete(&self, folder_id: Uuid) -> AppResult<bool> {
        let _guard = self.write_lock.lock().expect("folder write lock poisoned");

        match self.folders.get_mut(&folder_id) {
            Some(mut f) if f.is_active => {
                f.is_active = false;
                f.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count_active_children(&self, folder_id: Uuid) -> AppResult<u64> {
        Ok(self
            .folders
            .iter()
            .filter(|e| e.value().is_active && e.value().parent_id == Some(folder_id))
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(owner: Uuid, name: &str, path: &str, parent: Option<Uuid>) -> CreateFolder {
        CreateFolder {
            owner_id: owner,
            parent_id: parent,
            name: name.to_string(),
            path: path.to_string(),
            storage_prefix: format!("{owner}/{path}"),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_active_path() {
        let store = MemoryFolderStore::new();
        let owner = Uuid::new_v4();

        store.create(&spec(owner, "Docs", "docs", None)).await.unwrap();
        let err = store
            .create(&spec(owner, "Docs", "docs", None))
            .await
            .unwrap_err();
        assert_eq!(err.kind, docvault_core::error::ErrorKind::Conflict);

        // A different owner may reuse the path.
        let other = Uuid::new_v4();
        store.create(&spec(other, "Docs", "docs", None)).await.unwrap();
    }

    #[tokio::test]
    async fn test_soft_deleted_path_is_reusable() {
        let store = MemoryFolderStore::new();
        let owner = Uuid::new_v4();

        let folder = store.create(&spec(owner, "Docs", "docs", None)).await.unwrap();
        assert!(store.soft_delete(folder.id).await.unwrap());
        assert!(!store.soft_delete(folder.id).await.unwrap());

        store.create(&spec(owner, "Docs", "docs", None)).await.unwrap();
    }

    #[tokio::test]
    async fn test_relocate_rejects_colliding_batch_without_applying() {
        let store = MemoryFolderStore::new();
        let owner = Uuid::new_v4();

        let a = store.create(&spec(owner, "A", "a", None)).await.unwrap();
        let child = store
            .create(&spec(owner, "Kid", "a/kid", Some(a.id)))
            .await
            .unwrap();
        store.create(&spec(owner, "Taken", "b/kid", None)).await.unwrap();
        let b = store.create(&spec(owner, "B", "b", None)).await.unwrap();

        let rewrites = vec![PathRewrite {
            folder_id: child.id,
            new_path: "b/kid".to_string(),
            new_storage_prefix: format!("{owner}/b/kid"),
        }];
        let err = store
            .relocate(a.id, Some(b.id), "A", "b/a", &format!("{owner}/b/a"), &rewrites)
            .await
            .unwrap_err();
        assert_eq!(err.kind, docvault_core::error::ErrorKind::Conflict);

        // Nothing moved.
        let a_after = store.find_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(a_after.path, "a");
        let child_after = store.find_by_id(child.id).await.unwrap().unwrap();
        assert_eq!(child_after.path, "a/kid");
    }
}
