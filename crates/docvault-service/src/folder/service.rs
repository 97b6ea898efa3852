//! Owner-facing folder operations, composed on top of the tree service.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use docvault_core::error::AppError;
use docvault_core::result::AppResult;
use docvault_database::repositories::{FileStore, FolderStore};
use docvault_entity::file::FileRecord;
use docvault_entity::folder::{Folder, FolderTree};

use crate::context::RequestContext;
use crate::folder::tree::{FolderSpec, FolderTreeService};

/// Request to create a single folder.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
}

/// Options for copying a folder.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct CopyFolderRequest {
    /// Name for the copy; defaults to the source folder's name.
    pub new_name: Option<String>,
    /// Parent for the copy; `None` copies to the root.
    pub target_parent_id: Option<Uuid>,
    /// Whether to copy the subtree as well.
    #[serde(default)]
    pub copy_subfolders: bool,
}

/// A folder with its direct children and files.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FolderDetails {
    pub folder: Folder,
    pub subfolders: Vec<Folder>,
    pub files: Vec<FileRecord>,
}

/// Aggregate statistics over an owner's vault, recomputed per call.
#[derive(Debug, Clone, serde::Serialize)]
pub struct VaultStats {
    pub total_folders: u64,
    pub root_folders: u64,
    pub max_depth: u64,
    pub total_files: u64,
    pub total_size_bytes: u64,
}

/// Facade over folder operations for an authenticated owner.
#[derive(Debug, Clone)]
pub struct FolderService {
    folders: Arc<dyn FolderStore>,
    files: Arc<dyn FileStore>,
    tree: FolderTreeService,
}

impl FolderService {
    /// Creates a new folder service.
    pub fn new(folders: Arc<dyn FolderStore>, files: Arc<dyn FileStore>) -> Self {
        let tree = FolderTreeService::new(folders.clone(), files.clone());
        Self {
            folders,
            files,
            tree,
        }
    }

    /// Fetch an active folder and verify it belongs to the caller.
    async fn require_owned(&self, ctx: &RequestContext, folder_id: Uuid) -> AppResult<Folder> {
        let folder = self.tree.require_active(folder_id).await?;
        if folder.owner_id != ctx.owner_id {
            return Err(AppError::cross_owner(
                "Folder belongs to another owner",
            ));
        }
        Ok(folder)
    }

    /// Create a folder for the caller.
    pub async fn create_folder(
        &self,
        ctx: &RequestContext,
        request: CreateFolderRequest,
    ) -> AppResult<Folder> {
        if let Some(parent_id) = request.parent_id {
            self.require_owned(ctx, parent_id).await?;
        }
        self.tree
            .create(ctx.owner_id, &request.name, request.parent_id, request.metadata)
            .await
    }

    /// Create a folder from just a name and optional parent.
    ///
    /// Shorthand for [`create_folder`](Self::create_folder) without
    /// metadata, the common case.
    pub async fn create_simple(
        &self,
        ctx: &RequestContext,
        name: &str,
        parent_id: Option<Uuid>,
    ) -> AppResult<Folder> {
        self.create_folder(
            ctx,
            CreateFolderRequest {
                name: name.to_string(),
                parent_id,
                metadata: None,
            },
        )
        .await
    }

    /// Create a whole hierarchy of folders in one request.
    pub async fn create_hierarchy(
        &self,
        ctx: &RequestContext,
        specs: &[FolderSpec],
    ) -> AppResult<Vec<Folder>> {
        self.tree.bulk_create(ctx.owner_id, specs).await
    }

    /// Move a folder under a new parent, or to the root.
    pub async fn move_folder(
        &self,
        ctx: &RequestContext,
        folder_id: Uuid,
        new_parent_id: Option<Uuid>,
    ) -> AppResult<Folder> {
        self.require_owned(ctx, folder_id).await?;
        self.tree.move_folder(folder_id, new_parent_id).await
    }

    /// Rename a folder, rewriting its own path and every descendant's.
    pub async fn rename_folder(
        &self,
        ctx: &RequestContext,
        folder_id: Uuid,
        new_name: &str,
    ) -> AppResult<Folder> {
        self.require_owned(ctx, folder_id).await?;
        self.tree.rename(folder_id, new_name).await
    }

    /// Copy a folder, and optionally its subtree, under a new parent.
    ///
    /// Copies duplicate folder metadata only; file records and storage
    /// objects are never duplicated or aliased.
    pub async fn copy_folder(
        &self,
        ctx: &RequestContext,
        folder_id: Uuid,
        request: CopyFolderRequest,
    ) -> AppResult<Folder> {
        let source = self.require_owned(ctx, folder_id).await?;
        if let Some(parent_id) = request.target_parent_id {
            self.require_owned(ctx, parent_id).await?;
        }

        // Snapshot the subtree before creating anything, so copies
        // landing inside the source subtree are never rediscovered and
        // copied again. The snapshot lists parents before children.
        let descendants = if request.copy_subfolders {
            self.folders.find_descendants(source.id).await?
        } else {
            Vec::new()
        };

        let root_name = request.new_name.unwrap_or_else(|| source.name.clone());
        let root_copy = self
            .copy_one(ctx.owner_id, &source, &root_name, request.target_parent_id)
            .await?;

        let mut copied = 1u64;
        let mut id_map: HashMap<Uuid, Uuid> = HashMap::new();
        id_map.insert(source.id, root_copy.id);
        for descendant in &descendants {
            let copy_parent_id = descendant
                .parent_id
                .and_then(|pid| id_map.get(&pid).copied())
                .ok_or_else(|| {
                    AppError::internal(format!(
                        "Subtree snapshot listed folder {} before its parent",
                        descendant.id
                    ))
                })?;
            let child_copy = self
                .copy_one(ctx.owner_id, descendant, &descendant.name, Some(copy_parent_id))
                .await?;
            id_map.insert(descendant.id, child_copy.id);
            copied += 1;
        }

        info!(
            owner_id = %ctx.owner_id,
            source_id = %folder_id,
            copy_id = %root_copy.id,
            folders_copied = copied,
            "Folder copied"
        );

        Ok(root_copy)
    }

    /// Create one copy of `source` under `parent_id`, stamping the
    /// metadata with the source folder's id.
    async fn copy_one(
        &self,
        owner_id: Uuid,
        source: &Folder,
        name: &str,
        parent_id: Option<Uuid>,
    ) -> AppResult<Folder> {
        let mut metadata = match &source.metadata {
            Some(serde_json::Value::Object(map)) => map.clone(),
            _ => serde_json::Map::new(),
        };
        metadata.insert(
            "copiedFrom".to_string(),
            serde_json::Value::String(source.id.to_string()),
        );

        self.tree
            .create(
                owner_id,
                name,
                parent_id,
                Some(serde_json::Value::Object(metadata)),
            )
            .await
    }

    /// Soft-delete a folder with no active children.
    pub async fn delete_folder(&self, ctx: &RequestContext, folder_id: Uuid) -> AppResult<bool> {
        self.require_owned(ctx, folder_id).await?;
        self.tree.delete(folder_id).await
    }

    /// The caller's full folder forest with counts.
    pub async fn get_hierarchy(&self, ctx: &RequestContext) -> AppResult<FolderTree> {
        self.tree.build_hierarchy(ctx.owner_id).await
    }

    /// One folder with its direct subfolders and files.
    pub async fn get_folder_details(
        &self,
        ctx: &RequestContext,
        folder_id: Uuid,
    ) -> AppResult<FolderDetails> {
        let folder = self.require_owned(ctx, folder_id).await?;
        let subfolders = self.folders.find_children(folder_id).await?;
        let files = self.files.find_by_folder(folder_id).await?;
        Ok(FolderDetails {
            folder,
            subfolders,
            files,
        })
    }

    /// Aggregate folder and file statistics for the caller's vault.
    pub async fn get_stats(&self, ctx: &RequestContext) -> AppResult<VaultStats> {
        let folders = self.folders.find_by_owner(ctx.owner_id).await?;
        let files = self.files.find_by_owner(ctx.owner_id).await?;

        let parents: HashMap<Uuid, Option<Uuid>> =
            folders.iter().map(|f| (f.id, f.parent_id)).collect();

        let mut max_depth = 0u64;
        for folder in &folders {
            let mut depth = 1u64;
            let mut cursor = folder.parent_id;
            while let Some(parent_id) = cursor {
                depth += 1;
                cursor = parents.get(&parent_id).copied().flatten();
            }
            max_depth = max_depth.max(depth);
        }

        Ok(VaultStats {
            total_folders: folders.len() as u64,
            root_folders: folders.iter().filter(|f| f.parent_id.is_none()).count() as u64,
            max_depth,
            total_files: files.len() as u64,
            total_size_bytes: files.iter().map(|f| f.size_bytes as u64).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use docvault_core::error::ErrorKind;
    use docvault_database::memory::{MemoryFileStore, MemoryFolderStore};
    use docvault_entity::file::CreateFileRecord;

    use super::*;

    fn setup() -> (FolderService, Arc<MemoryFileStore>) {
        let files = Arc::new(MemoryFileStore::new());
        let service = FolderService::new(Arc::new(MemoryFolderStore::new()), files.clone());
        (service, files)
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Uuid::new_v4())
    }

    fn create(name: &str, parent_id: Option<Uuid>) -> CreateFolderRequest {
        CreateFolderRequest {
            name: name.to_string(),
            parent_id,
            metadata: None,
        }
    }

    async fn record_file(
        files: &MemoryFileStore,
        ctx: &RequestContext,
        folder: &Folder,
        name: &str,
        size: i64,
    ) -> FileRecord {
        files
            .create(&CreateFileRecord {
                owner_id: ctx.owner_id,
                folder_id: folder.id,
                name: name.to_string(),
                original_name: name.to_string(),
                storage_key: format!("{}/{name}", folder.storage_prefix),
                storage_bucket: "vault".to_string(),
                content_type: Some("application/pdf".to_string()),
                size_bytes: size,
                metadata: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_cross_owner_access_is_rejected() {
        let (service, _) = setup();
        let alice = ctx();
        let bob = ctx();

        let folder = service
            .create_folder(&alice, create("Docs", None))
            .await
            .unwrap();

        let err = service
            .get_folder_details(&bob, folder.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::CrossOwner);

        let err = service
            .create_folder(&bob, create("Taxes", Some(folder.id)))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::CrossOwner);
    }

    #[tokio::test]
    async fn test_copy_folder_duplicates_subtree_not_files() {
        let (service, files) = setup();
        let ctx = ctx();

        let docs = service.create_folder(&ctx, create("Docs", None)).await.unwrap();
        let taxes = service
            .create_folder(&ctx, create("Taxes", Some(docs.id)))
            .await
            .unwrap();
        record_file(&files, &ctx, &taxes, "w2.pdf", 1024).await;

        let copy = service
            .copy_folder(
                &ctx,
                docs.id,
                CopyFolderRequest {
                    new_name: Some("Docs Backup".to_string()),
                    target_parent_id: None,
                    copy_subfolders: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(copy.path, "docs-backup");
        assert_eq!(
            copy.metadata.as_ref().unwrap()["copiedFrom"],
            docs.id.to_string()
        );

        let details = service.get_folder_details(&ctx, copy.id).await.unwrap();
        assert_eq!(details.subfolders.len(), 1);
        assert_eq!(details.subfolders[0].path, "docs-backup/taxes");

        // The copied taxes folder has no files; only the original does.
        let copied_taxes = &details.subfolders[0];
        assert!(files.find_by_folder(copied_taxes.id).await.unwrap().is_empty());
        assert_eq!(files.find_by_folder(taxes.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_copy_into_itself_terminates_with_one_copy() {
        let (service, _) = setup();
        let ctx = ctx();

        let docs = service.create_simple(&ctx, "Docs", None).await.unwrap();
        service
            .create_simple(&ctx, "Taxes", Some(docs.id))
            .await
            .unwrap();

        // The copy lands inside the folder being copied; only the
        // snapshot taken before copying may be duplicated.
        let copy = service
            .copy_folder(
                &ctx,
                docs.id,
                CopyFolderRequest {
                    new_name: Some("Backup".to_string()),
                    target_parent_id: Some(docs.id),
                    copy_subfolders: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(copy.path, "docs/backup");

        let details = service.get_folder_details(&ctx, copy.id).await.unwrap();
        assert_eq!(details.subfolders.len(), 1);
        assert_eq!(details.subfolders[0].path, "docs/backup/taxes");

        let stats = service.get_stats(&ctx).await.unwrap();
        assert_eq!(stats.total_folders, 4);
    }

    #[tokio::test]
    async fn test_copy_into_own_descendant_terminates() {
        let (service, _) = setup();
        let ctx = ctx();

        let docs = service.create_simple(&ctx, "Docs", None).await.unwrap();
        let taxes = service
            .create_simple(&ctx, "Taxes", Some(docs.id))
            .await
            .unwrap();

        let copy = service
            .copy_folder(
                &ctx,
                docs.id,
                CopyFolderRequest {
                    new_name: None,
                    target_parent_id: Some(taxes.id),
                    copy_subfolders: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(copy.path, "docs/taxes/docs");

        let details = service.get_folder_details(&ctx, copy.id).await.unwrap();
        assert_eq!(details.subfolders.len(), 1);
        assert_eq!(details.subfolders[0].path, "docs/taxes/docs/taxes");

        let stats = service.get_stats(&ctx).await.unwrap();
        assert_eq!(stats.total_folders, 4);
    }

    #[tokio::test]
    async fn test_copy_without_subfolders_is_shallow() {
        let (service, _) = setup();
        let ctx = ctx();

        let docs = service.create_folder(&ctx, create("Docs", None)).await.unwrap();
        service
            .create_folder(&ctx, create("Taxes", Some(docs.id)))
            .await
            .unwrap();

        let copy = service
            .copy_folder(
                &ctx,
                docs.id,
                CopyFolderRequest {
                    new_name: Some("Flat".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let details = service.get_folder_details(&ctx, copy.id).await.unwrap();
        assert!(details.subfolders.is_empty());
    }

    #[tokio::test]
    async fn test_stats_aggregate_depth_and_sizes() {
        let (service, files) = setup();
        let ctx = ctx();

        let docs = service.create_folder(&ctx, create("Docs", None)).await.unwrap();
        let taxes = service
            .create_folder(&ctx, create("Taxes", Some(docs.id)))
            .await
            .unwrap();
        let y2023 = service
            .create_folder(&ctx, create("2023", Some(taxes.id)))
            .await
            .unwrap();
        service.create_folder(&ctx, create("Archive", None)).await.unwrap();

        record_file(&files, &ctx, &y2023, "w2.pdf", 1024).await;
        record_file(&files, &ctx, &docs, "notes.txt", 76).await;

        let stats = service.get_stats(&ctx).await.unwrap();
        assert_eq!(stats.total_folders, 4);
        assert_eq!(stats.root_folders, 2);
        assert_eq!(stats.max_depth, 3);
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.total_size_bytes, 1100);
    }
}
