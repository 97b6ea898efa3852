//! Folder tree maintenance: path derivation, cycle detection, cascading
//! path rewrites, and hierarchy-ordered bulk creation.
//!
//! This module is the single writer of `path` and `storage_prefix`.
//! Both are projections of the tree shape; every mutating operation
//! recomputes them here and nowhere else.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use docvault_core::error::AppError;
use docvault_core::result::AppResult;
use docvault_core::sanitize::sanitize_folder_name;
use docvault_database::repositories::{FileStore, FolderStore};
use docvault_entity::folder::{CreateFolder, Folder, FolderTree, FolderTreeNode, PathRewrite};

/// One folder in a bulk-creation request.
///
/// Folders reference each other by caller-supplied temporary ids, since
/// real ids are not minted until creation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FolderSpec {
    /// Caller-supplied id, unique within the request.
    pub temp_id: String,
    /// Temporary id of the parent spec (None for a root folder).
    pub parent_temp_id: Option<String>,
    /// Display name.
    pub name: String,
    /// Arbitrary metadata.
    pub metadata: Option<serde_json::Value>,
}

/// Maintains tree invariants and computes materialized paths.
#[derive(Debug, Clone)]
pub struct FolderTreeService {
    /// Folder store.
    folders: Arc<dyn FolderStore>,
    /// File store, for per-folder counts in hierarchy views.
    files: Arc<dyn FileStore>,
}

impl FolderTreeService {
    /// Creates a new tree service.
    pub fn new(folders: Arc<dyn FolderStore>, files: Arc<dyn FileStore>) -> Self {
        Self { folders, files }
    }

    /// Fetch a folder that must exist and be active.
    pub(crate) async fn require_active(&self, folder_id: Uuid) -> AppResult<Folder> {
        self.folders
            .find_by_id(folder_id)
            .await?
            .filter(|f| f.is_active)
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))
    }

    /// Derive the materialized path and storage prefix for a name under
    /// an optional parent, failing with `Conflict` if an active folder
    /// already owns the path.
    pub async fn resolve_path(
        &self,
        owner_id: Uuid,
        name: &str,
        parent: Option<&Folder>,
    ) -> AppResult<(String, String)> {
        let segment = sanitize_folder_name(name);
        if segment.is_empty() {
            return Err(AppError::validation(format!(
                "Folder name '{name}' contains no usable characters"
            )));
        }

        let path = match parent {
            Some(parent) => format!("{}/{}", parent.path, segment),
            None => segment,
        };

        if self.folders.find_by_path(owner_id, &path).await?.is_some() {
            return Err(AppError::conflict(format!(
                "A folder at path '{path}' already exists"
            )));
        }

        let storage_prefix = format!("{owner_id}/{path}");
        Ok((path, storage_prefix))
    }

    /// Create a folder under an optional parent.
    pub async fn create(
        &self,
        owner_id: Uuid,
        name: &str,
        parent_id: Option<Uuid>,
        metadata: Option<serde_json::Value>,
    ) -> AppResult<Folder> {
        if name.trim().is_empty() {
            return Err(AppError::validation("Folder name cannot be empty"));
        }

        let parent = match parent_id {
            Some(parent_id) => {
                let parent = self.require_active(parent_id).await?;
                if parent.owner_id != owner_id {
                    return Err(AppError::cross_owner(
                        "Parent folder belongs to another owner",
                    ));
                }
                Some(parent)
            }
            None => None,
        };

        let (path, storage_prefix) = self
            .resolve_path(owner_id, name, parent.as_ref())
            .await?;

        let folder = self
            .folders
            .create(&CreateFolder {
                owner_id,
                parent_id,
                name: name.to_string(),
                path,
                storage_prefix,
                metadata,
            })
            .await?;

        info!(
            owner_id = %owner_id,
            folder_id = %folder.id,
            path = %folder.path,
            "Folder created"
        );

        Ok(folder)
    }

    /// Move a folder under a new parent (or to the root).
    ///
    /// The whole subtree's paths and storage prefixes are recomputed up
    /// front, validated, and applied through one store transaction, so
    /// a failure never leaves a partially rewritten tree.
    pub async fn move_folder(
        &self,
        folder_id: Uuid,
        new_parent_id: Option<Uuid>,
    ) -> AppResult<Folder> {
        let folder = self.require_active(folder_id).await?;

        let parent = match new_parent_id {
            Some(parent_id) => {
                if parent_id == folder_id {
                    return Err(AppError::cycle("Cannot move a folder into itself"));
                }
                let parent = self.require_active(parent_id).await?;
                if parent.owner_id != folder.owner_id {
                    return Err(AppError::cross_owner(
                        "Cannot move a folder to another owner's folder",
                    ));
                }
                self.assert_not_descendant(folder_id, &parent).await?;
                Some(parent)
            }
            None => None,
        };

        let (new_path, new_prefix) = {
            let segment = sanitize_folder_name(&folder.name);
            let path = match &parent {
                Some(parent) => format!("{}/{}", parent.path, segment),
                None => segment,
            };
            let prefix = format!("{}/{}", folder.owner_id, path);
            (path, prefix)
        };

        if let Some(existing) = self
            .folders
            .find_by_path(folder.owner_id, &new_path)
            .await?
        {
            if existing.id != folder_id {
                return Err(AppError::conflict(format!(
                    "A folder at path '{new_path}' already exists"
                )));
            }
        }

        let rewrites = self.rewrite_batch(&folder, &new_path).await?;

        let moved = self
            .folders
            .relocate(
                folder_id,
                new_parent_id,
                &folder.name,
                &new_path,
                &new_prefix,
                &rewrites,
            )
            .await?;

        info!(
            owner_id = %moved.owner_id,
            folder_id = %folder_id,
            old_path = %folder.path,
            new_path = %moved.path,
            descendants = rewrites.len(),
            "Folder moved"
        );

        Ok(moved)
    }

    /// Rename a folder in place, rewriting its own path and every
    /// descendant's.
    pub async fn rename(&self, folder_id: Uuid, new_name: &str) -> AppResult<Folder> {
        if new_name.trim().is_empty() {
            return Err(AppError::validation("Folder name cannot be empty"));
        }
        let folder = self.require_active(folder_id).await?;

        let segment = sanitize_folder_name(new_name);
        if segment.is_empty() {
            return Err(AppError::validation(format!(
                "Folder name '{new_name}' contains no usable characters"
            )));
        }

        let new_path = match folder.parent_id {
            Some(parent_id) => {
                let parent = self.require_active(parent_id).await?;
                format!("{}/{}", parent.path, segment)
            }
            None => segment,
        };
        let new_prefix = format!("{}/{}", folder.owner_id, new_path);

        if let Some(existing) = self
            .folders
            .find_by_path(folder.owner_id, &new_path)
            .await?
        {
            if existing.id != folder_id {
                return Err(AppError::conflict(format!(
                    "A folder at path '{new_path}' already exists"
                )));
            }
        }

        let rewrites = self.rewrite_batch(&folder, &new_path).await?;

        let renamed = self
            .folders
            .relocate(
                folder_id,
                folder.parent_id,
                new_name,
                &new_path,
                &new_prefix,
                &rewrites,
            )
            .await?;

        info!(
            owner_id = %renamed.owner_id,
            folder_id = %folder_id,
            old_path = %folder.path,
            new_path = %renamed.path,
            descendants = rewrites.len(),
            "Folder renamed"
        );

        Ok(renamed)
    }

    /// Two-pass rewrite: compute every descendant's new path under
    /// `new_path` before any row is touched, so the whole batch can go
    /// through the store transaction at once.
    async fn rewrite_batch(&self, folder: &Folder, new_path: &str) -> AppResult<Vec<PathRewrite>> {
        let descendants = self.folders.find_descendants(folder.id).await?;
        let old_root = folder.path.as_str();
        let mut rewrites = Vec::with_capacity(descendants.len());
        for descendant in &descendants {
            let suffix = descendant.path.strip_prefix(old_root).ok_or_else(|| {
                AppError::internal(format!(
                    "Descendant path '{}' does not extend '{old_root}'",
                    descendant.path
                ))
            })?;
            let rewritten = format!("{new_path}{suffix}");
            rewrites.push(PathRewrite {
                folder_id: descendant.id,
                new_storage_prefix: format!("{}/{}", descendant.owner_id, rewritten),
                new_path: rewritten,
            });
        }
        Ok(rewrites)
    }

    /// Walk the destination's ancestor chain and fail with `Cycle` if
    /// the folder being moved appears in it.
    async fn assert_not_descendant(&self, folder_id: Uuid, new_parent: &Folder) -> AppResult<()> {
        let mut seen = HashSet::new();
        let mut cursor = Some(new_parent.clone());
        while let Some(ancestor) = cursor {
            if ancestor.id == folder_id {
                return Err(AppError::cycle(
                    "Cannot move a folder into one of its descendants",
                ));
            }
            if !seen.insert(ancestor.id) {
                return Err(AppError::cycle(format!(
                    "Ancestor chain of folder {} already contains a cycle",
                    new_parent.id
                )));
            }
            cursor = match ancestor.parent_id {
                Some(parent_id) => self.folders.find_by_id(parent_id).await?,
                None => None,
            };
        }
        Ok(())
    }

    /// Create a set of folders that reference each other by temporary
    /// ids, parents before children.
    pub async fn bulk_create(
        &self,
        owner_id: Uuid,
        specs: &[FolderSpec],
    ) -> AppResult<Vec<Folder>> {
        let order = sort_by_hierarchy(specs)?;

        let mut created = Vec::with_capacity(order.len());
        let mut id_map: HashMap<&str, Uuid> = HashMap::new();
        for index in order {
            let spec = &specs[index];
            let parent_id = match &spec.parent_temp_id {
                Some(temp_id) => Some(*id_map.get(temp_id.as_str()).ok_or_else(|| {
                    AppError::validation(format!(
                        "Spec '{}' references unknown parent '{temp_id}'",
                        spec.temp_id
                    ))
                })?),
                None => None,
            };

            let folder = self
                .create(owner_id, &spec.name, parent_id, spec.metadata.clone())
                .await?;
            id_map.insert(spec.temp_id.as_str(), folder.id);
            created.push(folder);
        }

        info!(owner_id = %owner_id, count = created.len(), "Folder hierarchy created");
        Ok(created)
    }

    /// Soft-delete a folder with no active children.
    pub async fn delete(&self, folder_id: Uuid) -> AppResult<bool> {
        let folder = self.require_active(folder_id).await?;

        if self.folders.count_active_children(folder_id).await? > 0 {
            return Err(AppError::not_empty(
                "Cannot delete a folder with subfolders; delete the subfolders first",
            ));
        }

        let deleted = self.folders.soft_delete(folder_id).await?;
        info!(folder_id = %folder_id, path = %folder.path, "Folder deleted");
        Ok(deleted)
    }

    /// Build the owner's full folder forest with child and file counts.
    pub async fn build_hierarchy(&self, owner_id: Uuid) -> AppResult<FolderTree> {
        let folders = self.folders.find_by_owner(owner_id).await?;
        if folders.is_empty() {
            return Ok(FolderTree::empty());
        }

        let ids: Vec<Uuid> = folders.iter().map(|f| f.id).collect();
        let file_counts = self.files.count_by_folders(&ids).await?;

        let total = folders.len() as u64;
        let roots = folders
            .iter()
            .filter(|f| f.parent_id.is_none())
            .map(|root| build_node(root, &folders, &file_counts))
            .collect();

        Ok(FolderTree {
            roots,
            total_folders: total,
        })
    }
}

/// Build one view node and its subtree from the flat folder list.
fn build_node(
    folder: &Folder,
    all: &[Folder],
    file_counts: &HashMap<Uuid, u64>,
) -> FolderTreeNode {
    let children: Vec<FolderTreeNode> = all
        .iter()
        .filter(|f| f.parent_id == Some(folder.id))
        .map(|child| build_node(child, all, file_counts))
        .collect();

    FolderTreeNode {
        id: folder.id,
        name: folder.name.clone(),
        path: folder.path.clone(),
        child_count: children.len() as u64,
        file_count: *file_counts.get(&folder.id).unwrap_or(&0),
        children,
    }
}

/// Topologically sort specs so parents precede children, failing with
/// `Cycle` on circular temp-id references.
fn sort_by_hierarchy(specs: &[FolderSpec]) -> AppResult<Vec<usize>> {
    let index_of: HashMap<&str, usize> = specs
        .iter()
        .enumerate()
        .map(|(i, s)| (s.temp_id.as_str(), i))
        .collect();

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        Visiting,
        Done,
    }

    fn visit(
        index: usize,
        specs: &[FolderSpec],
        index_of: &HashMap<&str, usize>,
        marks: &mut Vec<Mark>,
        order: &mut Vec<usize>,
    ) -> AppResult<()> {
        match marks[index] {
            Mark::Done => return Ok(()),
            Mark::Visiting => {
                return Err(AppError::cycle(format!(
                    "Folder spec '{}' participates in a temp-id cycle",
                    specs[index].temp_id
                )));
            }
            Mark::Unvisited => {}
        }

        marks[index] = Mark::Visiting;
        if let Some(parent_temp_id) = &specs[index].parent_temp_id {
            if let Some(&parent_index) = index_of.get(parent_temp_id.as_str()) {
                visit(parent_index, specs, index_of, marks, order)?;
            }
        }
        marks[index] = Mark::Done;
        order.push(index);
        Ok(())
    }

    let mut marks = vec![Mark::Unvisited; specs.len()];
    let mut order = Vec::with_capacity(specs.len());
    for index in 0..specs.len() {
        visit(index, specs, &index_of, &mut marks, &mut order)?;
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use docvault_core::error::ErrorKind;
    use docvault_database::memory::{MemoryFileStore, MemoryFolderStore};

    use super::*;

    fn service() -> FolderTreeService {
        FolderTreeService::new(
            Arc::new(MemoryFolderStore::new()),
            Arc::new(MemoryFileStore::new()),
        )
    }

    fn spec(temp_id: &str, parent: Option<&str>, name: &str) -> FolderSpec {
        FolderSpec {
            temp_id: temp_id.to_string(),
            parent_temp_id: parent.map(str::to_string),
            name: name.to_string(),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_paths_derive_from_parents() {
        let tree = service();
        let owner = Uuid::new_v4();

        let docs = tree.create(owner, "Docs", None, None).await.unwrap();
        assert_eq!(docs.path, "docs");
        assert_eq!(docs.storage_prefix, format!("{owner}/docs"));

        let taxes = tree
            .create(owner, "Taxes", Some(docs.id), None)
            .await
            .unwrap();
        assert_eq!(taxes.path, "docs/taxes");
        assert_eq!(taxes.storage_prefix, format!("{owner}/docs/taxes"));
    }

    #[tokio::test]
    async fn test_duplicate_path_conflicts() {
        let tree = service();
        let owner = Uuid::new_v4();

        tree.create(owner, "Docs", None, None).await.unwrap();
        // A different display name sanitizing to the same segment
        // collides too.
        let err = tree.create(owner, "DOCS", None, None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_move_rewrites_whole_subtree() {
        let tree = service();
        let owner = Uuid::new_v4();

        let docs = tree.create(owner, "Docs", None, None).await.unwrap();
        let taxes = tree
            .create(owner, "Taxes", Some(docs.id), None)
            .await
            .unwrap();
        let y2023 = tree
            .create(owner, "2023", Some(taxes.id), None)
            .await
            .unwrap();
        let receipts = tree
            .create(owner, "Receipts", Some(y2023.id), None)
            .await
            .unwrap();
        let archive = tree.create(owner, "Archive", None, None).await.unwrap();

        let moved = tree
            .move_folder(taxes.id, Some(archive.id))
            .await
            .unwrap();
        assert_eq!(moved.path, "archive/taxes");
        assert_eq!(moved.storage_prefix, format!("{owner}/archive/taxes"));

        let y2023 = tree.require_active(y2023.id).await.unwrap();
        assert_eq!(y2023.path, "archive/taxes/2023");
        assert_eq!(y2023.storage_prefix, format!("{owner}/archive/taxes/2023"));

        let receipts = tree.require_active(receipts.id).await.unwrap();
        assert_eq!(receipts.path, "archive/taxes/2023/receipts");
    }

    #[tokio::test]
    async fn test_rename_rewrites_descendants() {
        let tree = service();
        let owner = Uuid::new_v4();

        let docs = tree.create(owner, "Docs", None, None).await.unwrap();
        let taxes = tree
            .create(owner, "Taxes", Some(docs.id), None)
            .await
            .unwrap();
        let y2023 = tree
            .create(owner, "2023", Some(taxes.id), None)
            .await
            .unwrap();

        let renamed = tree.rename(docs.id, "My Stuff").await.unwrap();
        assert_eq!(renamed.name, "My Stuff");
        assert_eq!(renamed.path, "my-stuff");
        assert_eq!(renamed.storage_prefix, format!("{owner}/my-stuff"));

        let taxes = tree.require_active(taxes.id).await.unwrap();
        assert_eq!(taxes.path, "my-stuff/taxes");
        let y2023 = tree.require_active(y2023.id).await.unwrap();
        assert_eq!(y2023.path, "my-stuff/taxes/2023");
        assert_eq!(y2023.storage_prefix, format!("{owner}/my-stuff/taxes/2023"));
    }

    #[tokio::test]
    async fn test_rename_collision_conflicts() {
        let tree = service();
        let owner = Uuid::new_v4();

        let docs = tree.create(owner, "Docs", None, None).await.unwrap();
        let archive = tree.create(owner, "Archive", None, None).await.unwrap();

        let err = tree.rename(archive.id, "Docs").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        // Renaming to a name that sanitizes to the folder's own path is
        // a display-name change, not a collision.
        let renamed = tree.rename(docs.id, "DOCS").await.unwrap();
        assert_eq!(renamed.name, "DOCS");
        assert_eq!(renamed.path, "docs");
    }

    #[tokio::test]
    async fn test_move_to_root() {
        let tree = service();
        let owner = Uuid::new_v4();

        let docs = tree.create(owner, "Docs", None, None).await.unwrap();
        let taxes = tree
            .create(owner, "Taxes", Some(docs.id), None)
            .await
            .unwrap();

        let moved = tree.move_folder(taxes.id, None).await.unwrap();
        assert_eq!(moved.path, "taxes");
        assert!(moved.parent_id.is_none());
    }

    #[tokio::test]
    async fn test_move_into_self_or_descendant_is_a_cycle() {
        let tree = service();
        let owner = Uuid::new_v4();

        let docs = tree.create(owner, "Docs", None, None).await.unwrap();
        let taxes = tree
            .create(owner, "Taxes", Some(docs.id), None)
            .await
            .unwrap();
        let archive = tree.create(owner, "Archive", None, None).await.unwrap();

        let moved = tree
            .move_folder(taxes.id, Some(archive.id))
            .await
            .unwrap();

        let err = tree
            .move_folder(taxes.id, Some(taxes.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cycle);

        let err = tree
            .move_folder(archive.id, Some(taxes.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cycle);

        // The tree is unchanged from after the first move.
        let taxes = tree.require_active(taxes.id).await.unwrap();
        assert_eq!(taxes.path, moved.path);
        let archive = tree.require_active(archive.id).await.unwrap();
        assert_eq!(archive.path, "archive");
    }

    #[tokio::test]
    async fn test_move_under_own_descendant_fails() {
        let tree = service();
        let owner = Uuid::new_v4();

        let a = tree.create(owner, "A", None, None).await.unwrap();
        let b = tree.create(owner, "B", Some(a.id), None).await.unwrap();
        let c = tree.create(owner, "C", Some(b.id), None).await.unwrap();

        let err = tree.move_folder(a.id, Some(c.id)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cycle);

        let a = tree.require_active(a.id).await.unwrap();
        assert_eq!(a.path, "a");
    }

    #[tokio::test]
    async fn test_move_across_owners_fails() {
        let tree = service();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();

        let mine = tree.create(owner, "Mine", None, None).await.unwrap();
        let theirs = tree.create(other, "Theirs", None, None).await.unwrap();

        let err = tree
            .move_folder(mine.id, Some(theirs.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::CrossOwner);
    }

    #[tokio::test]
    async fn test_move_destination_collision_conflicts() {
        let tree = service();
        let owner = Uuid::new_v4();

        let docs = tree.create(owner, "Docs", None, None).await.unwrap();
        let taxes = tree
            .create(owner, "Taxes", Some(docs.id), None)
            .await
            .unwrap();
        let archive = tree.create(owner, "Archive", None, None).await.unwrap();
        tree.create(owner, "Taxes", Some(archive.id), None)
            .await
            .unwrap();

        let err = tree
            .move_folder(taxes.id, Some(archive.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let taxes = tree.require_active(taxes.id).await.unwrap();
        assert_eq!(taxes.path, "docs/taxes");
    }

    #[tokio::test]
    async fn test_delete_requires_empty_folder() {
        let tree = service();
        let owner = Uuid::new_v4();

        let docs = tree.create(owner, "Docs", None, None).await.unwrap();
        let taxes = tree
            .create(owner, "Taxes", Some(docs.id), None)
            .await
            .unwrap();

        let err = tree.delete(docs.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotEmpty);

        assert!(tree.delete(taxes.id).await.unwrap());
        assert!(tree.delete(docs.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_bulk_create_orders_parents_first() {
        let tree = service();
        let owner = Uuid::new_v4();

        // Children listed before their parents on purpose.
        let specs = vec![
            spec("grandchild", Some("child"), "2023"),
            spec("child", Some("root"), "Taxes"),
            spec("root", None, "Docs"),
        ];
        let created = tree.bulk_create(owner, &specs).await.unwrap();
        assert_eq!(created.len(), 3);

        let paths: Vec<&str> = created.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["docs", "docs/taxes", "docs/taxes/2023"]);
    }

    #[tokio::test]
    async fn test_bulk_create_detects_temp_id_cycle() {
        let tree = service();
        let owner = Uuid::new_v4();

        let specs = vec![spec("a", Some("b"), "A"), spec("b", Some("a"), "B")];
        let err = tree.bulk_create(owner, &specs).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cycle);
    }

    #[tokio::test]
    async fn test_hierarchy_counts_children() {
        let tree = service();
        let owner = Uuid::new_v4();

        let docs = tree.create(owner, "Docs", None, None).await.unwrap();
        tree.create(owner, "Taxes", Some(docs.id), None)
            .await
            .unwrap();
        tree.create(owner, "Bills", Some(docs.id), None)
            .await
            .unwrap();
        tree.create(owner, "Archive", None, None).await.unwrap();

        let hierarchy = tree.build_hierarchy(owner).await.unwrap();
        assert_eq!(hierarchy.total_folders, 4);
        assert_eq!(hierarchy.roots.len(), 2);

        let docs_node = hierarchy
            .roots
            .iter()
            .find(|n| n.path == "docs")
            .unwrap();
        assert_eq!(docs_node.child_count, 2);
    }
}
