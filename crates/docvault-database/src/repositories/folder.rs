//! PostgreSQL folder store implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use docvault_core::error::{AppError, ErrorKind};
use docvault_core::result::AppResult;
use docvault_entity::folder::{CreateFolder, Folder, PathRewrite};

use super::FolderStore;

/// Folder store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgFolderStore {
    pool: PgPool,
}

impl PgFolderStore {
    /// Create a new folder store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a unique-violation on the active (owner_id, path) index to a
/// conflict, anything else to a database error.
fn map_folder_error(e: sqlx::Error, path: &str) -> AppError {
    match e {
        sqlx::Error::Database(ref db_err)
            if db_err.constraint() == Some("folders_owner_id_path_active_key") =>
        {
            AppError::conflict(format!("Folder path '{path}' already exists"))
        }
        _ => AppError::with_source(ErrorKind::Database, "Folder write failed", e),
    }
}

#[async_trait]
impl FolderStore for PgFolderStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find folder", e))
    }

    async fn find_by_path(&self, owner_id: Uuid, path: &str) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE owner_id = $1 AND path = $2 AND is_active",
        )
        .bind(owner_id)
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find folder by path", e)
        })
    }

    async fn find_roots(&self, owner_id: Uuid) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders \
             WHERE owner_id = $1 AND parent_id IS NULL AND is_active ORDER BY name ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list root folders", e))
    }

    async fn find_children(&self, parent_id: Uuid) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE parent_id = $1 AND is_active ORDER BY name ASC",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list children", e))
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE owner_id = $1 AND is_active ORDER BY path ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list folders", e))
    }

    async fn find_descendants(&self, folder_id: Uuid) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "WITH RECURSIVE tree AS ( \
                SELECT * FROM folders WHERE id = $1 \
                UNION ALL \
                SELECT f.* FROM folders f INNER JOIN tree t ON f.parent_id = t.id \
                WHERE f.is_active \
             ) SELECT * FROM tree WHERE id != $1 ORDER BY path ASC",
        )
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list descendants", e))
    }

    async fn create(&self, data: &CreateFolder) -> AppResult<Folder> {
        sqlx::query_as::<_, Folder>(
            "INSERT INTO folders (owner_id, parent_id, name, path, storage_prefix, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(data.owner_id)
        .bind(data.parent_id)
        .bind(&data.name)
        .bind(&data.path)
        .bind(&data.storage_prefix)
        .bind(&data.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_folder_error(e, &data.path))
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
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let folder = sqlx::query_as::<_, Folder>(
            "UPDATE folders SET parent_id = $2, name = $3, path = $4, storage_prefix = $5, \
             updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(folder_id)
        .bind(new_parent_id)
        .bind(new_name)
        .bind(new_path)
        .bind(new_storage_prefix)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_folder_error(e, new_path))?
        .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))?;

        for rewrite in rewrites {
            sqlx::query(
                "UPDATE folders SET path = $2, storage_prefix = $3, updated_at = NOW() \
                 WHERE id = $1",
            )
            .bind(rewrite.folder_id)
            .bind(&rewrite.new_path)
            .bind(&rewrite.new_storage_prefix)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_folder_error(e, &rewrite.new_path))?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit folder move", e)
        })?;

        Ok(folder)
    }

    async fn soft_delete(&self, folder_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE folders SET is_active = FALSE, updated_at = NOW() \
             WHERE id = $1 AND is_active",
        )
        .bind(folder_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete folder", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_active_children(&self, folder_id: Uuid) -> AppResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM folders WHERE parent_id = $1 AND is_active")
                .bind(folder_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count children", e)
                })?;
        Ok(count as u64)
    }
}
