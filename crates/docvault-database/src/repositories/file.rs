//! PostgreSQL file store implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use docvault_core::error::{AppError, ErrorKind};
use docvault_core::result::AppResult;
use docvault_entity::file::{CreateFileRecord, FileRecord};

use super::FileStore;

/// File store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgFileStore {
    pool: PgPool,
}

impl PgFileStore {
    /// Create a new file store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileStore for PgFileStore {
    async fn create(&self, data: &CreateFileRecord) -> AppResult<FileRecord> {
        sqlx::query_as::<_, FileRecord>(
            "INSERT INTO files (owner_id, folder_id, name, original_name, storage_key, \
             storage_bucket, content_type, size_bytes, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        )
        .bind(data.owner_id)
        .bind(data.folder_id)
        .bind(&data.name)
        .bind(&data.original_name)
        .bind(&data.storage_key)
        .bind(&data.storage_bucket)
        .bind(&data.content_type)
        .bind(data.size_bytes)
        .bind(&data.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("files_storage_key_key") =>
            {
                AppError::conflict(format!(
                    "A file record already exists for key '{}'",
                    data.storage_key
                ))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create file record", e),
        })
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<FileRecord>> {
        sqlx::query_as::<_, FileRecord>("SELECT * FROM files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file", e))
    }

    async fn find_by_folder(&self, folder_id: Uuid) -> AppResult<Vec<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM files WHERE folder_id = $1 AND is_active ORDER BY name ASC",
        )
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list folder files", e))
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM files WHERE owner_id = $1 AND is_active ORDER BY created_at ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list owner files", e))
    }

    async fn count_by_folders(&self, folder_ids: &[Uuid]) -> AppResult<HashMap<Uuid, u64>> {
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            "SELECT folder_id, COUNT(*) FROM files \
             WHERE folder_id = ANY($1) AND is_active GROUP BY folder_id",
        )
        .bind(folder_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count files", e))?;

        Ok(rows.into_iter().map(|(id, n)| (id, n as u64)).collect())
    }

    async fn relocate(
        &self,
        file_id: Uuid,
        folder_id: Uuid,
        storage_key: &str,
    ) -> AppResult<FileRecord> {
        sqlx::query_as::<_, FileRecord>(
            "UPDATE files SET folder_id = $2, storage_key = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(file_id)
        .bind(folder_id)
        .bind(storage_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to move file", e))?
        .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))
    }

    async fn update_metadata(
        &self,
        file_id: Uuid,
        metadata: Option<serde_json::Value>,
    ) -> AppResult<FileRecord> {
        sqlx::query_as::<_, FileRecord>(
            "UPDATE files SET metadata = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(file_id)
        .bind(metadata)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update file metadata", e)
        })?
        .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))
    }

    async fn soft_delete(&self, file_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE files SET is_active = FALSE, updated_at = NOW() WHERE id = $1 AND is_active",
        )
        .bind(file_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete file", e))?;
        Ok(result.rows_affected() > 0)
    }
}
