//! Schema migrations for the folders and files tables.
//!
//! Embedded at compile time from the workspace `migrations/` directory
//! and applied by [`DatabasePool::connect`](crate::DatabasePool) unless
//! `auto_migrate` is off.

use sqlx::PgPool;
use tracing::info;

use docvault_core::error::{AppError, ErrorKind};
use docvault_core::result::AppResult;

/// Apply any migrations the database has not seen yet.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    let migrator = sqlx::migrate!("../../migrations");
    info!(known = migrator.iter().count(), "Applying schema migrations");

    migrator
        .run(pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Schema migration failed", e))?;

    info!("Schema is up to date");
    Ok(())
}
