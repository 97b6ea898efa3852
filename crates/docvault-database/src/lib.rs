//! # docvault-database
//!
//! PostgreSQL connection management, the `FolderStore`/`FileStore`
//! traits, their concrete Postgres implementations, and in-memory
//! implementations for embedding and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use repositories::{FileStore, FolderStore};
