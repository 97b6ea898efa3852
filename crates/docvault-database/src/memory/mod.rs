//! In-memory store implementations.
//!
//! Back the same traits as the Postgres stores, for embedding and for
//! exercising the tree and upload logic without a database.

pub mod file;
pub mod folder;

pub use file::MemoryFileStore;
pub use folder::MemoryFolderStore;
