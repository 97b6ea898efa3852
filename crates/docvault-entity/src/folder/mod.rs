//! Folder entities.

pub mod model;
pub mod tree;

pub use model::{CreateFolder, Folder, PathRewrite};
pub use tree::{FolderTree, FolderTreeNode};
