//! # docvault-service
//!
//! Business logic for DocVault. The folder tree service maintains the
//! per-owner hierarchy invariants, the upload coordinator drives the
//! two-phase upload protocol, and the folder service composes both
//! behind the operations a caller needs.

pub mod context;
pub mod folder;
pub mod upload;

pub use context::RequestContext;
pub use folder::service::FolderService;
pub use folder::tree::FolderTreeService;
pub use upload::coordinator::UploadCoordinator;
