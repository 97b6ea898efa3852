//! Collaborator traits consumed by the DocVault core.

pub mod identity;
pub mod storage;

pub use identity::{IdentityVerifier, OwnerDirectory, VerifiedIdentity};
pub use storage::{ObjectStorageGateway, WriteCredential};
