//! # docvault-storage
//!
//! Implementations of the [`ObjectStorageGateway`] trait from
//! `docvault-core`: an S3-compatible gateway built on presigned URLs,
//! and an in-memory gateway for embedding and tests.
//!
//! [`ObjectStorageGateway`]: docvault_core::traits::storage::ObjectStorageGateway

pub mod gateways;

pub use gateways::memory::MemoryObjectStorageGateway;
pub use gateways::s3::S3ObjectStorageGateway;
