//! # docvault-core
//!
//! Core crate for DocVault. Contains collaborator traits, configuration
//! schemas, name sanitization, and the unified error system.
//!
//! This crate has **no** internal dependencies on other DocVault crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod result;
pub mod sanitize;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
