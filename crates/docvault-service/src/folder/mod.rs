//! Folder hierarchy services.

pub mod service;
pub mod tree;
