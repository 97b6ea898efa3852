//! Object storage gateway implementations.

pub mod memory;
pub mod s3;
