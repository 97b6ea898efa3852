//! The application-wide result alias.

use crate::error::AppError;

/// Result alias used by every fallible DocVault operation.
pub type AppResult<T> = Result<T, AppError>;
