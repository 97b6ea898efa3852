//! Per-request context.

use uuid::Uuid;

use docvault_core::error::AppError;
use docvault_core::traits::identity::{IdentityVerifier, OwnerDirectory};

/// The authenticated context a request runs under.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The vault owner all operations are scoped to.
    pub owner_id: Uuid,
}

impl RequestContext {
    /// Build a context for an already-resolved owner.
    pub fn new(owner_id: Uuid) -> Self {
        Self { owner_id }
    }

    /// Verify a bearer token and resolve the owner it belongs to.
    pub async fn authenticate(
        verifier: &dyn IdentityVerifier,
        directory: &dyn OwnerDirectory,
        token: &str,
    ) -> Result<Self, AppError> {
        let identity = verifier.verify(token).await?;
        let owner_id = directory
            .owner_for_subject(&identity.subject_id)
            .await?
            .ok_or_else(|| {
                AppError::authentication(format!(
                    "No vault owner registered for subject '{}'",
                    identity.subject_id
                ))
            })?;
        Ok(Self::new(owner_id))
    }
}
