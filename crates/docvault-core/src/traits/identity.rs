//! Identity verification traits.
//!
//! Authentication itself is an external collaborator; the core only
//! needs a verified subject and a mapping from subject to owner.

use async_trait::async_trait;
use uuid::Uuid;

use crate::result::AppResult;

/// The result of verifying an identity token.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VerifiedIdentity {
    /// The external subject identifier (e.g., an IdP UID).
    pub subject_id: String,
}

/// Verifies bearer tokens issued by the identity provider.
#[async_trait]
pub trait IdentityVerifier: Send + Sync + std::fmt::Debug + 'static {
    /// Verify a token and return the subject it was issued to.
    ///
    /// Fails with an `Authentication` error on an invalid or expired
    /// token.
    async fn verify(&self, token: &str) -> AppResult<VerifiedIdentity>;
}

/// Maps external subject identifiers to vault owner ids.
#[async_trait]
pub trait OwnerDirectory: Send + Sync + std::fmt::Debug + 'static {
    /// Look up the owner id registered for a subject, if any.
    async fn owner_for_subject(&self, subject_id: &str) -> AppResult<Option<Uuid>>;
}
