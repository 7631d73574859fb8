//! Identity verification boundary.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::id::UserId;

/// A user identity that has passed token verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Verified user.
    pub user_id: UserId,
    /// Display name, when the verifier resolved one.
    pub name: Option<String>,
}

/// Turns an opaque bearer token into a verified user identity.
///
/// Implementations fail with an `Authentication` error for bad, expired,
/// or orphaned tokens.
#[async_trait]
pub trait IdentityVerifier: Send + Sync + std::fmt::Debug + 'static {
    /// Verify a bearer token.
    async fn verify(&self, token: &str) -> AppResult<VerifiedIdentity>;
}
