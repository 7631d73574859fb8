//! Identity verifier backed by JWT decoding and a user lookup.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use chathub_core::config::auth::AuthConfig;
use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::traits::{IdentityVerifier, VerifiedIdentity};
use chathub_database::store::UserStore;

use crate::jwt::JwtDecoder;

/// Decodes the bearer token and confirms the user still exists.
#[derive(Debug, Clone)]
pub struct JwtIdentityVerifier {
    decoder: JwtDecoder,
    users: Arc<dyn UserStore>,
}

impl JwtIdentityVerifier {
    /// Create a verifier from auth configuration and the user store.
    pub fn new(config: &AuthConfig, users: Arc<dyn UserStore>) -> Self {
        Self {
            decoder: JwtDecoder::new(config),
            users,
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, token: &str) -> AppResult<VerifiedIdentity> {
        if token.is_empty() {
            return Err(AppError::authentication("No authentication token found"));
        }
        let claims = self.decoder.decode_access_token(token)?;
        let user = self
            .users
            .find_user(claims.user_id)
            .await?
            .ok_or_else(|| AppError::authentication("User not found"))?;

        debug!(user_id = %user.id, "Token verified");
        Ok(VerifiedIdentity {
            user_id: user.id,
            name: Some(user.name),
        })
    }
}
