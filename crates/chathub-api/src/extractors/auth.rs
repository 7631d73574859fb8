//! `AuthUser` extractor: pulls the bearer token from the Authorization
//! header and resolves it through the identity verifier.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use chathub_core::error::AppError;
use chathub_core::traits::VerifiedIdentity;
use chathub_core::types::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// Extracted authenticated user available in handlers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub VerifiedIdentity);

impl AuthUser {
    /// The authenticated user's id.
    pub fn user_id(&self) -> UserId {
        self.0.user_id
    }
}

/// The token of an `Authorization: Bearer <token>` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::authentication("Missing or malformed Authorization header"))?;
        let identity = state.verifier.verify(token).await?;
        Ok(AuthUser(identity))
    }
}
