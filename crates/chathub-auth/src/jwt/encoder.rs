//! JWT token creation.
//!
//! Login lives outside this service; the encoder exists for local tooling
//! and tests that need a token the decoder accepts.

use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};

use chathub_core::config::auth::AuthConfig;
use chathub_core::error::AppError;
use chathub_core::types::UserId;

use super::claims::Claims;

/// Upper bound on the configured access TTL (ten years).
const MAX_ACCESS_TTL_MINUTES: i64 = 10 * 365 * 24 * 60;

/// Creates signed HS256 access tokens.
#[derive(Clone)]
pub struct JwtEncoder {
    encoding_key: EncodingKey,
    access_ttl_minutes: i64,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .finish()
    }
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl_minutes: i64::try_from(config.jwt_access_ttl_minutes)
                .unwrap_or(MAX_ACCESS_TTL_MINUTES)
                .min(MAX_ACCESS_TTL_MINUTES),
        }
    }

    /// Generates an access token for `user_id` using the configured TTL.
    pub fn generate_access_token(
        &self,
        user_id: UserId,
    ) -> Result<(String, DateTime<Utc>), AppError> {
        let exp = Utc::now() + chrono::Duration::minutes(self.access_ttl_minutes);
        let token = self.encode_with_expiry(user_id, exp)?;
        Ok((token, exp))
    }

    /// Generates a token expiring at an explicit instant.
    pub fn encode_with_expiry(
        &self,
        user_id: UserId,
        exp: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = Claims {
            user_id,
            iat: Utc::now().timestamp(),
            exp: exp.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode access token: {e}")))
    }
}
