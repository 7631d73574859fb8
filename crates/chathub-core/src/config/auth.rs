//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Minimum accepted length of the JWT signing secret.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Bearer-token verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT signing (HMAC-SHA256).
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token TTL in minutes (used when minting tokens).
    #[serde(default = "default_access_ttl")]
    pub jwt_access_ttl_minutes: u64,
    /// Clock-skew leeway in seconds applied to `exp`.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_access_ttl_minutes: default_access_ttl(),
            leeway_seconds: default_leeway(),
        }
    }
}

fn default_access_ttl() -> u64 {
    60 * 24 * 7
}

fn default_leeway() -> u64 {
    5
}
