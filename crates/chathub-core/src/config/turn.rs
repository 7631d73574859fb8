//! TURN/STUN credential broker configuration.

use serde::{Deserialize, Serialize};

/// Settings for the hosted TURN provider (Xirsys-compatible API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Account identifier used as the basic-auth user.
    #[serde(default = "default_ident")]
    pub ident: String,
    /// Account secret. Empty disables remote lookups.
    #[serde(default)]
    pub secret: String,
    /// Channel name appended to the request path.
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Provider base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    /// How long successful credentials are reused, in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    /// Public STUN servers appended to provider results.
    #[serde(default = "default_public_stun")]
    pub public_stun_urls: Vec<String>,
    /// STUN servers served when the provider is unavailable.
    #[serde(default = "default_fallback_stun")]
    pub fallback_stun_urls: Vec<String>,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            ident: default_ident(),
            secret: String::new(),
            channel: default_channel(),
            base_url: default_base_url(),
            request_timeout_seconds: default_timeout(),
            cache_ttl_seconds: default_cache_ttl(),
            public_stun_urls: default_public_stun(),
            fallback_stun_urls: default_fallback_stun(),
        }
    }
}

fn default_ident() -> String {
    "chathub".to_string()
}

fn default_channel() -> String {
    "chathub".to_string()
}

fn default_base_url() -> String {
    "https://global.xirsys.net".to_string()
}

fn default_timeout() -> u64 {
    5
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_public_stun() -> Vec<String> {
    vec![
        "stun:stun.l.google.com:19302".to_string(),
        "stun:stun1.l.google.com:19302".to_string(),
    ]
}

fn default_fallback_stun() -> Vec<String> {
    vec![
        "stun:stun.l.google.com:19302".to_string(),
        "stun:stun1.l.google.com:19302".to_string(),
        "stun:stun2.l.google.com:19302".to_string(),
    ]
}
