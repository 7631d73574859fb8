//! TURN/STUN broker backed by a Xirsys-compatible provider.

use std::time::Duration;

use moka::future::Cache;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use chathub_core::config::turn::TurnConfig;
use chathub_core::error::{AppError, ErrorKind};
use chathub_core::result::AppResult;

/// Provider name reported when remote credentials were obtained.
pub const PROVIDER_REMOTE: &str = "xirsys";
/// Provider name reported for the STUN-only fallback.
pub const PROVIDER_FALLBACK: &str = "fallback-stun-only";
/// Lifetime advertised for remote credentials, in seconds.
pub const REMOTE_TTL_SECS: u64 = 86_400;
/// Lifetime advertised for the fallback list, in seconds.
pub const FALLBACK_TTL_SECS: u64 = 3_600;

/// `urls` is either one URL or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IceUrls {
    /// A single URL.
    One(String),
    /// Several URLs sharing the same credentials.
    Many(Vec<String>),
}

/// One entry of an `RTCConfiguration.iceServers` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    /// Server URL(s).
    pub urls: IceUrls,
    /// TURN username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// TURN credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServer {
    /// A credential-less STUN entry.
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: IceUrls::One(url.into()),
            username: None,
            credential: None,
        }
    }
}

/// ICE servers handed to a WebRTC client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceServers {
    /// Servers in preference order.
    pub ice_servers: Vec<IceServer>,
    /// Seconds the credentials stay valid.
    pub ttl: u64,
    /// Where the list came from.
    pub provider: String,
}

#[derive(Debug, Deserialize)]
struct ProviderEnvelope {
    s: String,
    #[serde(default)]
    v: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderServers {
    ice_servers: Vec<IceServer>,
}

/// Fetches TURN credentials, caching successful answers.
///
/// Never fails: any provider problem degrades to a STUN-only list, which
/// works everywhere except behind symmetric NAT.
#[derive(Debug, Clone)]
pub struct TurnService {
    client: Client,
    config: TurnConfig,
    cache: Cache<String, IceServers>,
}

impl TurnService {
    /// Creates the broker and its HTTP client.
    pub fn new(config: TurnConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds.max(1)))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build TURN client", e)
            })?;
        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(Duration::from_secs(config.cache_ttl_seconds.max(1)))
            .build();

        if config.secret.is_empty() {
            warn!("TURN secret not configured, serving STUN-only ICE servers");
        }

        Ok(Self {
            client,
            config,
            cache,
        })
    }

    /// ICE servers for a client about to negotiate a call.
    pub async fn ice_servers(&self) -> IceServers {
        if self.config.secret.is_empty() {
            return self.fallback();
        }
        if self.config.cache_ttl_seconds == 0 {
            return self.fetch_remote().await.unwrap_or_else(|e| {
                error!(error = %e, "Failed to fetch TURN credentials");
                self.fallback()
            });
        }

        let key = self.config.channel.clone();
        match self.cache.try_get_with(key, self.fetch_remote()).await {
            Ok(servers) => servers,
            Err(e) => {
                error!(error = %e, "Failed to fetch TURN credentials");
                self.fallback()
            }
        }
    }

    /// Drops any cached credentials.
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }

    async fn fetch_remote(&self) -> AppResult<IceServers> {
        let url = format!(
            "{}/_turn/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.channel
        );
        debug!(url = %url, "Fetching TURN credentials");

        let response = self
            .client
            .put(&url)
            .basic_auth(&self.config.ident, Some(&self.config.secret))
            .json(&json!({}))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                AppError::with_source(ErrorKind::ExternalService, "TURN provider request failed", e)
            })?;
        let envelope: ProviderEnvelope = response.json().await.map_err(|e| {
            AppError::with_source(ErrorKind::ExternalService, "TURN provider sent invalid JSON", e)
        })?;
        if envelope.s != "ok" {
            return Err(AppError::external_service(format!(
                "TURN provider returned status {:?}",
                envelope.s
            )));
        }
        let ProviderServers { mut ice_servers } = serde_json::from_value(envelope.v)
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::ExternalService,
                    "TURN provider response has no ICE servers",
                    e,
                )
            })?;

        info!(count = ice_servers.len(), "Fetched TURN credentials");
        ice_servers.extend(self.config.public_stun_urls.iter().map(IceServer::stun));
        Ok(IceServers {
            ice_servers,
            ttl: REMOTE_TTL_SECS,
            provider: PROVIDER_REMOTE.to_string(),
        })
    }

    fn fallback(&self) -> IceServers {
        IceServers {
            ice_servers: self
                .config
                .fallback_stun_urls
                .iter()
                .map(IceServer::stun)
                .collect(),
            ttl: FALLBACK_TTL_SECS,
            provider: PROVIDER_FALLBACK.to_string(),
        }
    }
}
