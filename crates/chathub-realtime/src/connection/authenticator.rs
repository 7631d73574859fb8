//! WebSocket authentication: resolves the handshake token to a user.

use std::sync::Arc;

use tracing::warn;

use chathub_core::error::AppError;
use chathub_core::traits::{IdentityVerifier, VerifiedIdentity};

/// Authenticates WebSocket handshakes through the identity verifier.
#[derive(Debug, Clone)]
pub struct WsAuthenticator {
    verifier: Arc<dyn IdentityVerifier>,
}

impl WsAuthenticator {
    /// Creates a new WebSocket authenticator.
    pub fn new(verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self { verifier }
    }

    /// Verifies the bearer token presented during the handshake.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<VerifiedIdentity, AppError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::authentication("No authentication token found"))?;

        self.verifier.verify(token).await.inspect_err(|e| {
            warn!(error = %e, "WebSocket handshake rejected");
        })
    }
}
