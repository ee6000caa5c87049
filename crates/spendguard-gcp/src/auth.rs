//! Bearer-token acquisition for outbound Google API calls.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::GcpError;

/// Default instance metadata server, reachable from GCE and Cloud Run.
pub const METADATA_BASE_URL: &str = "http://metadata.google.internal";

const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// Supplies an OAuth access token for one outbound call.
///
/// Tokens are requested fresh per call; nothing is cached across requests.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// A currently-valid bearer token.
    async fn access_token(&self) -> Result<String, GcpError>;
}

/// Fetches tokens from the instance metadata server.
#[derive(Debug, Clone)]
pub struct MetadataTokenProvider {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl MetadataTokenProvider {
    /// Provider against the real metadata server.
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: METADATA_BASE_URL.to_string(),
        }
    }

    /// Override the metadata endpoint (tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl AccessTokenProvider for MetadataTokenProvider {
    async fn access_token(&self) -> Result<String, GcpError> {
        let url = format!("{}{TOKEN_PATH}", self.base_url);
        let response = self
            .http
            .get(url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| GcpError::Token(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GcpError::Token(format!("status {status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GcpError::Token(e.to_string()))?;
        Ok(token.access_token)
    }
}

/// Fixed token, for tests and local development.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Wrap a pre-obtained token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, GcpError> {
        Ok(self.token.clone())
    }
}
