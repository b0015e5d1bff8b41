//! Remote service-discovery registry.
//!
//! Speaks plain HTTP: `GET {base_url}/manifests/{scope}` returns the manifest
//! as JSON, 404 means the scope is unknown.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use peup_core::error::{PeupError, Result};
use peup_core::traits::ManifestRegistry;
use peup_core::types::{Deadline, Manifest};

/// HTTP registry configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpRegistryConfig {
    /// Base URL of the discovery service (e.g. "http://discovery:9000")
    pub base_url: String,
    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl HttpRegistryConfig {
    /// Creates a config for `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout_ms: 2_000,
        }
    }
}

/// Registry backed by a remote discovery service.
pub struct HttpRegistry {
    base_url: url::Url,
    http_client: reqwest::Client,
}

impl HttpRegistry {
    /// Creates a registry for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(HttpRegistryConfig::new(base_url))
    }

    /// Creates a registry with custom configuration.
    pub fn with_config(config: HttpRegistryConfig) -> Result<Self> {
        let base_url = url::Url::parse(&config.base_url).map_err(|e| {
            PeupError::ConfigError(format!("invalid registry url '{}': {}", config.base_url, e))
        })?;

        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_millis(config.connect_timeout_ms))
            .build()
            .map_err(|e| PeupError::ConfigError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    /// Returns the URL queried for `scope`.
    pub fn url_for(&self, scope: &str) -> Result<url::Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PeupError::ConfigError("registry url cannot be a base".into()))?
            .pop_if_empty()
            .extend(["manifests", scope.trim()]);
        Ok(url)
    }
}

#[async_trait]
impl ManifestRegistry for HttpRegistry {
    #[instrument(skip(self, deadline))]
    async fn lookup(&self, scope: &str, deadline: Deadline) -> Result<Manifest> {
        let url = self.url_for(scope)?;
        let budget_ms = deadline.remaining().as_millis() as u64;
        debug!(%url, budget_ms, "Querying registry");

        let response = self
            .http_client
            .get(url)
            .timeout(deadline.remaining())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PeupError::UpstreamTimeout {
                        scope: scope.to_string(),
                        timeout_ms: budget_ms,
                    }
                } else {
                    PeupError::HttpError(e.to_string())
                }
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(PeupError::NotFound(scope.to_string())),
            status if !status.is_success() => {
                warn!(%status, "Registry answered with an error");
                return Err(PeupError::HttpError(format!("registry returned HTTP {}", status)));
            }
            _ => {}
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| PeupError::HttpError(e.to_string()))?;

        Manifest::from_json(&body)
            .map_err(|e| PeupError::UpstreamError(format!("registry sent an unreadable manifest: {}", e)))
    }

    fn name(&self) -> &str {
        "http"
    }
}
