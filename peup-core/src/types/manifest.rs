//! Service manifests.
//!
//! A manifest tells a caller how to reach the service behind a scope and how
//! long that answer may be cached.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CACHE_TTL, MAX_CACHE_TTL_SECONDS};
use crate::error::{PeupError, Result};

/// Transport spoken by a service endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain HTTP
    Http,
    /// HTTP over TLS
    Https,
    /// gRPC over HTTP/2
    Grpc,
    /// WebSocket
    Ws,
    /// WebSocket over TLS
    Wss,
}

impl Protocol {
    /// Returns the wire name of the protocol.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Grpc => "grpc",
            Protocol::Ws => "ws",
            Protocol::Wss => "wss",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and how to call a service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    /// Absolute URL of the service
    pub url: String,
    /// Transport protocol
    pub protocol: Protocol,
    /// Per-call timeout the service expects, in milliseconds
    #[serde(alias = "timeoutMs")]
    pub timeout_ms: u64,
}

impl ServiceEndpoint {
    /// Creates an endpoint description.
    pub fn new(url: impl Into<String>, protocol: Protocol, timeout_ms: u64) -> Self {
        Self {
            url: url.into(),
            protocol,
            timeout_ms,
        }
    }
}

/// Descriptive metadata and cache policy of a service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMetadata {
    /// Human-readable service name
    pub name: String,
    /// How long a resolution may be cached; 0 means "use the default"
    #[serde(default, alias = "cacheTtlSeconds")]
    pub cache_ttl_seconds: u64,
}

impl ServiceMetadata {
    /// Creates service metadata.
    pub fn new(name: impl Into<String>, cache_ttl_seconds: u64) -> Self {
        Self {
            name: name.into(),
            cache_ttl_seconds,
        }
    }
}

/// A resolvable service description.
///
/// Manifests are values: a new resolution produces a new `Manifest`, and the
/// cache hands them out behind an `Arc` so nobody mutates a shared copy.
///
/// # JSON
/// ```text
/// { "service_id": "svc1", "version": "1.0",
///   "endpoint": { "url": "http://x", "protocol": "http", "timeout_ms": 5000 },
///   "metadata": { "name": "svc1", "cache_ttl_seconds": 2 } }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Stable service identifier
    #[serde(alias = "serviceId")]
    pub service_id: String,
    /// Manifest version
    pub version: String,
    /// How to reach the service
    pub endpoint: ServiceEndpoint,
    /// Name and cache policy
    pub metadata: ServiceMetadata,
}

impl Manifest {
    /// Creates a new manifest.
    pub fn new(
        service_id: impl Into<String>,
        version: impl Into<String>,
        endpoint: ServiceEndpoint,
        metadata: ServiceMetadata,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            version: version.into(),
            endpoint,
            metadata,
        }
    }

    /// Returns how long this manifest may be cached.
    ///
    /// A zero TTL falls back to [`DEFAULT_CACHE_TTL`]; it never means
    /// "do not cache" nor "cache forever".
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl_or(DEFAULT_CACHE_TTL)
    }

    /// Returns how long this manifest may be cached, using `default` when the
    /// manifest does not advertise a lifetime. Lifetimes beyond
    /// [`MAX_CACHE_TTL_SECONDS`] are clamped.
    pub fn cache_ttl_or(&self, default: Duration) -> Duration {
        match self.metadata.cache_ttl_seconds {
            0 => default,
            secs => Duration::from_secs(secs.min(MAX_CACHE_TTL_SECONDS)),
        }
    }

    /// Validates the manifest structure.
    pub fn validate(&self) -> Result<()> {
        if self.service_id.trim().is_empty() {
            return Err(PeupError::InvalidManifest("service_id cannot be empty".into()));
        }

        if self.version.trim().is_empty() {
            return Err(PeupError::InvalidManifest(format!(
                "version cannot be empty (service '{}')",
                self.service_id
            )));
        }

        url::Url::parse(&self.endpoint.url).map_err(|e| {
            PeupError::InvalidManifest(format!(
                "endpoint url '{}' is not valid: {}",
                self.endpoint.url, e
            ))
        })?;

        if self.endpoint.timeout_ms == 0 {
            return Err(PeupError::InvalidManifest(format!(
                "endpoint timeout_ms must be positive (service '{}')",
                self.service_id
            )));
        }

        Ok(())
    }

    /// Parses a manifest from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serializes to the compact binary encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| PeupError::BinarySerializationError(e.to_string()))
    }

    /// Deserializes from the compact binary encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| PeupError::BinarySerializationError(e.to_string()))
    }
}
