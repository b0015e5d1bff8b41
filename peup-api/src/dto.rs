//! DTOs for API responses.

use chrono::{DateTime, Utc};
use serde::Serialize;
use peup_core::types::{Manifest, Resolution, ResolutionSource};

/// A resolved manifest with provenance.
#[derive(Debug, Serialize)]
pub struct ResolvedManifestResponse {
    /// Requested scope
    pub scope: String,
    /// Where the manifest came from
    pub source: ResolutionSource,
    /// Seconds until the cache entry expires (absent for fallback results)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_seconds: Option<u64>,
    /// When the resolution happened
    pub resolved_at: DateTime<Utc>,
    /// The manifest
    pub manifest: Manifest,
}

impl ResolvedManifestResponse {
    /// Builds the response for `scope`.
    pub fn new(scope: &str, resolution: &Resolution) -> Self {
        Self {
            scope: scope.to_string(),
            source: resolution.source,
            expires_in_seconds: resolution.expires_in().map(|d| d.as_secs()),
            resolved_at: resolution.resolved_at,
            manifest: resolution.manifest.as_ref().clone(),
        }
    }
}

/// Response for invalidating one scope.
#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    /// Scope that was invalidated
    pub scope: String,
    /// Whether a cached entry existed
    pub removed: bool,
}

/// Response for clearing the cache.
#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    /// Number of entries dropped
    pub cleared: usize,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status
    pub status: String,
    /// Version
    pub version: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// Registry backend in use
    pub registry: String,
    /// Whether a fallback resolver is configured
    pub fallback: bool,
    /// Fresh entries in the manifest cache
    pub cached_entries: usize,
}
