//! Resolution results.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Manifest;

/// Where a resolved manifest came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    /// A fresh cache entry
    Cache,
    /// The authoritative registry
    Registry,
    /// The non-authoritative fallback (never cached)
    Fallback,
}

impl ResolutionSource {
    /// Returns the wire name of the source.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionSource::Cache => "cache",
            ResolutionSource::Registry => "registry",
            ResolutionSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved manifest with provenance.
#[derive(Clone, Debug)]
pub struct Resolution {
    /// The manifest
    pub manifest: Arc<Manifest>,
    /// Where it came from
    pub source: ResolutionSource,
    /// When the cache entry backing it expires (`None` for fallback results)
    pub expires_at: Option<Instant>,
    /// Wall-clock time of the resolution
    pub resolved_at: DateTime<Utc>,
}

impl Resolution {
    /// Creates a resolution stamped with the current time.
    pub fn new(manifest: Arc<Manifest>, source: ResolutionSource, expires_at: Option<Instant>) -> Self {
        Self {
            manifest,
            source,
            expires_at,
            resolved_at: Utc::now(),
        }
    }

    /// Returns how long the backing cache entry stays fresh.
    pub fn expires_in(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Returns true if this manifest did not come from the registry path.
    pub fn is_degraded(&self) -> bool {
        self.source == ResolutionSource::Fallback
    }
}
