//! Collaborator contracts for PEUP.
//!
//! The resolution cache only depends on these traits. Concrete registries
//! live in `peup-registry`; tests plug in counting stubs.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Deadline, Intent, Manifest};

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRY TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Authoritative source of manifests.
///
/// Implementations might use:
/// - In-memory maps (for testing/development)
/// - A directory of manifest files
/// - A remote service-discovery endpoint
#[async_trait]
pub trait ManifestRegistry: Send + Sync {
    /// Looks up the manifest for `scope`.
    ///
    /// Must return [`PeupError::NotFound`](crate::PeupError::NotFound) when the
    /// scope is unknown and an upstream-class error when the registry answered
    /// with unusable data. Implementations should give up once `deadline`
    /// passes; the caller enforces it as well.
    async fn lookup(&self, scope: &str, deadline: Deadline) -> Result<Manifest>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "registry"
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FALLBACK TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Secondary, non-authoritative manifest source.
///
/// Consulted only after the registry failed. Its answers are never cached.
///
/// It shares the resolution deadline with the registry. After a registry
/// timeout that deadline has already passed, so only a fallback that answers
/// without awaiting anything (such as a preloaded static manifest) still gets
/// through; one that does its own I/O fails with `UpstreamTimeout`.
#[async_trait]
pub trait FallbackResolver: Send + Sync {
    /// Produces a substitute manifest for `scope`.
    async fn resolve_fallback(&self, scope: &str, deadline: Deadline) -> Result<Manifest>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// INTENT INTERPRETER TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Turns free text into a structured intent.
///
/// Runs upstream of the cache; the gateway ships no implementation.
#[async_trait]
pub trait IntentInterpreter: Send + Sync {
    /// Interprets `text` as an intent.
    async fn interpret(&self, text: &str) -> Result<Intent>;
}
