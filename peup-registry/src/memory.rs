//! In-memory manifest registry.
//!
//! Fast, thread-safe storage suitable for development, testing,
//! and single-process deployments.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, instrument};

use peup_core::error::{PeupError, Result};
use peup_core::traits::ManifestRegistry;
use peup_core::types::{Deadline, Manifest};

/// In-memory manifest registry.
///
/// Every lookup is counted, which makes this registry double as the
/// call-counting collaborator in cache tests.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    /// scope → manifest
    manifests: DashMap<String, Manifest>,
    /// Lookups served so far, hits and misses alike
    lookups: AtomicU64,
}

impl MemoryRegistry {
    /// Creates a new empty in-memory registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the manifest for `scope`.
    pub fn register(&self, scope: &str, manifest: Manifest) -> Result<()> {
        let scope = scope.trim();
        if scope.is_empty() {
            return Err(PeupError::InvalidInput("scope cannot be empty".into()));
        }
        manifest.validate()?;

        debug!(scope, service_id = %manifest.service_id, "Registering manifest");
        self.manifests.insert(scope.to_string(), manifest);
        Ok(())
    }

    /// Removes the manifest for `scope`. Returns true if one was present.
    pub fn deregister(&self, scope: &str) -> bool {
        self.manifests.remove(scope.trim()).is_some()
    }

    /// Returns the number of lookups served.
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Returns the number of registered scopes.
    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    /// Returns the registered scopes.
    pub fn scopes(&self) -> Vec<String> {
        let mut scopes: Vec<String> = self.manifests.iter().map(|e| e.key().clone()).collect();
        scopes.sort();
        scopes
    }
}

#[async_trait]
impl ManifestRegistry for MemoryRegistry {
    #[instrument(skip(self, _deadline))]
    async fn lookup(&self, scope: &str, _deadline: Deadline) -> Result<Manifest> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.manifests
            .get(scope.trim())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| PeupError::NotFound(scope.to_string()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
