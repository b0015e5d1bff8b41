//! Static fallback resolver.

use std::path::Path;

use async_trait::async_trait;
use tracing::{info, instrument};

use peup_core::error::{PeupError, Result};
use peup_core::traits::FallbackResolver;
use peup_core::types::{Deadline, Manifest};

/// Serves one configured manifest for every scope, or nothing.
#[derive(Clone, Debug, Default)]
pub struct StaticFallback {
    manifest: Option<Manifest>,
}

impl StaticFallback {
    /// Creates a fallback serving `manifest`.
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest: Some(manifest),
        }
    }

    /// Creates a fallback that never produces a manifest.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads the fallback manifest from a JSON file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let manifest = Manifest::from_json(&bytes)?;
        manifest.validate()?;

        info!(path = ?path, service_id = %manifest.service_id, "Loaded fallback manifest");
        Ok(Self::new(manifest))
    }

    /// Returns the configured manifest, if any.
    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }
}

#[async_trait]
impl FallbackResolver for StaticFallback {
    #[instrument(skip(self, _deadline))]
    async fn resolve_fallback(&self, scope: &str, _deadline: Deadline) -> Result<Manifest> {
        self.manifest
            .clone()
            .ok_or_else(|| PeupError::NotFound(scope.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peup_core::types::{Protocol, ServiceEndpoint, ServiceMetadata};
    use tempfile::tempdir;

    fn degraded() -> Manifest {
        Manifest::new(
            "fallback",
            "0.1",
            ServiceEndpoint::new("http://localhost:9999", Protocol::Http, 1000),
            ServiceMetadata::new("fallback", 0),
        )
    }

    #[tokio::test]
    async fn test_serves_any_scope() {
        let fallback = StaticFallback::new(degraded());
        let deadline = Deadline::after_millis(100);
        assert_eq!(
            fallback.resolve_fallback("a", deadline).await.unwrap().service_id,
            "fallback"
        );
        assert!(fallback.resolve_fallback("b", deadline).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_is_not_found() {
        let fallback = StaticFallback::empty();
        let err = fallback
            .resolve_fallback("svc1", Deadline::after_millis(100))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fallback_manifest.json");
        std::fs::write(&path, serde_json::to_vec(&degraded()).unwrap()).unwrap();

        let fallback = StaticFallback::from_file(&path).await.unwrap();
        assert_eq!(fallback.manifest(), Some(&degraded()));
    }

    #[tokio::test]
    async fn test_from_missing_file() {
        let dir = tempdir().unwrap();
        let err = StaticFallback::from_file(dir.path().join("nope.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, PeupError::IoError(_)));
    }
}
