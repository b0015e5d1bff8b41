//! Manifest resolution service.
//!
//! Serves fresh cache entries, otherwise asks the registry, otherwise the
//! fallback. Registry answers are cached with the manifest's own TTL;
//! fallback answers never are.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use peup_core::constants::DEFAULT_RESOLVE_TIMEOUT_MS;
use peup_core::traits::{FallbackResolver, ManifestRegistry};
use peup_core::types::{Deadline, Manifest, Resolution, ResolutionSource};
use peup_core::{PeupError, Result};

use crate::cache::{CacheConfig, CacheStats, ManifestCache};

/// Resolution service configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Cache settings
    pub cache: CacheConfig,
    /// Budget for one resolution when the caller gives no deadline
    pub resolve_timeout_ms: u64,
    /// Serialize concurrent misses on the same scope
    pub coalesce_misses: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            resolve_timeout_ms: DEFAULT_RESOLVE_TIMEOUT_MS,
            coalesce_misses: true,
        }
    }
}

/// Resolves scopes to manifests through a TTL cache.
///
/// Built once and shared behind an `Arc`. The cache lock is never held across
/// a registry or fallback call, so a slow scope does not hold up anybody else.
pub struct ManifestService {
    cache: ManifestCache,
    registry: Arc<dyn ManifestRegistry>,
    fallback: Option<Arc<dyn FallbackResolver>>,
    inflight: DashMap<String, Arc<AsyncMutex<()>>>,
    config: ServiceConfig,
}

impl ManifestService {
    /// Creates a service with default configuration and no fallback.
    pub fn new(registry: Arc<dyn ManifestRegistry>) -> Self {
        Self::with_config(registry, ServiceConfig::default())
    }

    /// Creates a service with custom configuration.
    pub fn with_config(registry: Arc<dyn ManifestRegistry>, config: ServiceConfig) -> Self {
        Self {
            cache: ManifestCache::with_config(config.cache.clone()),
            registry,
            fallback: None,
            inflight: DashMap::new(),
            config,
        }
    }

    /// Attaches a fallback resolver.
    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackResolver>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Returns the service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Returns the registry's log name.
    pub fn registry_name(&self) -> &str {
        self.registry.name()
    }

    /// Returns true if a fallback resolver is attached.
    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Returns the manifest for `scope`.
    pub async fn get_manifest(&self, scope: &str) -> Result<Arc<Manifest>> {
        self.resolve(scope, None).await.map(|r| r.manifest)
    }

    /// Returns the manifest for `scope`, giving collaborators until `deadline`.
    pub async fn get_manifest_with_deadline(
        &self,
        scope: &str,
        deadline: Deadline,
    ) -> Result<Arc<Manifest>> {
        self.resolve(scope, Some(deadline)).await.map(|r| r.manifest)
    }

    /// Resolves `scope` and reports where the manifest came from.
    ///
    /// Without a caller deadline one is created from `resolve_timeout_ms`.
    #[instrument(skip(self, deadline), fields(registry = self.registry.name()))]
    pub async fn resolve(&self, scope: &str, deadline: Option<Deadline>) -> Result<Resolution> {
        let scope = scope.trim();
        if scope.is_empty() {
            return Err(PeupError::InvalidInput("scope is required".into()));
        }

        if let Some(hit) = self.cached(scope) {
            return Ok(hit);
        }

        let deadline =
            deadline.unwrap_or_else(|| Deadline::after_millis(self.config.resolve_timeout_ms));
        let budget_ms = deadline.remaining().as_millis() as u64;

        if !self.config.coalesce_misses {
            return self.resolve_upstream(scope, deadline, budget_ms).await;
        }

        let gate = InflightGate::join(&self.inflight, scope);
        let result = self.resolve_gated(scope, deadline, budget_ms, &gate.lock).await;
        drop(gate);
        result
    }

    /// Drops the cached entry for `scope`. Returns true if one was present.
    pub fn invalidate(&self, scope: &str) -> bool {
        let removed = self.cache.remove(scope);
        if removed {
            info!(scope = scope.trim(), "Invalidated cached manifest");
        }
        removed
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.cache.clear();
        info!("Cleared manifest cache");
    }

    /// Removes expired entries. Returns how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let swept = self.cache.cleanup_expired();
        if swept > 0 {
            debug!(swept, "Swept expired manifests");
        }
        swept
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn cached(&self, scope: &str) -> Option<Resolution> {
        let entry = self.cache.get_with_expiry(scope)?;
        debug!(scope, "Cache hit");
        Some(cache_hit(entry))
    }

    async fn resolve_gated(
        &self,
        scope: &str,
        deadline: Deadline,
        budget_ms: u64,
        gate: &AsyncMutex<()>,
    ) -> Result<Resolution> {
        let _turn = timeout(deadline.remaining(), gate.lock())
            .await
            .map_err(|_| timed_out(scope, budget_ms))?;

        // Whoever held the gate may have just filled the cache.
        if let Some(entry) = self.cache.peek_with_expiry(scope) {
            debug!(scope, "Filled while waiting");
            return Ok(cache_hit(entry));
        }

        self.resolve_upstream(scope, deadline, budget_ms).await
    }

    async fn resolve_upstream(
        &self,
        scope: &str,
        deadline: Deadline,
        budget_ms: u64,
    ) -> Result<Resolution> {
        let registry_err = match self.lookup_registry(scope, deadline, budget_ms).await {
            Ok(manifest) => {
                let manifest = Arc::new(manifest);
                let expires_at = self.cache.insert(scope, manifest.clone());
                info!(
                    scope,
                    service_id = %manifest.service_id,
                    ttl_secs = self.cache.ttl_for(&manifest).as_secs(),
                    "Resolved manifest from registry"
                );
                return Ok(Resolution::new(
                    manifest,
                    ResolutionSource::Registry,
                    Some(expires_at),
                ));
            }
            Err(e) => e,
        };

        warn!(scope, error = %registry_err, "Registry lookup failed");

        let Some(fallback) = &self.fallback else {
            return Err(final_error(scope, registry_err, None));
        };

        let fallback_result = match timeout(
            deadline.remaining(),
            fallback.resolve_fallback(scope, deadline),
        )
        .await
        {
            Ok(result) => result.and_then(|m| m.validate().map(|_| m)),
            Err(_) => Err(timed_out(scope, budget_ms)),
        };

        match fallback_result {
            Ok(manifest) => {
                warn!(scope, service_id = %manifest.service_id, "Serving fallback manifest");
                Ok(Resolution::new(
                    Arc::new(manifest),
                    ResolutionSource::Fallback,
                    None,
                ))
            }
            Err(fallback_err) => {
                debug!(scope, error = %fallback_err, "Fallback failed");
                Err(final_error(scope, registry_err, Some(fallback_err)))
            }
        }
    }

    async fn lookup_registry(
        &self,
        scope: &str,
        deadline: Deadline,
        budget_ms: u64,
    ) -> Result<Manifest> {
        let manifest = timeout(deadline.remaining(), self.registry.lookup(scope, deadline))
            .await
            .map_err(|_| timed_out(scope, budget_ms))??;
        manifest.validate()?;
        Ok(manifest)
    }
}

/// A caller's share of a per-scope single-flight gate.
///
/// Dropping it releases the share and removes the gate once nobody else holds
/// it, also when the resolving future is cancelled mid-flight.
struct InflightGate<'a> {
    inflight: &'a DashMap<String, Arc<AsyncMutex<()>>>,
    scope: &'a str,
    lock: Arc<AsyncMutex<()>>,
}

impl<'a> InflightGate<'a> {
    fn join(inflight: &'a DashMap<String, Arc<AsyncMutex<()>>>, scope: &'a str) -> Self {
        let lock = inflight.entry(scope.to_string()).or_default().clone();
        Self {
            inflight,
            scope,
            lock,
        }
    }
}

impl Drop for InflightGate<'_> {
    fn drop(&mut self) {
        // Count our own share; the map holds the other one.
        self.inflight.remove_if(self.scope, |_, gate| {
            Arc::ptr_eq(gate, &self.lock) && Arc::strong_count(gate) == 2
        });
    }
}

fn cache_hit((manifest, expires_at): (Arc<Manifest>, Instant)) -> Resolution {
    Resolution::new(manifest, ResolutionSource::Cache, Some(expires_at))
}

fn timed_out(scope: &str, budget_ms: u64) -> PeupError {
    PeupError::UpstreamTimeout {
        scope: scope.to_string(),
        timeout_ms: budget_ms,
    }
}

/// Picks the error surfaced when no collaborator produced a manifest.
///
/// An upstream-class failure wins (registry first); anything else reads as
/// an unknown scope.
fn final_error(scope: &str, registry_err: PeupError, fallback_err: Option<PeupError>) -> PeupError {
    if registry_err.is_upstream() {
        return registry_err;
    }
    match fallback_err {
        Some(e) if e.is_upstream() => e,
        _ => PeupError::NotFound(scope.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use peup_core::types::{Protocol, ServiceEndpoint, ServiceMetadata};
    use tokio::task::JoinSet;

    fn manifest(id: &str, ttl: u64) -> Manifest {
        Manifest::new(
            id,
            "1.0",
            ServiceEndpoint::new(format!("http://{}.local:8081", id), Protocol::Http, 5000),
            ServiceMetadata::new(id, ttl),
        )
    }

    /// Registry stub that counts calls and can be slowed down per scope.
    #[derive(Default)]
    struct CountingRegistry {
        manifests: HashMap<String, Manifest>,
        delays: HashMap<String, Duration>,
        calls: AtomicUsize,
        deadlines: Mutex<Vec<Deadline>>,
    }

    impl CountingRegistry {
        fn with(mut self, scope: &str, manifest: Manifest) -> Self {
            self.manifests.insert(scope.to_string(), manifest);
            self
        }

        fn slow(mut self, scope: &str, delay: Duration) -> Self {
            self.delays.insert(scope.to_string(), delay);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ManifestRegistry for CountingRegistry {
        async fn lookup(&self, scope: &str, deadline: Deadline) -> Result<Manifest> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.deadlines.lock().push(deadline);
            if let Some(delay) = self.delays.get(scope) {
                tokio::time::sleep(*delay).await;
            }
            self.manifests
                .get(scope)
                .cloned()
                .ok_or_else(|| PeupError::NotFound(scope.to_string()))
        }
    }

    struct FailingRegistry(fn(&str) -> PeupError);

    #[async_trait]
    impl ManifestRegistry for FailingRegistry {
        async fn lookup(&self, scope: &str, _deadline: Deadline) -> Result<Manifest> {
            Err((self.0)(scope))
        }
    }

    struct Fallback {
        manifest: Option<Manifest>,
        calls: AtomicUsize,
    }

    impl Fallback {
        fn serving(manifest: Option<Manifest>) -> Arc<Self> {
            Arc::new(Self {
                manifest,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl FallbackResolver for Fallback {
        async fn resolve_fallback(&self, scope: &str, _deadline: Deadline) -> Result<Manifest> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.manifest
                .clone()
                .ok_or_else(|| PeupError::NotFound(scope.to_string()))
        }
    }

    #[tokio::test]
    async fn test_fresh_entry_served_from_cache() {
        let registry = Arc::new(CountingRegistry::default().with("svc1", manifest("svc1", 60)));
        let service = ManifestService::new(registry.clone());

        let first = service.resolve("svc1", None).await.unwrap();
        let second = service.resolve("svc1", None).await.unwrap();

        assert_eq!(first.source, ResolutionSource::Registry);
        assert_eq!(second.source, ResolutionSource::Cache);
        assert!(Arc::ptr_eq(&first.manifest, &second.manifest));
        assert_eq!(registry.calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_resolved_again() {
        let registry = Arc::new(CountingRegistry::default().with("svc1", manifest("svc1", 1)));
        let service = ManifestService::new(registry.clone());

        service.get_manifest("svc1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let again = service.resolve("svc1", None).await.unwrap();

        assert_eq!(again.source, ResolutionSource::Registry);
        assert_eq!(registry.calls(), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_cached_for_one_hour() {
        let registry = Arc::new(CountingRegistry::default().with("svc1", manifest("svc1", 0)));
        let service = ManifestService::new(registry);

        let resolution = service.resolve("svc1", None).await.unwrap();
        let expires_in = resolution.expires_in().unwrap();

        assert!(expires_in <= Duration::from_secs(3600));
        assert!(expires_in > Duration::from_secs(3599));
    }

    #[tokio::test]
    async fn test_svc1_scenario() {
        let registry = Arc::new(CountingRegistry::default().with("svc1", manifest("svc1", 2)));
        let service = ManifestService::new(registry.clone());

        let m = service.get_manifest("svc1").await.unwrap();
        assert_eq!(m.service_id, "svc1");
        assert_eq!(registry.calls(), 1);

        service.get_manifest("svc1").await.unwrap();
        assert_eq!(registry.calls(), 1);

        tokio::time::sleep(Duration::from_millis(2100)).await;
        service.get_manifest("svc1").await.unwrap();
        assert_eq!(registry.calls(), 2);
    }

    #[tokio::test]
    async fn test_fallback_result_not_cached() {
        let registry = Arc::new(CountingRegistry::default());
        let fallback = Fallback::serving(Some(manifest("degraded", 60)));
        let service = ManifestService::new(registry.clone()).with_fallback(fallback.clone());

        let first = service.resolve("svc2", None).await.unwrap();
        assert_eq!(first.source, ResolutionSource::Fallback);
        assert!(first.expires_at.is_none());
        assert!(first.is_degraded());

        let second = service.resolve("svc2", None).await.unwrap();
        assert_eq!(second.source, ResolutionSource::Fallback);

        assert_eq!(registry.calls(), 2);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 2);
        assert!(service.stats().total_entries == 0);
    }

    #[tokio::test]
    async fn test_total_failure_is_not_found() {
        let registry = Arc::new(CountingRegistry::default());
        let service =
            ManifestService::new(registry.clone()).with_fallback(Fallback::serving(None));

        let err = service.get_manifest("svc404").await.unwrap_err();
        assert!(matches!(err, PeupError::NotFound(ref s) if s == "svc404"));

        // without any fallback too
        let service = ManifestService::new(registry);
        assert!(service.get_manifest("svc404").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_unreachable_registry_without_fallback_is_not_found() {
        let service = ManifestService::new(Arc::new(FailingRegistry(|_| {
            PeupError::HttpError("connection refused".into())
        })));
        assert!(service.get_manifest("svc1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_upstream_failure_wins_over_not_found() {
        let service = ManifestService::new(Arc::new(FailingRegistry(|_| {
            PeupError::UpstreamError("garbled body".into())
        })))
        .with_fallback(Fallback::serving(None));

        let err = service.get_manifest("svc1").await.unwrap_err();
        assert!(matches!(err, PeupError::UpstreamError(_)));
    }

    #[tokio::test]
    async fn test_invalid_manifest_not_cached() {
        let mut bad = manifest("svc1", 60);
        bad.endpoint.url = "not a url".into();
        let registry = Arc::new(CountingRegistry::default().with("svc1", bad));
        let service = ManifestService::new(registry.clone());

        let err = service.get_manifest("svc1").await.unwrap_err();
        assert!(matches!(err, PeupError::InvalidManifest(_)));
        assert!(err.is_upstream());

        service.get_manifest("svc1").await.unwrap_err();
        assert_eq!(registry.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalid_fallback_rejected() {
        let mut bad = manifest("degraded", 60);
        bad.endpoint.timeout_ms = 0;
        let service = ManifestService::new(Arc::new(CountingRegistry::default()))
            .with_fallback(Fallback::serving(Some(bad)));

        let err = service.get_manifest("svc1").await.unwrap_err();
        assert!(matches!(err, PeupError::InvalidManifest(_)));
    }

    #[tokio::test]
    async fn test_slow_registry_times_out() {
        let registry = Arc::new(
            CountingRegistry::default()
                .with("svc1", manifest("svc1", 60))
                .slow("svc1", Duration::from_millis(500)),
        );
        let service = ManifestService::new(registry);

        let started = Instant::now();
        let err = service
            .get_manifest_with_deadline("svc1", Deadline::after_millis(50))
            .await
            .unwrap_err();

        assert!(matches!(err, PeupError::UpstreamTimeout { ref scope, .. } if scope == "svc1"));
        assert!(err.is_upstream());
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let registry = Arc::new(
            CountingRegistry::default()
                .with("svc1", manifest("svc1", 60))
                .slow("svc1", Duration::from_millis(500)),
        );
        let service = ManifestService::with_config(
            registry,
            ServiceConfig {
                resolve_timeout_ms: 50,
                ..Default::default()
            },
        )
        .with_fallback(Fallback::serving(Some(manifest("degraded", 60))));

        let resolution = service.resolve("svc1", None).await.unwrap();
        assert_eq!(resolution.source, ResolutionSource::Fallback);
    }

    struct SlowFallback;

    #[async_trait]
    impl FallbackResolver for SlowFallback {
        async fn resolve_fallback(&self, _scope: &str, _deadline: Deadline) -> Result<Manifest> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(manifest("degraded", 60))
        }
    }

    #[tokio::test]
    async fn test_fallback_shares_exhausted_deadline() {
        let registry = Arc::new(
            CountingRegistry::default()
                .with("svc1", manifest("svc1", 60))
                .slow("svc1", Duration::from_millis(500)),
        );
        let service = ManifestService::new(registry).with_fallback(Arc::new(SlowFallback));

        let err = service
            .get_manifest_with_deadline("svc1", Deadline::after_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, PeupError::UpstreamTimeout { .. }));
    }

    #[tokio::test]
    async fn test_caller_deadline_forwarded_unchanged() {
        let registry = Arc::new(CountingRegistry::default().with("svc1", manifest("svc1", 60)));
        let service = ManifestService::new(registry.clone());

        let deadline = Deadline::after(Duration::from_secs(5));
        service
            .get_manifest_with_deadline("svc1", deadline)
            .await
            .unwrap();

        assert_eq!(registry.deadlines.lock().as_slice(), &[deadline]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_slow_scope_does_not_block_others() {
        let registry = Arc::new(
            CountingRegistry::default()
                .with("slow", manifest("slow", 60))
                .with("fast", manifest("fast", 60))
                .with("other", manifest("other", 60))
                .slow("slow", Duration::from_millis(800)),
        );
        let service = Arc::new(ManifestService::new(registry));
        service.get_manifest("fast").await.unwrap();

        let background = service.clone();
        let slow = tokio::spawn(async move { background.get_manifest("slow").await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let started = Instant::now();
        let hit = service.resolve("fast", None).await.unwrap();
        let miss = service.resolve("other", None).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(hit.source, ResolutionSource::Cache);
        assert_eq!(miss.source, ResolutionSource::Registry);
        assert!(elapsed < Duration::from_millis(300), "blocked for {:?}", elapsed);
        assert!(slow.await.unwrap().is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_coalesce() {
        let registry = Arc::new(
            CountingRegistry::default()
                .with("svc1", manifest("svc1", 60))
                .slow("svc1", Duration::from_millis(200)),
        );
        let service = Arc::new(ManifestService::new(registry.clone()));

        let mut set = JoinSet::new();
        for _ in 0..8 {
            let service = service.clone();
            set.spawn(async move { service.resolve("svc1", None).await });
        }

        let mut from_registry = 0;
        while let Some(result) = set.join_next().await {
            if result.unwrap().unwrap().source == ResolutionSource::Registry {
                from_registry += 1;
            }
        }

        assert_eq!(from_registry, 1);
        assert_eq!(registry.calls(), 1);
        assert!(service.inflight.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_readers_on_warm_entry() {
        let registry = Arc::new(CountingRegistry::default().with("svc1", manifest("svc1", 60)));
        let service = Arc::new(ManifestService::new(registry.clone()));
        service.get_manifest("svc1").await.unwrap();

        let started = Instant::now();
        let mut set = JoinSet::new();
        for _ in 0..64 {
            let service = service.clone();
            set.spawn(async move { service.resolve("svc1", None).await });
        }
        while let Some(result) = set.join_next().await {
            assert_eq!(result.unwrap().unwrap().source, ResolutionSource::Cache);
        }

        assert!(started.elapsed() < Duration::from_millis(200));
        assert_eq!(registry.calls(), 1);
        assert_eq!(service.stats().hits, 64);
    }

    #[tokio::test]
    async fn test_waiting_miss_counted_once() {
        let registry = Arc::new(
            CountingRegistry::default()
                .with("svc1", manifest("svc1", 60))
                .slow("svc1", Duration::from_millis(100)),
        );
        let service = ManifestService::new(registry.clone());

        let (a, b) = tokio::join!(service.resolve("svc1", None), service.resolve("svc1", None));
        assert_eq!(a.unwrap().source, ResolutionSource::Registry);
        assert_eq!(b.unwrap().source, ResolutionSource::Cache);

        let stats = service.stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 0);
        assert_eq!(registry.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancelled_misses_release_gates() {
        let mut registry = CountingRegistry::default();
        for i in 0..50 {
            let scope = format!("s{}", i);
            registry = registry
                .with(&scope, manifest(&scope, 60))
                .slow(&scope, Duration::from_secs(5));
        }
        let service = Arc::new(ManifestService::new(Arc::new(registry)));

        let mut set = JoinSet::new();
        for i in 0..50 {
            let service = service.clone();
            set.spawn(async move { service.resolve(&format!("s{}", i), None).await });
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(service.inflight.len(), 50);

        set.abort_all();
        while let Some(result) = set.join_next().await {
            assert!(result.unwrap_err().is_cancelled());
        }

        assert!(service.inflight.is_empty());
    }

    #[tokio::test]
    async fn test_huge_ttl_is_clamped() {
        let registry =
            Arc::new(CountingRegistry::default().with("svc1", manifest("svc1", u64::MAX)));
        let service = ManifestService::new(registry.clone());

        let resolution = service.resolve("svc1", None).await.unwrap();
        assert_eq!(resolution.source, ResolutionSource::Registry);
        assert!(resolution.expires_in().unwrap() <= peup_core::constants::MAX_CACHE_TTL);

        service.get_manifest("svc1").await.unwrap();
        assert_eq!(registry.calls(), 1);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_asks_registry() {
        let registry = Arc::new(CountingRegistry::default().with("svc1", manifest("svc1", 60)));
        let config = ServiceConfig {
            cache: CacheConfig {
                max_entries: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let service = ManifestService::with_config(registry.clone(), config);

        service.get_manifest("svc1").await.unwrap();
        service.get_manifest("svc1").await.unwrap();
        assert_eq!(registry.calls(), 2);
        assert_eq!(service.stats().total_entries, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_uncoalesced_misses_each_go_upstream() {
        let registry = Arc::new(
            CountingRegistry::default()
                .with("svc1", manifest("svc1", 60))
                .slow("svc1", Duration::from_millis(200)),
        );
        let config = ServiceConfig {
            coalesce_misses: false,
            ..Default::default()
        };
        let service = Arc::new(ManifestService::with_config(registry.clone(), config));

        let (a, b) = tokio::join!(service.get_manifest("svc1"), service.get_manifest("svc1"));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(registry.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_scope_rejected() {
        let registry = Arc::new(CountingRegistry::default());
        let service = ManifestService::new(registry.clone());

        let err = service.get_manifest("   ").await.unwrap_err();
        assert!(matches!(err, PeupError::InvalidInput(_)));
        assert_eq!(registry.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let registry = Arc::new(
            CountingRegistry::default()
                .with("a", manifest("a", 60))
                .with("b", manifest("b", 60)),
        );
        let service = ManifestService::new(registry.clone());
        service.get_manifest("a").await.unwrap();
        service.get_manifest("b").await.unwrap();

        assert!(service.invalidate(" a "));
        assert!(!service.invalidate("a"));
        service.get_manifest("a").await.unwrap();
        assert_eq!(registry.calls(), 3);

        service.clear();
        assert_eq!(service.stats().total_entries, 0);
        assert_eq!(service.sweep_expired(), 0);
    }

    #[test]
    fn test_final_error_precedence() {
        let not_found = || PeupError::NotFound("s".into());
        let upstream = || PeupError::UpstreamError("bad".into());

        assert!(final_error("s", not_found(), None).is_not_found());
        assert!(final_error("s", not_found(), Some(not_found())).is_not_found());
        assert!(matches!(
            final_error("s", not_found(), Some(upstream())),
            PeupError::UpstreamError(_)
        ));
        assert!(matches!(
            final_error("s", timed_out("s", 10), Some(upstream())),
            PeupError::UpstreamTimeout { .. }
        ));
    }
}
