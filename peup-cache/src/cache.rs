//! In-memory TTL cache for manifests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use peup_core::constants::{DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL_SECONDS, MAX_CACHE_TTL};
use peup_core::types::Manifest;

/// Cache entry with an absolute expiry.
#[derive(Clone)]
struct CacheEntry {
    manifest: Arc<Manifest>,
    inserted_at: Instant,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_fresh_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    fn is_expired(&self) -> bool {
        !self.is_fresh_at(Instant::now())
    }
}

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries; 0 disables caching
    pub max_entries: usize,
    /// TTL in seconds for manifests that do not advertise one
    pub default_ttl_seconds: u64,
    /// Whether to sweep expired entries before evicting live ones
    pub auto_cleanup: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            default_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            auto_cleanup: true,
        }
    }
}

impl CacheConfig {
    /// Returns the default TTL as a `Duration`.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }
}

/// In-memory cache of resolved manifests, keyed by scope.
///
/// Readers share a read lock and never wait on each other; writers take the
/// write lock only for the map update itself. Expired entries stay in the map
/// until they are overwritten, evicted or swept, but are never returned.
pub struct ManifestCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
}

fn normalize(scope: &str) -> &str {
    scope.trim()
}

impl ManifestCache {
    /// Creates a new cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(config.max_entries.min(1024))),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Gets a fresh manifest for `scope`.
    pub fn get(&self, scope: &str) -> Option<Arc<Manifest>> {
        self.get_with_expiry(scope).map(|(manifest, _)| manifest)
    }

    /// Gets a fresh manifest for `scope` together with its expiry instant.
    pub fn get_with_expiry(&self, scope: &str) -> Option<(Arc<Manifest>, Instant)> {
        let found = self.peek_with_expiry(scope);
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Like [`get_with_expiry`](Self::get_with_expiry), without touching the
    /// hit and miss counters.
    pub fn peek_with_expiry(&self, scope: &str) -> Option<(Arc<Manifest>, Instant)> {
        let now = Instant::now();
        let entries = self.entries.read();
        entries
            .get(normalize(scope))
            .filter(|e| e.is_fresh_at(now))
            .map(|e| (e.manifest.clone(), e.expires_at))
    }

    /// Returns true when `max_entries` is 0.
    pub fn is_disabled(&self) -> bool {
        self.config.max_entries == 0
    }

    /// Returns the TTL this cache applies to `manifest`.
    pub fn ttl_for(&self, manifest: &Manifest) -> Duration {
        manifest.cache_ttl_or(self.config.default_ttl())
    }

    /// Caches a manifest using its advertised TTL. Returns the expiry instant.
    pub fn insert(&self, scope: &str, manifest: Arc<Manifest>) -> Instant {
        let ttl = self.ttl_for(&manifest);
        self.insert_with_ttl(scope, manifest, ttl)
    }

    /// Caches a manifest with an explicit TTL, replacing any previous entry.
    ///
    /// The TTL is clamped to [`MAX_CACHE_TTL`]. A disabled cache stores
    /// nothing but still reports the expiry the entry would have had.
    pub fn insert_with_ttl(&self, scope: &str, manifest: Arc<Manifest>, ttl: Duration) -> Instant {
        let key = normalize(scope);
        let now = Instant::now();
        let expires_at = now.checked_add(ttl.min(MAX_CACHE_TTL)).unwrap_or(now);

        if self.is_disabled() {
            return expires_at;
        }

        let mut entries = self.entries.write();

        if !entries.contains_key(key) && entries.len() >= self.config.max_entries {
            if self.config.auto_cleanup {
                entries.retain(|_, e| e.is_fresh_at(now));
            }
            if entries.len() >= self.config.max_entries {
                if let Some(oldest_key) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.inserted_at)
                    .map(|(k, _)| k.clone())
                {
                    entries.remove(&oldest_key);
                }
            }
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                manifest,
                inserted_at: now,
                expires_at,
            },
        );

        expires_at
    }

    /// Removes a cached entry. Returns true if one was present.
    pub fn remove(&self, scope: &str) -> bool {
        self.entries.write().remove(normalize(scope)).is_some()
    }

    /// Clears all cached entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Removes all expired entries. Returns how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired());
        before - entries.len()
    }

    /// Returns the number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        let expired = entries.values().filter(|e| e.is_expired()).count();
        CacheStats {
            total_entries: entries.len(),
            expired_entries: expired,
            valid_entries: entries.len().saturating_sub(expired),
            capacity: self.config.max_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for ManifestCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Serialize)]
pub struct CacheStats {
    /// Total entries (including expired)
    pub total_entries: usize,
    /// Expired entries
    pub expired_entries: usize,
    /// Valid (non-expired) entries
    pub valid_entries: usize,
    /// Maximum capacity
    pub capacity: usize,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that found nothing fresh
    pub misses: u64,
}
