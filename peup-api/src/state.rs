//! App state: resolution service, optional interpreter, config.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use peup_cache::{CacheConfig, ManifestService, ServiceConfig};
use peup_core::constants::{
    DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL_SECONDS, DEFAULT_RESOLVE_TIMEOUT_MS,
};
use peup_core::error::{PeupError, Result};
use peup_core::traits::{IntentInterpreter, ManifestRegistry};
use peup_registry::{FileRegistry, HttpRegistry, StaticFallback};

const DEFAULT_MANIFEST_DIR: &str = "manifests";

/// Gateway configuration.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Remote discovery service; takes precedence over `manifest_dir`
    pub registry_url: Option<String>,
    /// Directory of `<scope>_manifest.json` files
    pub manifest_dir: PathBuf,
    /// Manifest served when the registry fails
    pub fallback_manifest: Option<PathBuf>,
    /// Budget for one resolution
    pub resolve_timeout_ms: u64,
    /// TTL for manifests that do not advertise one
    pub default_ttl_seconds: u64,
    /// Cache capacity
    pub cache_max_entries: usize,
    /// Allowed CORS origins; empty allows any
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            registry_url: None,
            manifest_dir: PathBuf::from(DEFAULT_MANIFEST_DIR),
            fallback_manifest: None,
            resolve_timeout_ms: DEFAULT_RESOLVE_TIMEOUT_MS,
            default_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            cors_origins: Vec::new(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T> {
    match non_empty_var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| PeupError::ConfigError(format!("{} is not a valid number: {}", key, raw))),
        None => Ok(default),
    }
}

impl ApiConfig {
    /// Loads configuration from the environment (and `.env`, if present).
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Ok(Self {
            registry_url: non_empty_var("PEUP_REGISTRY_URL"),
            manifest_dir: non_empty_var("PEUP_MANIFEST_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.manifest_dir),
            fallback_manifest: non_empty_var("PEUP_FALLBACK_MANIFEST").map(PathBuf::from),
            resolve_timeout_ms: parse_var("PEUP_RESOLVE_TIMEOUT_MS", defaults.resolve_timeout_ms)?,
            default_ttl_seconds: parse_var(
                "PEUP_DEFAULT_TTL_SECONDS",
                defaults.default_ttl_seconds,
            )?,
            cache_max_entries: parse_var("PEUP_CACHE_MAX_ENTRIES", defaults.cache_max_entries)?,
            cors_origins: non_empty_var("PEUP_CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    /// Returns the resolution service settings derived from this config.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            cache: CacheConfig {
                max_entries: self.cache_max_entries,
                default_ttl_seconds: self.default_ttl_seconds,
                auto_cleanup: true,
            },
            resolve_timeout_ms: self.resolve_timeout_ms,
            coalesce_misses: true,
        }
    }
}

/// Shared state handed to every handler.
pub struct AppState {
    /// Gateway configuration
    pub config: ApiConfig,
    /// The resolve-and-cache service
    pub manifests: ManifestService,
    /// Turns free-text queries into intents, when attached
    pub interpreter: Option<Arc<dyn IntentInterpreter>>,
    /// Process start, for uptime
    pub started_at: Instant,
}

impl AppState {
    /// Builds the registry, fallback and service described by `config`.
    pub async fn from_config(config: ApiConfig) -> Result<Self> {
        let registry: Arc<dyn ManifestRegistry> = match &config.registry_url {
            Some(url) => {
                info!(%url, "Using HTTP registry");
                Arc::new(HttpRegistry::new(url.as_str())?)
            }
            None => {
                info!(dir = ?config.manifest_dir, "Using manifest directory");
                Arc::new(FileRegistry::new(&config.manifest_dir))
            }
        };

        let mut manifests = ManifestService::with_config(registry, config.service_config());
        if let Some(path) = &config.fallback_manifest {
            manifests = manifests.with_fallback(Arc::new(StaticFallback::from_file(path).await?));
        }

        Ok(Self::with_service(config, manifests))
    }

    /// Wraps an already built service.
    pub fn with_service(config: ApiConfig, manifests: ManifestService) -> Self {
        Self {
            config,
            manifests,
            interpreter: None,
            started_at: Instant::now(),
        }
    }

    /// Attaches a free-text interpreter.
    pub fn with_interpreter(mut self, interpreter: Arc<dyn IntentInterpreter>) -> Self {
        self.interpreter = Some(interpreter);
        self
    }
}
