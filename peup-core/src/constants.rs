//! Protocol and policy constants for PEUP.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE POLICY
// ═══════════════════════════════════════════════════════════════════════════════

/// TTL applied when a manifest advertises `cache_ttl_seconds = 0` or omits it.
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;

/// [`DEFAULT_CACHE_TTL_SECONDS`] as a `Duration`.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS);

/// Upper bound on any cache lifetime; longer advertised TTLs are clamped.
pub const MAX_CACHE_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

/// [`MAX_CACHE_TTL_SECONDS`] as a `Duration`.
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(MAX_CACHE_TTL_SECONDS);

/// Maximum number of scopes held by the manifest cache.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1000;

// ═══════════════════════════════════════════════════════════════════════════════
// RESOLUTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Deadline applied to a resolution when the caller supplies none.
pub const DEFAULT_RESOLVE_TIMEOUT_MS: u64 = 10_000;

/// Version string stamped on intents that do not carry one.
pub const PROTOAI_INTENT_VERSION: &str = "1.0";

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE & WIRE
// ═══════════════════════════════════════════════════════════════════════════════

/// File name suffix used by the on-disk registry: `<scope>_manifest.json`.
pub const MANIFEST_FILE_SUFFIX: &str = "_manifest.json";

/// Content type of a binary-encoded manifest.
pub const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

/// Response header carrying where a manifest came from.
pub const HEADER_RESPONSE_SOURCE: &str = "x-response-source";

/// Response header echoing the requested scope.
pub const HEADER_SCOPE_REQUESTED: &str = "x-scope-requested";

/// Response header carrying the per-request id.
pub const HEADER_REQUEST_ID: &str = "x-request-id";
