//! Error types for PEUP.
//!
//! One error hierarchy for the whole gateway, built with `thiserror`.
//! The variants are grouped so the transport can tell a missing scope
//! apart from a misbehaving upstream.

use thiserror::Error;

/// Result type alias using `PeupError`.
pub type Result<T> = std::result::Result<T, PeupError>;

/// Main error type for all PEUP operations.
#[derive(Debug, Error)]
pub enum PeupError {
    // ═══════════════════════════════════════════════════════════════════════════
    // RESOLUTION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// No manifest for the scope in the registry nor the fallback.
    #[error("Manifest not found for scope: {0}")]
    NotFound(String),

    /// Registry or fallback answered with unusable data.
    #[error("Upstream error: {0}")]
    UpstreamError(String),

    /// A manifest failed structural validation.
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// A collaborator did not answer before the deadline.
    #[error("Resolution of '{scope}' timed out after {timeout_ms}ms")]
    UpstreamTimeout {
        /// Scope being resolved
        scope: String,
        /// Budget that ran out
        timeout_ms: u64,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // INPUT ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Malformed request at the transport boundary.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Binary serialization error.
    #[error("Binary serialization error: {0}")]
    BinarySerializationError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // NETWORK & STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl PeupError {
    /// Returns true if the caller may retry the operation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PeupError::UpstreamError(_)
                | PeupError::UpstreamTimeout { .. }
                | PeupError::HttpError(_)
        )
    }

    /// Returns true if an upstream answered badly or too late.
    ///
    /// These map to a bad-gateway response at the transport.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            PeupError::UpstreamError(_)
                | PeupError::InvalidManifest(_)
                | PeupError::UpstreamTimeout { .. }
                | PeupError::JsonError(_)
                | PeupError::BinarySerializationError(_)
        )
    }

    /// Returns true if the scope is simply unknown.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PeupError::NotFound(_))
    }
}
