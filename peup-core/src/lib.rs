//! # PEUP Core
//!
//! Core types, errors, and traits for the PEUP intent-routing gateway.
//!
//! This crate provides the foundational building blocks used by all other PEUP crates:
//!
//! - **Types**: Manifests, intents, deadlines and resolution results
//! - **Errors**: A single error type that separates "not found" from upstream failures
//! - **Constants**: Default TTLs, timeouts and wire identifiers
//! - **Traits**: Contracts for the registry, fallback and intent interpreter collaborators
//!
//! ## Example
//!
//! ```rust
//! use peup_core::Manifest;
//!
//! let manifest: Manifest = serde_json::from_str(r#"{
//!     "service_id": "svc1",
//!     "version": "1.0",
//!     "endpoint": { "url": "http://x", "protocol": "http", "timeout_ms": 5000 },
//!     "metadata": { "name": "svc1", "cache_ttl_seconds": 2 }
//! }"#).unwrap();
//! assert_eq!(manifest.cache_ttl().as_secs(), 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{PeupError, Result};
pub use traits::*;
pub use types::*;
