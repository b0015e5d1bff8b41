//! # PEUP Registry
//!
//! Manifest sources for the PEUP resolution service.
//!
//! This crate provides several registry backends and one fallback:
//!
//! - **Memory**: In-memory map for development and testing
//! - **File**: A directory of `<scope>_manifest.json` files
//! - **Http**: A remote discovery service
//! - **StaticFallback**: One degraded manifest served when the registry fails
//!
//! ## Example
//!
//! ```rust,ignore
//! use peup_registry::{MemoryRegistry, Registry};
//!
//! let registry = MemoryRegistry::new();
//! registry.register("svc1", manifest)?;
//!
//! let manifest = registry.lookup("svc1", Deadline::after_millis(500)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod fallback;
mod file;
mod http;
mod memory;

pub use fallback::StaticFallback;
pub use file::FileRegistry;
pub use http::{HttpRegistry, HttpRegistryConfig};
pub use memory::MemoryRegistry;

// Re-export the traits from core
pub use peup_core::traits::{FallbackResolver, ManifestRegistry as Registry};
