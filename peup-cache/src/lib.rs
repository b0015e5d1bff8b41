//! Manifest resolution cache for PEUP.
//!
//! [`ManifestCache`] is the TTL map; [`ManifestService`] puts it in front of
//! a registry and an optional fallback.

#![forbid(unsafe_code)]

mod cache;
mod service;

pub use cache::{CacheConfig, CacheStats, ManifestCache};
pub use service::{ManifestService, ServiceConfig};
