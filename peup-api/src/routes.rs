//! API route configuration.

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// Creates the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Intent endpoint
        .route("/peup", post(handlers::handle_intent))

        // Manifest lookup
        .route("/api/v1/manifests/:scope", get(handlers::get_manifest))

        // Cache administration
        .route("/api/v1/cache/stats", get(handlers::cache_stats))
        .route("/api/v1/cache", delete(handlers::clear_cache))
        .route("/api/v1/cache/:scope", delete(handlers::invalidate_scope))

        .with_state(state)
}
