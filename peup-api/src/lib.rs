//! # PEUP API Server
//!
//! HTTP transport for the PEUP gateway.
//!
//! ## Endpoints
//!
//! - `POST /peup` - Resolve an intent's scope to a manifest (JSON or binary)
//! - `GET /api/v1/manifests/:scope` - Resolve a scope, with provenance
//! - `GET /api/v1/cache/stats` - Cache statistics
//! - `DELETE /api/v1/cache/:scope` - Invalidate one scope
//! - `DELETE /api/v1/cache` - Clear the cache
//! - `GET /health` - Liveness and uptime
//!
//! ## Example
//!
//! ```rust,ignore
//! use peup_api::{ApiConfig, ApiServer};
//!
//! let server = ApiServer::from_config(ApiConfig::from_env()?).await?;
//! server.run(([0, 0, 0, 0], 8080)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod dto;
mod error;
mod handlers;
mod routes;
mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{ApiConfig, AppState};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use peup_core::constants::{HEADER_REQUEST_ID, HEADER_RESPONSE_SOURCE, HEADER_SCOPE_REQUESTED};

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// How often stale cache entries are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// API server for PEUP.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a server around prepared state.
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Builds state from `config` and wraps it in a server.
    pub async fn from_config(config: ApiConfig) -> peup_core::Result<Self> {
        Ok(Self::new(AppState::from_config(config).await?))
    }

    /// Returns the shared state.
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    fn cors(&self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .state
            .config
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(%origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        let allow_origin = if origins.is_empty() {
            AllowOrigin::from(Any)
        } else {
            AllowOrigin::list(origins)
        };

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
            .expose_headers([
                HeaderName::from_static(HEADER_RESPONSE_SOURCE),
                HeaderName::from_static(HEADER_SCOPE_REQUESTED),
                HeaderName::from_static(HEADER_REQUEST_ID),
            ])
    }

    /// Creates the router with all routes configured.
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(self.cors())
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address until Ctrl-C.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("PEUP gateway listening on {}", addr);

        let sweeper = tokio::spawn(sweep_periodically(self.state.clone()));
        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await;
        sweeper.abort();

        result
    }
}

async fn sweep_periodically(state: Arc<AppState>) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        state.manifests.sweep_expired();
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

/// Starts the API server with configuration from the environment.
pub async fn start_server(port: u16) -> std::io::Result<()> {
    let config = ApiConfig::from_env().map_err(std::io::Error::other)?;
    let server = ApiServer::from_config(config)
        .await
        .map_err(std::io::Error::other)?;
    server.run(([0, 0, 0, 0], port)).await
}
