//! API route handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, info};
use uuid::Uuid;

use peup_cache::CacheStats;
use peup_core::constants::{
    CONTENT_TYPE_BINARY, HEADER_REQUEST_ID, HEADER_RESPONSE_SOURCE, HEADER_SCOPE_REQUESTED,
};
use peup_core::types::{validate_scope, Intent, Resolution, ResponseFormat};

use crate::dto::*;
use crate::error::ApiError;
use crate::state::AppState;

type Result<T> = std::result::Result<T, ApiError>;

fn set_header(response: &mut Response, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(name), value);
    }
}

fn tag_response(mut response: Response, resolution: &Resolution, scope: &str) -> Response {
    set_header(&mut response, HEADER_RESPONSE_SOURCE, resolution.source.as_str());
    set_header(&mut response, HEADER_SCOPE_REQUESTED, scope);
    response
}

// Syntax, shape and content-type problems are all plain bad requests.
fn reject_intent(rejection: JsonRejection) -> ApiError {
    match rejection.status() {
        StatusCode::BAD_REQUEST
        | StatusCode::UNPROCESSABLE_ENTITY
        | StatusCode::UNSUPPORTED_MEDIA_TYPE => {
            ApiError::bad_request(format!("Invalid intent: {}", rejection.body_text()))
        }
        status => ApiError::new(status, rejection.body_text(), "REQUEST_REJECTED"),
    }
}

/// POST /peup
///
/// Resolves the intent's scope and answers with the manifest, as JSON or in
/// the binary encoding depending on `response_format`.
///
/// Free-text intents are only interpreted when an [`IntentInterpreter`] was
/// attached with [`AppState::with_interpreter`]. `AppState::from_config`
/// attaches none, so under `peup serve` a scope-less intent is rejected with
/// 400.
///
/// [`IntentInterpreter`]: peup_core::traits::IntentInterpreter
pub async fn handle_intent(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<Intent>, JsonRejection>,
) -> Result<Response> {
    let request_id = Uuid::new_v4().to_string();
    let Json(mut intent) = payload.map_err(reject_intent)?;

    if intent.needs_interpretation() {
        if let Some(interpreter) = &state.interpreter {
            let query = intent.query.take().unwrap_or_default();
            let format = intent.response_format;
            debug!(%request_id, %query, "Interpreting free-text intent");
            intent = interpreter.interpret(&query).await?;
            intent.response_format = format;
        }
    }

    intent.validate()?;
    let scope = intent.scope().to_string();

    let resolution = state.manifests.resolve(&scope, None).await?;

    info!(
        %request_id,
        action = ?intent.action,
        scope = %scope,
        source = %resolution.source,
        "Intent resolved"
    );

    let response = match intent.response_format {
        ResponseFormat::Json => Json(resolution.manifest.as_ref()).into_response(),
        ResponseFormat::Binary => (
            [(header::CONTENT_TYPE, CONTENT_TYPE_BINARY)],
            resolution.manifest.to_bytes()?,
        )
            .into_response(),
    };

    let mut response = tag_response(response, &resolution, &scope);
    set_header(&mut response, HEADER_REQUEST_ID, &request_id);
    Ok(response)
}

/// GET /api/v1/manifests/:scope
pub async fn get_manifest(
    State(state): State<Arc<AppState>>,
    Path(scope): Path<String>,
) -> Result<Response> {
    validate_scope(&scope)?;
    let scope = scope.trim();

    let resolution = state.manifests.resolve(scope, None).await?;
    let body = ResolvedManifestResponse::new(scope, &resolution);

    Ok(tag_response(Json(body).into_response(), &resolution, scope))
}

/// GET /api/v1/cache/stats
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.manifests.stats())
}

/// DELETE /api/v1/cache/:scope
pub async fn invalidate_scope(
    State(state): State<Arc<AppState>>,
    Path(scope): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    validate_scope(&scope)?;

    let removed = state.manifests.invalidate(&scope);
    Ok(Json(InvalidateResponse {
        scope: scope.trim().to_string(),
        removed,
    }))
}

/// DELETE /api/v1/cache
pub async fn clear_cache(State(state): State<Arc<AppState>>) -> Json<ClearCacheResponse> {
    let cleared = state.manifests.stats().total_entries;
    state.manifests.clear();
    Json(ClearCacheResponse { cleared })
}

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        registry: state.manifests.registry_name().to_string(),
        fallback: state.manifests.has_fallback(),
        cached_entries: state.manifests.stats().valid_entries,
    })
}
