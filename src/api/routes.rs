//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::auth;
use super::types::{AdvisoryRequest, AdvisoryResponse, ClearCacheResponse};
use crate::advisor::{simple_allocation, AdvisoryOrchestrator};
use crate::cache::{self, AnalysisCache, CacheStats};
use crate::config::Config;
use crate::llm::{GeminiClient, TextGenerator};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub advisor: Arc<AdvisoryOrchestrator>,
    pub cache: Arc<AnalysisCache>,
}

impl AppState {
    /// Wire the production collaborators from `config`.
    pub fn from_config(config: Config) -> Self {
        let cache = Arc::new(AnalysisCache::new(config.cache.clone()));
        let generator: Arc<dyn TextGenerator> = Arc::new(GeminiClient::new(config.gemini.clone()));
        let advisor = Arc::new(AdvisoryOrchestrator::new(generator, Arc::clone(&cache)));
        Self {
            config,
            advisor,
            cache,
        }
    }
}

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/analysis", post(create_analysis))
        .route("/api/ai/cache-stats", get(cache_stats).delete(clear_cache))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_auth,
        ));

    Router::new()
        .route("/api/health", get(health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server and the cache sweep.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    if config.gemini.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; every analysis will be unavailable");
    }
    if config.server.jwt_secret.is_none() {
        tracing::warn!("JWT_SECRET is not set; protected routes will reject all requests");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::from_config(config));
    let _sweeper = cache::spawn_cleanup_task(
        Arc::clone(&state.cache),
        state.config.cache.cleanup_interval,
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn create_analysis(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdvisoryRequest>,
) -> Result<Json<AdvisoryResponse>, (StatusCode, Json<serde_json::Value>)> {
    let input = req.validate().map_err(|errors| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "success": false, "errors": errors })),
        )
    })?;

    let outcome = state.advisor.advise(&input).await;
    Ok(Json(AdvisoryResponse {
        analysis_available: !outcome.is_empty(),
        simple_allocation: simple_allocation(&outcome),
        analysis: outcome,
    }))
}

async fn cache_stats(
    State(state): State<Arc<AppState>>,
) -> Json<CacheStats> {
    Json(state.cache.stats())
}

async fn clear_cache(
    State(state): State<Arc<AppState>>,
) -> Json<ClearCacheResponse> {
    let removed = state.cache.clear();
    Json(ClearCacheResponse {
        success: true,
        message: "Cache cleared".to_string(),
        removed,
    })
}
