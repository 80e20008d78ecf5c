//! Practice Engine HTTP surface.
//!
//! This is the external collaborator spec §6 describes as plumbing: a
//! RESTful layer over the orchestrator operations in `practice-engine`,
//! generic over whichever `KvBackend` the deployment wires up (in-memory for
//! tests and local dev, Redis behind the `redis-backend` feature).

pub mod handlers;
pub mod middleware;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use practice_config::AppConfig;
use practice_domain::{HealthResponse, ReadyResponse};
use practice_engine::Engine;
use practice_store::KvBackend;

/// Application state shared across handlers.
pub struct AppState<B: KvBackend + 'static> {
    pub engine: Arc<Engine<B>>,
    pub config: AppConfig,
    pub start_time: Instant,
}

impl<B: KvBackend + 'static> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            config: self.config.clone(),
            start_time: self.start_time,
        }
    }
}

pub fn build_router<B: KvBackend + 'static>(state: Arc<AppState<B>>) -> Router {
    Router::new()
        .route("/v1/health", get(health::<B>))
        .route("/v1/ready", get(ready::<B>))
        .route(
            "/v1/goals",
            post(handlers::goals::create_goal::<B>).get(handlers::goals::list_goals::<B>),
        )
        .route(
            "/v1/goals/{id}",
            get(handlers::goals::get_goal::<B>).delete(handlers::goals::delete_goal::<B>),
        )
        .route("/v1/goals/{id}/quests", post(handlers::goals::on_goal_created::<B>))
        .route("/v1/goals/{id}/priority", patch(handlers::goals::set_priority::<B>))
        .route("/v1/goals/{id}/pause", post(handlers::goals::pause_goal::<B>))
        .route("/v1/goals/{id}/resume", post(handlers::goals::resume_goal::<B>))
        .route("/v1/goals/{id}/progress", get(handlers::goals::get_path_progress::<B>))
        .route("/v1/practice/today", get(handlers::practice::get_today::<B>))
        .route(
            "/v1/sparks/{id}/complete",
            post(handlers::practice::mark_spark_complete::<B>),
        )
        .route("/v1/sparks/{id}/skip", post(handlers::practice::skip_spark::<B>))
        .route("/v1/skills/{id}/rating", post(handlers::practice::rate_difficulty::<B>))
        .route("/v1/drills/{id}/activate", post(handlers::practice::activate_drill::<B>))
        .route("/v1/drills/{id}/outcome", post(handlers::practice::record_drill_outcome::<B>))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint (liveness only, no dependency checks).
async fn health<B: KvBackend + 'static>(State(state): State<Arc<AppState<B>>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build_sha: option_env!("BUILD_SHA").unwrap_or("dev").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// Readiness check: a store round-trip against a throwaway key, since the
/// Secure Store is the only required dependency the core owns directly
/// (spec §6: the KV backend is the one collaborator every operation needs).
async fn ready<B: KvBackend + 'static>(State(state): State<Arc<AppState<B>>>) -> Json<ReadyResponse> {
    let store_status = match state.engine.store_backend().exists("__readiness_probe__").await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };
    Json(ReadyResponse {
        status: if store_status == "connected" { "ok" } else { "degraded" }.to_string(),
        store: store_status.to_string(),
    })
}
