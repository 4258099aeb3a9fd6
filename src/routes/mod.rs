//! HTTP handlers and the router that wires them to the shared state.
//!
//! - `regions`, `walks`, `difficulties`: entity CRUD under `/api`
//! - `images`: multipart upload; stored files are served under `/images`
//! - `health`: liveness, readiness, metrics and version

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::{auth, rate_limit, security_headers, validation},
    state::AppState,
};

pub mod difficulties;
pub mod health;
pub mod images;
pub mod regions;
pub mod walks;

pub(crate) fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::InvalidInput(format!("Invalid UUID format: {}", raw)))
}

/// Builds the full application router, middleware included.
pub fn router(state: AppState) -> Router {
    let cfg = state.config.clone();

    let api = Router::new()
        .route("/api/regions", get(regions::list_regions).post(regions::create_region))
        .route(
            "/api/regions/{id}",
            get(regions::get_region).put(regions::update_region).delete(regions::delete_region),
        )
        .route("/api/walks", get(walks::list_walks).post(walks::create_walk))
        .route("/api/walks/{id}", get(walks::get_walk).put(walks::update_walk).delete(walks::delete_walk))
        .route("/api/difficulties", get(difficulties::list_difficulties))
        .route("/api/difficulties/{id}", get(difficulties::get_difficulty))
        .route("/api/images/upload", post(images::upload_image))
        .layer(from_fn_with_state(state.rate_limiter.clone(), rate_limit::endpoint_rate_limit_middleware))
        .layer(from_fn_with_state(cfg.clone(), auth::resolve_caller_middleware));

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .route("/version", get(health::version))
        .merge(api)
        .nest_service("/images", ServeDir::new(&cfg.images.root_dir))
        .with_state(state.clone())
        .layer(DefaultBodyLimit::max(validation::max_body_bytes(&cfg.images)))
        .layer(from_fn_with_state(cfg.clone(), validation::validate_request_middleware))
        .layer(from_fn_with_state(state.global_limiter.clone(), rate_limit::rate_limit_middleware))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(cfg, security_headers::security_headers_middleware))
}
