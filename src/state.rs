use std::sync::Arc;

use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::middleware::rate_limit::{UPLOAD_ENDPOINT, WRITE_ENDPOINT};
use crate::middleware::{EndpointRateLimiter, RateLimiter};
use crate::repositories::{
    DifficultyRepository, ImageRepository, LocalFileSink, RegionRepository, SqlDifficultyRepository,
    SqlImageRepository, SqlRegionRepository, SqlWalkRepository, WalkRepository,
};

/// Shared application state handed to every handler.
///
/// Repositories sit behind trait objects so handlers never see the store.
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Arc<AppConfig>,
    pub metrics: Metrics,
    /// Global per-IP limit.
    pub global_limiter: RateLimiter,
    /// Stricter limits for uploads and entity writes.
    pub rate_limiter: EndpointRateLimiter,
    pub regions: Arc<dyn RegionRepository>,
    pub walks: Arc<dyn WalkRepository>,
    pub difficulties: Arc<dyn DifficultyRepository>,
    pub images: Arc<dyn ImageRepository>,
}

impl AppState {
    /// Wires the SQL repositories and a local file sink rooted at `images.root_dir`.
    ///
    /// Endpoint limits: 30 uploads and 120 entity writes per minute per IP.
    pub fn new(db: sqlx::SqlitePool, config: AppConfig) -> Self {
        let proxies = &config.rate_limit.trusted_proxies;
        let rate_limiter = EndpointRateLimiter::with_limits(&[(UPLOAD_ENDPOINT, 30, 60), (WRITE_ENDPOINT, 120, 60)])
            .trusting(proxies);
        let global_limiter =
            RateLimiter::new(config.rate_limit.max_requests, config.rate_limit.window_seconds).trusting(proxies);
        let sink = Arc::new(LocalFileSink::new(config.images.root_dir.clone()));

        Self {
            regions: Arc::new(SqlRegionRepository::new(db.clone())),
            walks: Arc::new(SqlWalkRepository::new(db.clone())),
            difficulties: Arc::new(SqlDifficultyRepository::new(db.clone())),
            images: Arc::new(SqlImageRepository::new(db.clone(), sink)),
            db,
            config: Arc::new(config),
            metrics: Metrics::new(),
            global_limiter,
            rate_limiter,
        }
    }
}
