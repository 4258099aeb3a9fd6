//! Crate-level tests against a real SQLite file and image directory.
//!
//! - **repository_tests**: region/walk CRUD, constraint handling and the walk query composer
//! - **image_tests**: upload ordering and stored file location
//! - **api_tests**: full router through `tower::ServiceExt::oneshot`
//! - **config_tests**: defaults and validation
//! - **db_tests**: schema and seed data
//! - **error_tests**: error mapping and the JSON error envelope

pub mod api_tests;

use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db;
use crate::models::{RegionFields, Walk, WalkFields};

/// A migrated database and an image root, both removed when dropped.
pub struct TestEnv {
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub config: AppConfig,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.database.url = format!("sqlite://{}", dir.path().join("nzwalks-test.db").display());
        config.database.max_connections = 4;
        config.database.seed_sample_regions = false;
        config.images.root_dir = dir.path().join("Images");

        let pool = db::connect(&config.database).await.unwrap();
        db::init_db(&pool).await.unwrap();

        Self { dir, pool, config }
    }
}

pub fn region_fields(code: &str, name: &str) -> RegionFields {
    RegionFields { code: code.to_string(), name: name.to_string(), region_image_url: None }
}

pub fn walk_fields(name: &str, length_in_km: f64, region_id: Uuid, difficulty: &str) -> WalkFields {
    WalkFields {
        name: name.to_string(),
        description: format!("{} track", name),
        length_in_km,
        walk_image_url: None,
        difficulty_id: difficulty_id(difficulty),
        region_id,
    }
}

/// Id of the seeded difficulty called `name`.
pub fn difficulty_id(name: &str) -> Uuid {
    let (id, _) = db::DIFFICULTIES
        .iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(name))
        .unwrap_or_else(|| panic!("no built-in difficulty {:?}", name));
    Uuid::parse_str(id).unwrap()
}

/// The writable attributes of an existing walk.
pub fn fields_of(walk: &Walk) -> WalkFields {
    WalkFields {
        name: walk.name.clone(),
        description: walk.description.clone(),
        length_in_km: walk.length_in_km,
        walk_image_url: walk.walk_image_url.clone(),
        difficulty_id: walk.difficulty_id,
        region_id: walk.region_id,
    }
}
