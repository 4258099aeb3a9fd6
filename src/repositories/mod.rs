//! Repositories over the SQLite store.
//!
//! Each entity gets an `async_trait` interface and a `Sql*` implementation
//! backed by a [`sqlx::SqlitePool`]. Writes run in their own transaction and
//! commit before returning. Id-keyed lookups, updates and deletes return
//! `Ok(None)` when no row matches; store failures come back as
//! [`RepositoryError`](crate::error::RepositoryError).

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{RepositoryError, RepositoryResult};
use crate::models::{Difficulty, Image, ImageUpload, Region, RegionFields, RequestOrigin, Walk, WalkFields};

pub mod difficulty;
pub mod image;
pub mod query;
pub mod region;
pub mod walk;

pub use difficulty::SqlDifficultyRepository;
pub use image::{FileSink, LocalFileSink, SqlImageRepository};
pub use query::WalkQuery;
pub use region::SqlRegionRepository;
pub use walk::SqlWalkRepository;

#[async_trait]
pub trait RegionRepository: Send + Sync {
    /// Every region, full scan in store order.
    async fn get_all(&self) -> RepositoryResult<Vec<Region>>;

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<Region>>;

    /// Persists a new region under a freshly generated id.
    async fn create(&self, fields: RegionFields) -> RepositoryResult<Region>;

    /// Replaces the mutable attributes. `None` if `id` does not exist.
    async fn update(&self, id: Uuid, fields: RegionFields) -> RepositoryResult<Option<Region>>;

    /// Hard delete. Returns the removed region, or `None` if `id` does not exist.
    async fn delete(&self, id: Uuid) -> RepositoryResult<Option<Region>>;
}

#[async_trait]
pub trait WalkRepository: Send + Sync {
    /// Filter, sort and paginate walks according to `query`.
    async fn list(&self, query: &WalkQuery) -> RepositoryResult<Vec<Walk>>;

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<Walk>>;

    async fn create(&self, fields: WalkFields) -> RepositoryResult<Walk>;

    async fn update(&self, id: Uuid, fields: WalkFields) -> RepositoryResult<Option<Walk>>;

    async fn delete(&self, id: Uuid) -> RepositoryResult<Option<Walk>>;
}

#[async_trait]
pub trait DifficultyRepository: Send + Sync {
    async fn get_all(&self) -> RepositoryResult<Vec<Difficulty>>;

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<Difficulty>>;
}

#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Stores the payload, then records it with a URL resolved against `origin`.
    /// No record is written if storing the payload fails.
    async fn upload(&self, image: ImageUpload, origin: &RequestOrigin) -> RepositoryResult<Image>;
}

/// Ids are stored as hyphenated TEXT.
pub(crate) fn parse_id(raw: &str) -> RepositoryResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| RepositoryError::Query(format!("invalid id {:?} in store: {}", raw, e)))
}
