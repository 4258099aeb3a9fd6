use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::{parse_id, RegionRepository};
use crate::error::RepositoryResult;
use crate::models::{Region, RegionFields};

const SELECT_REGION: &str = "SELECT id, code, name, region_image_url FROM regions";

#[derive(Clone)]
pub struct SqlRegionRepository {
    pool: SqlitePool,
}

impl SqlRegionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn region_from_row(row: &SqliteRow) -> RepositoryResult<Region> {
    Ok(Region {
        id: parse_id(row.try_get::<&str, _>("id")?)?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        region_image_url: row.try_get("region_image_url")?,
    })
}

#[async_trait]
impl RegionRepository for SqlRegionRepository {
    async fn get_all(&self) -> RepositoryResult<Vec<Region>> {
        let rows = sqlx::query(&format!("{SELECT_REGION} ORDER BY rowid")).fetch_all(&self.pool).await?;
        rows.iter().map(region_from_row).collect()
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<Region>> {
        let row = sqlx::query(&format!("{SELECT_REGION} WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(region_from_row).transpose()
    }

    async fn create(&self, fields: RegionFields) -> RepositoryResult<Region> {
        let region = Region {
            id: Uuid::new_v4(),
            code: fields.code,
            name: fields.name,
            region_image_url: fields.region_image_url,
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO regions (id, code, name, region_image_url) VALUES (?1, ?2, ?3, ?4)")
            .bind(region.id.to_string())
            .bind(&region.code)
            .bind(&region.name)
            .bind(&region.region_image_url)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::debug!(region_id = %region.id, code = %region.code, "Region created");
        Ok(region)
    }

    async fn update(&self, id: Uuid, fields: RegionFields) -> RepositoryResult<Option<Region>> {
        let mut tx = self.pool.begin().await?;
        let existing = sqlx::query(&format!("{SELECT_REGION} WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(existing) = existing.as_ref().map(region_from_row).transpose()? else {
            return Ok(None);
        };

        let updated = existing.with_fields(fields);
        sqlx::query("UPDATE regions SET code = ?1, name = ?2, region_image_url = ?3 WHERE id = ?4")
            .bind(&updated.code)
            .bind(&updated.name)
            .bind(&updated.region_image_url)
            .bind(updated.id.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(updated))
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<Option<Region>> {
        let mut tx = self.pool.begin().await?;
        let existing = sqlx::query(&format!("{SELECT_REGION} WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(region) = existing.as_ref().map(region_from_row).transpose()? else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM regions WHERE id = ?1").bind(id.to_string()).execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(Some(region))
    }
}
