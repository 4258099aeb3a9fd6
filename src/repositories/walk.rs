use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::query::{WalkQuery, WALK_BASE_SELECT};
use super::{parse_id, WalkRepository};
use crate::error::RepositoryResult;
use crate::models::{Difficulty, Region, Walk, WalkFields};

#[derive(Clone)]
pub struct SqlWalkRepository {
    pool: SqlitePool,
}

impl SqlWalkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn walk_from_row(row: &SqliteRow) -> RepositoryResult<Walk> {
    let difficulty_id = parse_id(row.try_get::<&str, _>("difficulty_id")?)?;
    let region_id = parse_id(row.try_get::<&str, _>("region_id")?)?;
    Ok(Walk {
        id: parse_id(row.try_get::<&str, _>("id")?)?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        length_in_km: row.try_get("length_in_km")?,
        walk_image_url: row.try_get("walk_image_url")?,
        difficulty_id,
        region_id,
        difficulty: Difficulty { id: difficulty_id, name: row.try_get("difficulty_name")? },
        region: Region {
            id: region_id,
            code: row.try_get("region_code")?,
            name: row.try_get("region_name")?,
            region_image_url: row.try_get("region_image_url")?,
        },
    })
}

/// Joined lookup on an open connection, so writes can read back inside their transaction.
async fn fetch_walk(conn: &mut SqliteConnection, id: Uuid) -> RepositoryResult<Option<Walk>> {
    let row = sqlx::query(&format!("{WALK_BASE_SELECT} WHERE w.id = ?1"))
        .bind(id.to_string())
        .fetch_optional(conn)
        .await?;
    row.as_ref().map(walk_from_row).transpose()
}

#[async_trait]
impl WalkRepository for SqlWalkRepository {
    async fn list(&self, query: &WalkQuery) -> RepositoryResult<Vec<Walk>> {
        let plan = query.plan();
        tracing::debug!(?plan, "Composing walk query");
        let mut qb = plan.build();
        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(walk_from_row).collect()
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<Walk>> {
        let mut conn = self.pool.acquire().await?;
        fetch_walk(&mut *conn, id).await
    }

    async fn create(&self, fields: WalkFields) -> RepositoryResult<Walk> {
        let id = Uuid::new_v4();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"INSERT INTO walks (id, name, description, length_in_km, walk_image_url, difficulty_id, region_id)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
        )
        .bind(id.to_string())
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.length_in_km)
        .bind(&fields.walk_image_url)
        .bind(fields.difficulty_id.to_string())
        .bind(fields.region_id.to_string())
        .execute(&mut *tx)
        .await?;
        let walk = fetch_walk(&mut *tx, id).await?.ok_or_else(|| {
            crate::error::RepositoryError::Query(format!("walk {} vanished inside its own transaction", id))
        })?;
        tx.commit().await?;

        tracing::debug!(walk_id = %walk.id, region_id = %walk.region_id, "Walk created");
        Ok(walk)
    }

    async fn update(&self, id: Uuid, fields: WalkFields) -> RepositoryResult<Option<Walk>> {
        let mut tx = self.pool.begin().await?;
        let exists = sqlx::query("SELECT 1 FROM walks WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !exists {
            return Ok(None);
        }

        sqlx::query(
            r#"UPDATE walks
               SET name = ?1, description = ?2, length_in_km = ?3, walk_image_url = ?4,
                   difficulty_id = ?5, region_id = ?6
               WHERE id = ?7"#,
        )
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.length_in_km)
        .bind(&fields.walk_image_url)
        .bind(fields.difficulty_id.to_string())
        .bind(fields.region_id.to_string())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;
        // Re-read so the joined difficulty and region reflect the new references.
        let updated = fetch_walk(&mut *tx, id).await?;
        tx.commit().await?;

        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<Option<Walk>> {
        let mut tx = self.pool.begin().await?;
        let Some(walk) = fetch_walk(&mut *tx, id).await? else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM walks WHERE id = ?1").bind(id.to_string()).execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(Some(walk))
    }
}
