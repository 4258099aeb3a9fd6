use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::{parse_id, DifficultyRepository};
use crate::error::RepositoryResult;
use crate::models::Difficulty;

/// Read-only access to the seeded difficulty levels.
#[derive(Clone)]
pub struct SqlDifficultyRepository {
    pool: SqlitePool,
}

impl SqlDifficultyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn difficulty_from_row(row: &SqliteRow) -> RepositoryResult<Difficulty> {
    Ok(Difficulty { id: parse_id(row.try_get::<&str, _>("id")?)?, name: row.try_get("name")? })
}

#[async_trait]
impl DifficultyRepository for SqlDifficultyRepository {
    async fn get_all(&self) -> RepositoryResult<Vec<Difficulty>> {
        let rows = sqlx::query("SELECT id, name FROM difficulties ORDER BY rowid").fetch_all(&self.pool).await?;
        rows.iter().map(difficulty_from_row).collect()
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<Difficulty>> {
        let row = sqlx::query("SELECT id, name FROM difficulties WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(difficulty_from_row).transpose()
    }
}
