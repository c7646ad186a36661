//! SQLite-backed project occurrence counter.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::DomainResult;
use crate::domain::ports::ProjectOccurrenceCounter;

#[derive(Clone)]
pub struct SqliteProjectRepository {
    pool: SqlitePool,
}

impl SqliteProjectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Counters of one tracker site, most referenced first.
    pub async fn top_projects(&self, base_url: &str, limit: i64) -> DomainResult<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT project_key, occurrences FROM project_occurrences
             WHERE base_url = ? ORDER BY occurrences DESC, project_key LIMIT ?",
        )
        .bind(base_url)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl ProjectOccurrenceCounter for SqliteProjectRepository {
    async fn increment(&self, project_key: &str, base_url: &str) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO project_occurrences (project_key, base_url, occurrences, updated_at)
               VALUES (?, ?, 1, ?)
               ON CONFLICT (project_key, base_url) DO UPDATE SET
                   occurrences = occurrences + 1,
                   updated_at = excluded.updated_at"#,
        )
        .bind(project_key)
        .bind(base_url)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn occurrences(&self, project_key: &str, base_url: &str) -> DomainResult<i64> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT occurrences FROM project_occurrences WHERE project_key = ? AND base_url = ?",
        )
        .bind(project_key)
        .bind(base_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map_or(0, |(n,)| n))
    }
}
