//! SQLite implementation of the SyncStateRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    EntitySync, Installation, InstallationSummary, RepoSyncStatus, RepositoryRef, SyncStatus,
};
use crate::domain::ports::SyncStateRepository;

const STATE_COLUMNS: &str = "installation_id, jira_host, repository_id, owner, name, url, \
     commit_status, commit_cursor, branch_status, branch_cursor, pull_status, pull_cursor";

#[derive(Clone)]
pub struct SqliteSyncStateRepository {
    pool: SqlitePool,
}

impl SqliteSyncStateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn installation_exists(&self, installation_id: i64, jira_host: &str) -> DomainResult<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM installations WHERE installation_id = ? AND jira_host = ?")
                .bind(installation_id)
                .bind(jira_host)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl SyncStateRepository for SqliteSyncStateRepository {
    async fn load(&self, installation_id: i64, jira_host: &str) -> DomainResult<Option<Vec<RepoSyncStatus>>> {
        if !self.installation_exists(installation_id, jira_host).await? {
            return Ok(None);
        }

        let rows: Vec<RepoSyncRow> = sqlx::query_as(&format!(
            "SELECT {STATE_COLUMNS} FROM repo_sync_states \
             WHERE installation_id = ? AND jira_host = ? ORDER BY rowid"
        ))
        .bind(installation_id)
        .bind(jira_host)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(TryInto::try_into)
            .collect::<DomainResult<Vec<RepoSyncStatus>>>()
            .map(Some)
    }

    async fn save(&self, status: &RepoSyncStatus) -> DomainResult<()> {
        let result = sqlx::query(
            r#"INSERT INTO repo_sync_states (installation_id, jira_host, repository_id, owner, name, url,
                   commit_status, commit_cursor, branch_status, branch_cursor, pull_status, pull_cursor, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT (installation_id, jira_host, repository_id) DO UPDATE SET
                   owner = excluded.owner,
                   name = excluded.name,
                   url = excluded.url,
                   commit_status = excluded.commit_status,
                   commit_cursor = excluded.commit_cursor,
                   branch_status = excluded.branch_status,
                   branch_cursor = excluded.branch_cursor,
                   pull_status = excluded.pull_status,
                   pull_cursor = excluded.pull_cursor,
                   updated_at = excluded.updated_at"#,
        )
        .bind(status.installation_id)
        .bind(&status.jira_host)
        .bind(&status.repository.id)
        .bind(&status.repository.owner)
        .bind(&status.repository.name)
        .bind(&status.repository.url)
        .bind(status.commits.status().as_str())
        .bind(status.commits.cursor())
        .bind(status.branches.status().as_str())
        .bind(status.branches.cursor())
        .bind(status.pulls.status().as_str())
        .bind(status.pulls.cursor())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            // The installation row is gone: the foreign key rejects the write.
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Err(DomainError::InstallationNotFound {
                    installation_id: status.installation_id,
                    jira_host: status.jira_host.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn add_installation(&self, installation: &Installation) -> DomainResult<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO installations (installation_id, jira_host, created_at) VALUES (?, ?, ?)
             ON CONFLICT (installation_id, jira_host) DO NOTHING",
        )
        .bind(installation.installation_id)
        .bind(&installation.jira_host)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        for repository in &installation.repositories {
            sqlx::query(
                r#"INSERT INTO repo_sync_states (installation_id, jira_host, repository_id, owner, name, url, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?)
                   ON CONFLICT (installation_id, jira_host, repository_id) DO UPDATE SET
                       owner = excluded.owner, name = excluded.name, url = excluded.url"#,
            )
            .bind(installation.installation_id)
            .bind(&installation.jira_host)
            .bind(&repository.id)
            .bind(&repository.owner)
            .bind(&repository.name)
            .bind(&repository.url)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn remove_installation(&self, installation_id: i64, jira_host: &str) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM installations WHERE installation_id = ? AND jira_host = ?")
            .bind(installation_id)
            .bind(jira_host)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_installations(&self) -> DomainResult<Vec<InstallationSummary>> {
        let rows: Vec<(i64, String, i64, String)> = sqlx::query_as(
            r#"SELECT i.installation_id, i.jira_host, COUNT(r.repository_id), i.created_at
               FROM installations i
               LEFT JOIN repo_sync_states r
                 ON r.installation_id = i.installation_id AND r.jira_host = i.jira_host
               GROUP BY i.installation_id, i.jira_host, i.created_at
               ORDER BY i.created_at, i.installation_id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(installation_id, jira_host, repository_count, created_at)| InstallationSummary {
                installation_id,
                jira_host,
                repository_count,
                created_at,
            })
            .collect())
    }

    async fn reset(
        &self,
        installation_id: i64,
        jira_host: &str,
        repository_id: Option<&str>,
    ) -> DomainResult<u64> {
        if !self.installation_exists(installation_id, jira_host).await? {
            return Err(DomainError::InstallationNotFound {
                installation_id,
                jira_host: jira_host.to_string(),
            });
        }

        let result = sqlx::query(
            r#"UPDATE repo_sync_states
               SET commit_status = 'pending', commit_cursor = NULL, updated_at = ?
               WHERE installation_id = ? AND jira_host = ?
                 AND (?4 IS NULL OR repository_id = ?4)"#,
        )
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(installation_id)
        .bind(jira_host)
        .bind(repository_id)
        .execute(&self.pool)
        .await?;

        if let (Some(id), 0) = (repository_id, result.rows_affected()) {
            return Err(DomainError::RepositoryNotFound(id.to_string()));
        }
        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct RepoSyncRow {
    installation_id: i64,
    jira_host: String,
    repository_id: String,
    owner: String,
    name: String,
    url: String,
    commit_status: String,
    commit_cursor: Option<String>,
    branch_status: String,
    branch_cursor: Option<String>,
    pull_status: String,
    pull_cursor: Option<String>,
}

fn entity(status: &str, cursor: Option<String>) -> DomainResult<EntitySync> {
    let status = SyncStatus::from_str(status)
        .ok_or_else(|| DomainError::SerializationError(format!("Invalid sync status: {status}")))?;
    Ok(EntitySync::from_parts(status, cursor))
}

impl TryFrom<RepoSyncRow> for RepoSyncStatus {
    type Error = DomainError;

    fn try_from(row: RepoSyncRow) -> Result<Self, Self::Error> {
        Ok(Self {
            installation_id: row.installation_id,
            jira_host: row.jira_host,
            repository: RepositoryRef::new(row.repository_id, row.owner, row.name, row.url),
            commits: entity(&row.commit_status, row.commit_cursor)?,
            branches: entity(&row.branch_status, row.branch_cursor)?,
            pulls: entity(&row.pull_status, row.pull_cursor)?,
        })
    }
}
