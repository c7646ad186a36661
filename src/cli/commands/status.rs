//! `devsync status`: per-repository progress and queue depth.

use anyhow::Result;
use clap::Args;
use std::path::Path;

use crate::cli::context::{load_config, AppContext};
use crate::cli::output::{list_table, output, truncate, CommandOutput};
use crate::domain::models::{EntityType, QueueCounts, RepoSyncStatus};
use crate::domain::ports::{JobConsumer, SyncStateRepository};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only this installation
    #[arg(short, long)]
    pub installation: Option<i64>,

    /// Also list the next pending jobs
    #[arg(long)]
    pub jobs: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct RepositoryStatusRow {
    pub installation_id: i64,
    pub jira_host: String,
    pub repository: String,
    pub commits: &'static str,
    pub branches: &'static str,
    pub pulls: &'static str,
    pub commit_cursor: Option<String>,
}

impl RepositoryStatusRow {
    fn new(installation_id: i64, jira_host: &str, status: &RepoSyncStatus) -> Self {
        let phase = |entity| status.entity(entity).phase().as_str();
        Self {
            installation_id,
            jira_host: jira_host.to_string(),
            repository: status.repository.full_name(),
            commits: phase(EntityType::Commits),
            branches: phase(EntityType::Branches),
            pulls: phase(EntityType::Pulls),
            commit_cursor: status.commits.cursor().map(str::to_string),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct PendingJobRow {
    pub id: String,
    pub kind: &'static str,
    pub installation_id: i64,
    pub run_at: String,
    pub attempts: u32,
}

#[derive(Debug, serde::Serialize)]
pub struct ProjectRow {
    pub jira_host: String,
    pub project_key: String,
    pub occurrences: i64,
}

#[derive(Debug, serde::Serialize)]
pub struct StatusOutput {
    pub repositories: Vec<RepositoryStatusRow>,
    pub projects: Vec<ProjectRow>,
    pub queue: QueueCounts,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pending_jobs: Vec<PendingJobRow>,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let mut sections = Vec::new();
        if self.repositories.is_empty() {
            sections.push("No repositories tracked.".to_string());
        } else {
            let mut table = list_table(&["installation", "repository", "commits", "branches", "pulls", "cursor"]);
            for row in &self.repositories {
                table.add_row(vec![
                    row.installation_id.to_string(),
                    row.repository.clone(),
                    row.commits.to_string(),
                    row.branches.to_string(),
                    row.pulls.to_string(),
                    row.commit_cursor.as_deref().map_or_else(|| "-".to_string(), |c| truncate(c, 24)),
                ]);
            }
            sections.push(table.to_string());
        }

        if !self.projects.is_empty() {
            let mut table = list_table(&["site", "project", "commits"]);
            for row in &self.projects {
                table.add_row(vec![row.jira_host.clone(), row.project_key.clone(), row.occurrences.to_string()]);
            }
            sections.push(table.to_string());
        }

        sections.push(format!(
            "Queue: {} queued, {} running, {} completed, {} failed",
            self.queue.queued, self.queue.running, self.queue.completed, self.queue.failed
        ));

        if !self.pending_jobs.is_empty() {
            let mut table = list_table(&["job", "kind", "installation", "run at", "attempts"]);
            for job in &self.pending_jobs {
                table.add_row(vec![
                    job.id[..8].to_string(),
                    job.kind.to_string(),
                    job.installation_id.to_string(),
                    job.run_at.clone(),
                    job.attempts.to_string(),
                ]);
            }
            sections.push(table.to_string());
        }
        sections.join("\n\n")
    }
}

pub async fn execute(args: StatusArgs, config: Option<&Path>, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(load_config(config)?).await?;

    let mut repositories = Vec::new();
    let mut hosts: Vec<String> = Vec::new();
    for installation in ctx.state.list_installations().await? {
        if args.installation.is_some_and(|id| id != installation.installation_id) {
            continue;
        }
        if !hosts.contains(&installation.jira_host) {
            hosts.push(installation.jira_host.clone());
        }
        let statuses = ctx
            .state
            .load(installation.installation_id, &installation.jira_host)
            .await?
            .unwrap_or_default();
        repositories.extend(
            statuses
                .iter()
                .map(|s| RepositoryStatusRow::new(installation.installation_id, &installation.jira_host, s)),
        );
    }

    let mut projects = Vec::new();
    for host in &hosts {
        for (project_key, occurrences) in ctx.projects.top_projects(host, 5).await? {
            projects.push(ProjectRow {
                jira_host: host.clone(),
                project_key,
                occurrences,
            });
        }
    }

    let pending_jobs = if args.jobs {
        ctx.queue
            .pending(20)
            .await?
            .into_iter()
            .map(|job| PendingJobRow {
                id: job.id.to_string(),
                kind: job.payload.kind(),
                installation_id: job.payload.installation_id(),
                run_at: job.run_at.to_rfc3339(),
                attempts: job.attempts,
            })
            .collect()
    } else {
        Vec::new()
    };

    output(
        &StatusOutput {
            repositories,
            projects,
            queue: ctx.queue.counts().await?,
            pending_jobs,
        },
        json_mode,
    );
    Ok(())
}
