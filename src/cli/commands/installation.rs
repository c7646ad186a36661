//! Installation CLI commands.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use std::str::FromStr;

use crate::cli::context::{load_config, AppContext};
use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::models::{EnqueueOptions, Installation, InstallationSummary, JobPayload, RepositoryRef, SyncJob};
use crate::domain::ports::{JobQueue, SyncStateRepository};

#[derive(Args, Debug)]
pub struct InstallationArgs {
    #[command(subcommand)]
    pub command: InstallationCommands,
}

#[derive(Subcommand, Debug)]
pub enum InstallationCommands {
    /// Link an installation to a tracker site and queue its backfill
    Add {
        installation_id: i64,

        /// Tracker base URL, e.g. https://acme.atlassian.net
        jira_host: String,

        /// Repository as ID:OWNER/NAME (repeatable)
        #[arg(short, long = "repository", required = true)]
        repositories: Vec<RepositorySpec>,

        /// Register only; do not queue the backfill
        #[arg(long)]
        no_sync: bool,
    },
    /// Unlink an installation and drop its sync state
    Remove { installation_id: i64, jira_host: String },
    /// List linked installations
    List,
}

/// `ID:OWNER/NAME` as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySpec {
    pub id: String,
    pub owner: String,
    pub name: String,
}

impl FromStr for RepositorySpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || format!("expected ID:OWNER/NAME, got '{s}'");
        let (id, full_name) = s.split_once(':').ok_or_else(malformed)?;
        let (owner, name) = full_name.split_once('/').ok_or_else(malformed)?;
        if id.is_empty() || owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(malformed());
        }
        Ok(Self {
            id: id.to_string(),
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl RepositorySpec {
    fn into_ref(self, web_url: &str) -> RepositoryRef {
        let url = format!("{}/{}/{}", web_url.trim_end_matches('/'), self.owner, self.name);
        RepositoryRef::new(self.id, self.owner, self.name, url)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct InstallationActionOutput {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl CommandOutput for InstallationActionOutput {
    fn to_human(&self) -> String {
        match &self.job_id {
            Some(id) => format!("{}\nQueued backfill job {id}", self.message),
            None => self.message.clone(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct InstallationListOutput {
    pub installations: Vec<InstallationSummary>,
    pub total: usize,
}

impl CommandOutput for InstallationListOutput {
    fn to_human(&self) -> String {
        if self.installations.is_empty() {
            return "No installations found.".to_string();
        }
        let mut table = list_table(&["installation", "jira host", "repositories", "created"]);
        for installation in &self.installations {
            table.add_row(vec![
                installation.installation_id.to_string(),
                installation.jira_host.clone(),
                installation.repository_count.to_string(),
                installation.created_at.clone(),
            ]);
        }
        format!("{} installation(s):\n{table}", self.total)
    }
}

pub async fn execute(args: InstallationArgs, config: Option<&std::path::Path>, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(load_config(config)?).await?;

    match args.command {
        InstallationCommands::Add {
            installation_id,
            jira_host,
            repositories,
            no_sync,
        } => {
            if !(jira_host.starts_with("https://") || jira_host.starts_with("http://")) {
                bail!("jira_host must be an http(s) URL, got '{jira_host}'");
            }
            let jira_host = jira_host.trim_end_matches('/').to_string();
            let web_url = ctx.config.source.web_url.clone();
            let installation = repositories.into_iter().fold(
                Installation::new(installation_id, jira_host.clone()),
                |installation, spec| installation.with_repository(spec.into_ref(&web_url)),
            );

            ctx.state
                .add_installation(&installation)
                .await
                .context("Failed to register installation")?;

            let already_queued = ctx
                .queue
                .has_outstanding_sync(installation_id, &jira_host, None)
                .await
                .context("Failed to inspect the job queue")?;
            let job_id = if no_sync || already_queued {
                None
            } else {
                let id = ctx
                    .queue
                    .enqueue(
                        JobPayload::Sync(SyncJob::for_installation(installation_id, jira_host.clone())),
                        EnqueueOptions::default(),
                    )
                    .await
                    .context("Failed to queue backfill")?;
                Some(id.to_string())
            };

            output(
                &InstallationActionOutput {
                    success: true,
                    message: if already_queued && !no_sync {
                        format!(
                            "Installation {installation_id} linked to {jira_host} with {} repositories; \
                             the queued backfill picks up new repositories",
                            installation.repositories.len()
                        )
                    } else {
                        format!(
                            "Installation {installation_id} linked to {jira_host} with {} repositories",
                            installation.repositories.len()
                        )
                    },
                    job_id,
                },
                json_mode,
            );
        }

        InstallationCommands::Remove {
            installation_id,
            jira_host,
        } => {
            let jira_host = jira_host.trim_end_matches('/');
            let removed = ctx.state.remove_installation(installation_id, jira_host).await?;
            let message = if removed {
                format!("Installation {installation_id} on {jira_host} removed")
            } else {
                format!("Installation {installation_id} on {jira_host} not found")
            };
            output(
                &InstallationActionOutput {
                    success: removed,
                    message,
                    job_id: None,
                },
                json_mode,
            );
        }

        InstallationCommands::List => {
            let installations = ctx.state.list_installations().await?;
            output(
                &InstallationListOutput {
                    total: installations.len(),
                    installations,
                },
                json_mode,
            );
        }
    }

    Ok(())
}
