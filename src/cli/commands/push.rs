//! `devsync push`: queue the keyed commits of a push webhook payload.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

use crate::cli::context::{load_config, AppContext};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{EnqueueOptions, JobPayload};
use crate::domain::ports::JobQueue;
use crate::services::{create_push_job, PushEvent};

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Tracker base URL of the installation
    pub jira_host: String,

    /// Webhook payload file; `-` reads stdin
    #[arg(short, long, default_value = "-")]
    pub event: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct PushOutput {
    pub queued: bool,
    pub commits: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl CommandOutput for PushOutput {
    fn to_human(&self) -> String {
        match &self.job_id {
            Some(id) => format!("Queued {} commit(s) as job {id}", self.commits),
            None => "No commit in the push references an issue; nothing queued.".to_string(),
        }
    }
}

async fn read_event(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut body = String::new();
        tokio::io::stdin()
            .read_to_string(&mut body)
            .await
            .context("Failed to read push event from stdin")?;
        Ok(body)
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }
}

pub async fn execute(args: PushArgs, config: Option<&Path>, json_mode: bool) -> Result<()> {
    let body = read_event(&args.event).await?;
    let event: PushEvent = serde_json::from_str(&body).context("Malformed push event")?;

    let Some(job) = create_push_job(&event, args.jira_host.trim_end_matches('/')) else {
        output(
            &PushOutput {
                queued: false,
                commits: 0,
                job_id: None,
            },
            json_mode,
        );
        return Ok(());
    };

    let ctx = AppContext::open(load_config(config)?).await?;
    let commits = job.shas.len();
    // Failed pushes stay in the queue for inspection.
    let options = EnqueueOptions {
        remove_on_fail: false,
        ..EnqueueOptions::default()
    };
    let job_id = ctx
        .queue
        .enqueue(JobPayload::Push(job), options)
        .await
        .context("Failed to queue push")?;

    output(
        &PushOutput {
            queued: true,
            commits,
            job_id: Some(job_id.to_string()),
        },
        json_mode,
    );
    Ok(())
}
