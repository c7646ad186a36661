//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::init::InitArgs;
use super::commands::installation::InstallationArgs;
use super::commands::push::PushArgs;
use super::commands::resync::ResyncArgs;
use super::commands::status::StatusArgs;
use super::commands::worker::WorkerArgs;

#[derive(Parser, Debug)]
#[command(name = "devsync")]
#[command(about = "devsync - resumable commit-history sync into Jira", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .devsync/config.yaml plus local overrides)
    #[arg(short, long, global = true, env = "DEVSYNC_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create .devsync/ with a default configuration and database
    Init(InitArgs),

    /// Manage linked installations
    Installation(InstallationArgs),

    /// Restart commit sync from the beginning of history
    Resync(ResyncArgs),

    /// Show per-repository sync progress and queue depth
    Status(StatusArgs),

    /// Queue the keyed commits of a push webhook payload
    Push(PushArgs),

    /// Process queued sync and push jobs
    Worker(WorkerArgs),
}
