//! Implementation of the `devsync init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::fs;

use crate::adapters::sqlite::initialize_database;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, DatabaseConfig};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub config_path: PathBuf,
    pub config_written: bool,
    pub database_path: PathBuf,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if self.config_written {
            lines.push(format!("Wrote default configuration to {}", self.config_path.display()));
        } else {
            lines.push(format!("Kept existing configuration at {}", self.config_path.display()));
        }
        lines.push(format!("Database ready at {}", self.database_path.display()));
        lines.join("\n")
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };

    let devsync_dir = target.join(".devsync");
    fs::create_dir_all(&devsync_dir)
        .await
        .with_context(|| format!("Failed to create {}", devsync_dir.display()))?;

    let config_path = devsync_dir.join("config.yaml");
    let config_written = args.force || !config_path.exists();
    if config_written {
        let yaml = serde_yaml::to_string(&Config::default()).context("Failed to render default configuration")?;
        fs::write(&config_path, yaml)
            .await
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
    }

    let database_path = devsync_dir.join("devsync.db");
    let database = DatabaseConfig {
        path: database_path.to_string_lossy().into_owned(),
        ..DatabaseConfig::default()
    };
    initialize_database(&database)
        .await
        .context("Failed to initialize database")?;

    let out = InitOutput {
        success: true,
        message: format!("Initialized devsync in {}", target.display()),
        config_path,
        config_written,
        database_path,
    };
    output(&out, json_mode);
    Ok(())
}
