//! devsync CLI entry point.

use clap::Parser;

use devsync::cli::commands::{init, installation, push, resync, status, worker};
use devsync::cli::context::load_config;
use devsync::cli::{handle_error, Cli, Commands};
use devsync::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    // Logging follows the loaded configuration; `init` runs before one exists.
    let _logger = match load_config(config_path) {
        Ok(config) => LoggerImpl::init(&LogConfig::from(&config.logging)).ok(),
        Err(_) => LoggerImpl::init(&LogConfig::default()).ok(),
    };

    let result = match cli.command {
        Commands::Init(args) => init::execute(args, cli.json).await,
        Commands::Installation(args) => installation::execute(args, config_path, cli.json).await,
        Commands::Resync(args) => resync::execute(args, config_path, cli.json).await,
        Commands::Status(args) => status::execute(args, config_path, cli.json).await,
        Commands::Push(args) => push::execute(args, config_path, cli.json).await,
        Commands::Worker(args) => worker::execute(args, config_path, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
