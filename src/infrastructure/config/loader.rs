use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::{MAX_COMMITS_PER_REQUEST, MAX_FILES_PER_COMMIT};

/// GraphQL `history(first:)` upper bound.
const MAX_PAGE_SIZE: u32 = 100;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid page_size: {0}. Must be between 1 and {MAX_PAGE_SIZE}")]
    InvalidPageSize(u32),

    #[error("Invalid requests_per_second: {0}. Must be at least 1")]
    InvalidRequestRate(u32),

    #[error("Invalid chunk_size: {0}. Must be between 1 and {MAX_COMMITS_PER_REQUEST}")]
    InvalidChunkSize(usize),

    #[error("Invalid max_files_per_commit: {0}. Must be between 1 and {MAX_FILES_PER_COMMIT}")]
    InvalidMaxFiles(usize),

    #[error("Invalid delay configuration: min_delay_ms ({0}) must not exceed max_delay_ms ({1})")]
    InvalidDelay(u64, u64),

    #[error("Invalid concurrency: {0}. Must be at least 1")]
    InvalidConcurrency(usize),

    #[error("Invalid lease: lease_secs ({0}) must exceed job_timeout_secs ({1})")]
    InvalidLease(u64, u64),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .devsync/config.yaml (created by init)
    /// 3. .devsync/local.yaml (local overrides, optional)
    /// 4. Environment variables (DEVSYNC_* prefix, `__` separates sections)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".devsync/config.yaml"))
            .merge(Yaml::file(".devsync/local.yaml"))
            .merge(Env::prefixed("DEVSYNC_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file. Environment overrides still
    /// apply on top.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("DEVSYNC_").split("__"))
            .extract()
            .context(format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        if !["json", "pretty"].contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        if !["daily", "hourly", "never"].contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.source.api_url.is_empty() {
            return Err(ConfigError::ValidationFailed("source.api_url cannot be empty".to_string()));
        }
        if config.source.page_size == 0 || config.source.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidPageSize(config.source.page_size));
        }
        if config.source.requests_per_second == 0 {
            return Err(ConfigError::InvalidRequestRate(config.source.requests_per_second));
        }

        let sync = &config.sync;
        if sync.chunk_size == 0 || sync.chunk_size > MAX_COMMITS_PER_REQUEST {
            return Err(ConfigError::InvalidChunkSize(sync.chunk_size));
        }
        if sync.max_files_per_commit == 0 || sync.max_files_per_commit > MAX_FILES_PER_COMMIT {
            return Err(ConfigError::InvalidMaxFiles(sync.max_files_per_commit));
        }
        if sync.min_delay_ms > sync.max_delay_ms {
            return Err(ConfigError::InvalidDelay(sync.min_delay_ms, sync.max_delay_ms));
        }
        if sync.default_branch.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("sync.default_branch cannot be empty".to_string()));
        }

        let worker = &config.worker;
        if worker.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(worker.concurrency));
        }
        if worker.job_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed("worker.job_timeout_secs must be positive".to_string()));
        }
        // A lease shorter than the timeout lets a second worker claim a job
        // that is still running.
        if worker.lease_secs <= worker.job_timeout_secs {
            return Err(ConfigError::InvalidLease(worker.lease_secs, worker.job_timeout_secs));
        }

        Ok(())
    }
}
