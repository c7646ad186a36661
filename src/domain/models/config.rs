use serde::{Deserialize, Serialize};

/// Main configuration structure for devsync
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Source host (GitHub) configuration
    #[serde(default)]
    pub source: SourceConfig,

    /// Tracker (Jira) configuration
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Sync engine tuning
    #[serde(default)]
    pub sync: SyncConfig,

    /// Worker pool configuration
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".devsync/devsync.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        format!("sqlite:{}", self.path)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// File rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Source host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SourceConfig {
    /// API base URL (REST and GraphQL)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Web base URL used for author avatar and profile links
    #[serde(default = "default_web_url")]
    pub web_url: String,

    /// Installation access token; minted externally
    #[serde(default)]
    pub token: Option<String>,

    /// Commits requested per history page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Outgoing requests per second allowed per installation
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_web_url() -> String {
    "https://github.com".to_string()
}

const fn default_page_size() -> u32 {
    20
}

const fn default_requests_per_second() -> u32 {
    10
}

const fn default_timeout_secs() -> u64 {
    30
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            web_url: default_web_url(),
            token: None,
            page_size: default_page_size(),
            requests_per_second: default_requests_per_second(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TrackerConfig {
    /// Connect app key, used as the JWT issuer
    #[serde(default = "default_app_key")]
    pub app_key: String,

    /// Shared secret from the tracker's install handshake; requests are
    /// unsigned when unset
    #[serde(default)]
    pub shared_secret: Option<String>,

    /// HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_app_key() -> String {
    "com.github.integration.production".to_string()
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            app_key: default_app_key(),
            shared_secret: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Sync engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SyncConfig {
    /// Minimum delay between continuation jobs of one installation
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the rate-limit backoff
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Commits per upload request (tracker limit 400)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// File entries per commit (tracker limit 10)
    #[serde(default = "default_max_files_per_commit")]
    pub max_files_per_commit: usize,

    /// Branch crawled when the remote reports no default branch
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

const fn default_min_delay_ms() -> u64 {
    1000
}

const fn default_max_delay_ms() -> u64 {
    60_000
}

const fn default_chunk_size() -> usize {
    400
}

const fn default_max_files_per_commit() -> usize {
    10
}

fn default_branch() -> String {
    "master".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            chunk_size: default_chunk_size(),
            max_files_per_commit: default_max_files_per_commit(),
            default_branch: default_branch(),
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkerConfig {
    /// Jobs processed concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Execution timeout of one job
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// How long a claimed job stays invisible to other workers
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,

    /// Queue poll interval when idle
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

const fn default_concurrency() -> usize {
    4
}

const fn default_job_timeout_secs() -> u64 {
    120
}

const fn default_lease_secs() -> u64 {
    300
}

const fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            job_timeout_secs: default_job_timeout_secs(),
            lease_secs: default_lease_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}
