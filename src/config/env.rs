use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub remote: RemoteConfig,
    pub replacement: ReplacementConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the cover-ban service, no trailing slash.
    pub api_base: String,
    /// Maximum age of the cached ban list before a refresh is attempted.
    pub fetch_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct ReplacementConfig {
    /// Locations shown in place of banned covers. Never empty.
    pub covers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
    pub data_dir: String,
    pub db_filename: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Cron specs for background TTL-gated refreshes; may be empty.
    pub refresh_crons: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
