use std::{env, time::Duration};

use url::Url;

use super::env::{
    AppConfig, ConfigError, DirectoryConfig, LoggingConfig, RemoteConfig, ReplacementConfig,
    SchedulerConfig,
};

const DEFAULT_API_BASE: &str = "https://hf-cover-block.stewardmcoy.workers.dev";
const DEFAULT_FETCH_TTL_MS: u64 = 1000 * 60 * 60 * 3;
const DEFAULT_REPLACEMENT: &str = "covers/steward-01.png";

pub fn load_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_base = env::var("COVER_API_BASE")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = api_base.trim_end_matches('/').to_string();
        Url::parse(&api_base).map_err(|_| ConfigError::Invalid("COVER_API_BASE"))?;

        let remote = RemoteConfig {
            api_base,
            fetch_ttl: Duration::from_millis(
                env::var("COVER_FETCH_TTL_MS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_FETCH_TTL_MS),
            ),
        };

        let covers = env::var("REPLACEMENT_COVERS")
            .map(|value| {
                value
                    .split(',')
                    .map(|part| part.trim().to_string())
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let replacement = ReplacementConfig {
            covers: if covers.is_empty() {
                vec![DEFAULT_REPLACEMENT.to_string()]
            } else {
                covers
            },
        };

        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            db_filename: env::var("DB_FILENAME").unwrap_or_else(|_| "coverguard.db".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        let scheduler = SchedulerConfig {
            refresh_crons: env::var("REFRESH_CRONS")
                .map(|value| {
                    value
                        .split(';')
                        .map(|part| part.trim().to_string())
                        .filter(|part| !part.is_empty())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_else(|_| vec!["0 0 * * * *".to_string()]),
        };

        Ok(Self {
            remote,
            replacement,
            directories,
            logging,
            scheduler,
        })
    }
}
