//! Dashboard configuration file support.
//!
//! This module reads repository, Postgres and dashboard settings from a TOML
//! file. Every section is optional:
//!
//! ```toml
//! [repository]
//! type = "postgres"
//!
//! [postgres]
//! database_url = "postgresql://reviewer@localhost:5432/incidents"
//! max_connections = 5
//!
//! [dashboard]
//! query_file = "queries/review-check.sql"
//! result_shape = "report"
//! default_timeframe = "24h"
//! max_sessions = 10000
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::config::PostgresConfig;
use super::factory::RepositoryType;
use super::repository::{ErrorContext, RepositoryError};
use crate::models::{Preset, ResultShape};
use crate::services::QuerySettings;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "DASHBOARD_CONFIG";

/// Dashboard configuration from file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub repository: RepositorySettings,
    #[serde(default)]
    pub postgres: PostgresSettings,
    #[serde(default)]
    pub dashboard: DashboardSettings,
}

/// Repository type settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySettings {
    #[serde(rename = "type", default = "default_repo_type")]
    pub repo_type: String,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            repo_type: default_repo_type(),
        }
    }
}

/// Postgres connection settings.
///
/// An empty `database_url` means "build it from the environment".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresSettings {
    #[serde(default)]
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_connections: default_max_connections(),
            min_connections: 0,
            connect_timeout: default_connect_timeout(),
            idle_timeout: default_idle_timeout(),
        }
    }
}

/// Query and selector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSettings {
    #[serde(default = "default_query_file")]
    pub query_file: PathBuf,
    #[serde(default)]
    pub result_shape: ResultShape,
    #[serde(default = "default_timeframe")]
    pub default_timeframe: String,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            query_file: default_query_file(),
            result_shape: ResultShape::default(),
            default_timeframe: default_timeframe(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_repo_type() -> String {
    "local".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_query_file() -> PathBuf {
    PathBuf::from(crate::services::DEFAULT_QUERY_FILE)
}

fn default_max_sessions() -> usize {
    crate::services::DEFAULT_MAX_SESSIONS
}

fn default_timeframe() -> String {
    Preset::default().key().to_string()
}

impl RepositoryConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let context = || {
            ErrorContext::new("load_config")
                .with_entity("config_file")
                .with_details(path.display().to_string())
        };

        let content = fs::read_to_string(path).map_err(|e| {
            RepositoryError::configuration_with_context(
                format!("Failed to read config file: {}", e),
                context(),
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            RepositoryError::configuration_with_context(
                format!("Failed to parse config file: {}", e),
                context(),
            )
        })
    }

    /// Load configuration from the default location.
    ///
    /// Uses `DASHBOARD_CONFIG` when set, otherwise searches for
    /// `dashboard.toml` in the current and `backend/` directories. Returns
    /// `Ok(None)` when no file exists.
    pub fn from_default_location() -> Result<Option<Self>, RepositoryError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_file(path).map(Some);
        }

        let search_paths = [
            PathBuf::from("dashboard.toml"),
            PathBuf::from("backend/dashboard.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path).map(Some);
            }
        }

        Ok(None)
    }

    /// Get the repository type from configuration.
    pub fn repository_type(&self) -> Result<RepositoryType, String> {
        RepositoryType::from_str(&self.repository.repo_type)
    }

    /// Pool configuration, taking the URL from the environment when the file
    /// leaves it empty.
    pub fn to_postgres_config(&self) -> Result<PostgresConfig, RepositoryError> {
        let database_url = if self.postgres.database_url.trim().is_empty() {
            PostgresConfig::from_env()
                .map_err(RepositoryError::configuration)?
                .database_url
        } else {
            self.postgres.database_url.clone()
        };

        Ok(PostgresConfig {
            database_url,
            max_pool_size: self.postgres.max_connections,
            min_pool_size: self.postgres.min_connections,
            connection_timeout_sec: self.postgres.connect_timeout,
            idle_timeout_sec: self.postgres.idle_timeout,
        })
    }

    pub fn query_settings(&self) -> QuerySettings {
        QuerySettings {
            query_file: self.dashboard.query_file.clone(),
            result_shape: self.dashboard.result_shape,
        }
    }

    pub fn default_timeframe(&self) -> Result<Preset, RepositoryError> {
        self.dashboard.default_timeframe.parse().map_err(|e: String| {
            RepositoryError::configuration_with_context(
                e,
                ErrorContext::new("load_config").with_entity("default_timeframe"),
            )
        })
    }
}
