//! Database configuration for runtime backend selection.
//!
//! A [`DatabaseConfig`] is resolved from the `.tasty.json` config file, the
//! environment, or a connection URL, and then connected into a boxed
//! [`TastyDb`].

use std::path::PathBuf;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::backend::TastyDb;
use super::elastic::ElasticDb;
use super::mysql::MySqlDb;
use super::postgres::PostgresDb;
use super::sqlite::SqliteDb;
use crate::error::{Result, TastyError};
use crate::generators::BackendKind;

/// Connection options for a networked SQL server.
///
/// Either `connection_string` is given and used verbatim, or the URL is
/// assembled from the individual fields. A `port` of 0 selects the
/// engine's default port.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub connection_string: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub ssl: bool,
}

impl ServerConfig {
    pub fn from_connection_string(url: impl Into<String>) -> Self {
        Self {
            connection_string: Some(url.into()),
            ..Self::default()
        }
    }

    /// Build the connection URL for `scheme` (`postgres` or `mysql`).
    pub fn build_connection_string(&self, scheme: &str, default_port: u16) -> Result<String> {
        if let Some(url) = &self.connection_string {
            return Ok(url.clone());
        }

        let host = self
            .host
            .as_deref()
            .ok_or_else(|| TastyError::config("host is required when no connection_string is given"))?;
        let database = self
            .database
            .as_deref()
            .ok_or_else(|| TastyError::config("database is required when no connection_string is given"))?;
        let port = if self.port == 0 { default_port } else { self.port };

        let invalid = || TastyError::config(format!("Invalid {} host '{}'", scheme, host));
        let mut url = Url::parse(&format!("{}://{}:{}/", scheme, host, port)).map_err(|_| invalid())?;
        if let Some(user) = &self.user {
            url.set_username(user).map_err(|_| invalid())?;
            url.set_password(self.password.as_deref()).map_err(|_| invalid())?;
        }
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push(database);
        if self.ssl {
            let (key, value) = if scheme == "mysql" { ("ssl-mode", "REQUIRED") } else { ("sslmode", "require") };
            url.query_pairs_mut().append_pair(key, value);
        }
        Ok(url.into())
    }
}

pub const POSTGRES_DEFAULT_PORT: u16 = 5432;
pub const MYSQL_DEFAULT_PORT: u16 = 3306;

/// Configuration for database backend selection.
///
/// Enables runtime selection of the backend via CLI arguments,
/// environment variables, or configuration files.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseConfig {
    Postgres(ServerConfig),
    MySql(ServerConfig),
    /// SQLite file, created if missing.
    Sqlite { path: PathBuf },
    /// In-memory SQLite (for testing).
    Memory,
    /// Elasticsearch cluster base URL.
    Elastic { url: String },
}

impl DatabaseConfig {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Postgres(_) => BackendKind::Postgres,
            Self::MySql(_) => BackendKind::MySql,
            Self::Sqlite { .. } | Self::Memory => BackendKind::Sqlite,
            Self::Elastic { .. } => BackendKind::Elastic,
        }
    }

    /// Create a backend instance from this configuration.
    pub async fn connect(&self) -> Result<Box<dyn TastyDb>> {
        let backend: Box<dyn TastyDb> = match self {
            Self::Postgres(server) => {
                let url = server.build_connection_string("postgres", POSTGRES_DEFAULT_PORT)?;
                Box::new(PostgresDb::connect(&url).await?)
            }
            Self::MySql(server) => {
                let url = server.build_connection_string("mysql", MYSQL_DEFAULT_PORT)?;
                Box::new(MySqlDb::connect(&url).await?)
            }
            Self::Sqlite { path } => Box::new(SqliteDb::open(path).await?),
            Self::Memory => Box::new(SqliteDb::memory().await?),
            Self::Elastic { url } => Box::new(ElasticDb::new(url)?),
        };
        info!(backend = backend.backend_name(), "connected");
        Ok(backend)
    }

    /// Parse from a connection URL or file path.
    ///
    /// Supported formats:
    /// - `postgres://...` or `postgresql://...` → Postgres
    /// - `mysql://...` → MySql
    /// - `sqlite://path/to/db` → Sqlite
    /// - `:memory:` → Memory
    /// - `http://host:port` or `https://...` → Elastic
    /// - anything else is treated as a SQLite file path
    pub fn from_url(url: &str) -> Result<Self> {
        if url == ":memory:" {
            return Ok(Self::Memory);
        }

        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return Ok(Self::Postgres(ServerConfig::from_connection_string(url)));
        }

        if url.starts_with("mysql://") {
            return Ok(Self::MySql(ServerConfig::from_connection_string(url)));
        }

        if let Some(path) = url.strip_prefix("sqlite://") {
            if path.is_empty() {
                return Err(TastyError::config("sqlite:// URL is missing a path"));
            }
            return Ok(Self::Sqlite {
                path: PathBuf::from(path),
            });
        }

        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(Self::Elastic {
                url: url.trim_end_matches('/').to_string(),
            });
        }

        if url.contains("://") {
            return Err(TastyError::config(format!("Unsupported database URL: {}", url)));
        }

        Ok(Self::Sqlite {
            path: PathBuf::from(url),
        })
    }

    /// Load from environment variables.
    ///
    /// Checks `TASTY_DATABASE_URL`, then `DATABASE_URL`.
    pub fn from_env() -> Result<Option<Self>> {
        for var in ["TASTY_DATABASE_URL", "DATABASE_URL"] {
            if let Ok(url) = std::env::var(var) {
                return Ok(Some(Self::from_url(&url)?));
            }
        }
        Ok(None)
    }

    /// Resolve configuration from config file and environment.
    ///
    /// Priority: Config file > Environment > Default (./tasty.sqlite)
    pub fn resolve() -> Result<Self> {
        if let Ok(config_file) = crate::config::ConfigFile::load() {
            return Ok(config_file.database.to_database_config());
        }

        if let Some(config) = Self::from_env()? {
            return Ok(config);
        }

        Self::from_url("./tasty.sqlite")
    }
}
