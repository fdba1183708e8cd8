//! # Application State and Configuration
//!
//! [`AppState`] is handed to every handler through the `State` extractor.
//! It holds the workflow engine (and through it the store) plus the
//! process configuration read from the environment.

use std::sync::Arc;

use dotrack_workflow::{MemoryStore, WorkflowEngine};
use thiserror::Error;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Invalid configuration value.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Process configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared secret carried in bearer tokens. `None` disables the check.
    pub auth_token: Option<String>,
    /// PostgreSQL URL. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// Upper bound on pooled database connections.
    pub database_max_connections: u32,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("database_max_connections", &self.database_max_connections)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            database_url: None,
            database_max_connections: 10,
            log_format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Read `PORT`, `AUTH_TOKEN`, `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`
    /// and `LOG_FORMAT` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    /// Unset and blank variables take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(value) => {
                let parsed = value.trim().parse::<u16>();
                parsed.map_err(|_| ConfigError::Invalid {
                    var: "PORT",
                    expected: "a TCP port number",
                    value,
                })?
            }
            None => defaults.port,
        };

        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(value) => match value.trim().parse::<u32>().ok() {
                Some(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "DATABASE_MAX_CONNECTIONS",
                        expected: "a positive integer",
                        value,
                    })
                }
            },
            None => defaults.database_max_connections,
        };

        let log_format = match get("LOG_FORMAT") {
            Some(value) => {
                let normalized = value.trim().to_ascii_lowercase();
                match normalized.as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::Invalid {
                            var: "LOG_FORMAT",
                            expected: "\"json\" or \"pretty\"",
                            value,
                        })
                    }
                }
            }
            None => defaults.log_format,
        };

        Ok(Self {
            port,
            auth_token: get("AUTH_TOKEN"),
            database_url: get("DATABASE_URL"),
            database_max_connections,
            log_format,
        })
    }
}

/// Shared application state. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: WorkflowEngine,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// In-memory store, default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// In-memory store with `config`.
    pub fn with_config(config: AppConfig) -> Self {
        Self::with_engine(config, WorkflowEngine::new(Arc::new(MemoryStore::new())))
    }

    /// Use an already-built engine, e.g. one over PostgreSQL.
    pub fn with_engine(config: AppConfig, engine: WorkflowEngine) -> Self {
        Self {
            engine,
            config: Arc::new(config),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
