//! Runner configuration loaded from environment variables.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `API_CHAIN_SERVER` | store key `server` | Base URL of the API under test |
//! | `API_CHAIN_ENVIRONMENT` | none | Baseline environment file |
//! | `API_CHAIN_EXPORT` | none | Where to write the store after the run |
//! | `API_CHAIN_TIMEOUT_SECS` | `30` | Per-request timeout |
//! | `API_CHAIN_UNRESOLVED` | `fail` | `fail` or `keep` |
//! | `RUST_LOG` | `info` | Log filter |
//!
//! A `.env` file in the working directory is read first, if present.

use api_chain_core::{EnvironmentStore, StoreError, UnresolvedPolicy};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Store key consulted when `API_CHAIN_SERVER` is unset.
pub const SERVER_KEY: &str = "server";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A variable is set to something unusable.
    #[error("Invalid value for {name}: '{value}' ({reason})")]
    InvalidValue {
        /// Variable name
        name: &'static str,
        /// The offending value
        value: String,
        /// What was expected
        reason: &'static str,
    },

    /// Neither `API_CHAIN_SERVER` nor the store key `server` is set.
    #[error("No server configured: set API_CHAIN_SERVER or define 'server' in the environment file")]
    MissingServer,

    /// The environment file could not be loaded or saved.
    #[error(transparent)]
    Environment(#[from] StoreError),
}

/// Settings for one suite run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteConfig {
    /// Explicit server base URL
    pub server: Option<String>,
    /// Baseline environment file
    pub environment: Option<PathBuf>,
    /// Export path for the final store
    pub export: Option<PathBuf>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Unresolved-placeholder policy
    pub unresolved: UnresolvedPolicy,
    /// Log filter directive
    pub log_level: String,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            server: None,
            environment: None,
            export: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            unresolved: UnresolvedPolicy::Fail,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl SuiteConfig {
    /// Load from the process environment, after reading `.env` if present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unparseable settings.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unparseable settings.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let timeout = match non_empty("API_CHAIN_TIMEOUT_SECS") {
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "API_CHAIN_TIMEOUT_SECS",
                        value,
                        reason: "expected a positive number of seconds",
                    });
                }
            },
        };

        let unresolved = match non_empty("API_CHAIN_UNRESOLVED") {
            None => UnresolvedPolicy::Fail,
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "fail" => UnresolvedPolicy::Fail,
                "keep" => UnresolvedPolicy::KeepLiteral,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "API_CHAIN_UNRESOLVED",
                        value,
                        reason: "expected 'fail' or 'keep'",
                    });
                }
            },
        };

        Ok(Self {
            server: non_empty("API_CHAIN_SERVER"),
            environment: non_empty("API_CHAIN_ENVIRONMENT").map(PathBuf::from),
            export: non_empty("API_CHAIN_EXPORT").map(PathBuf::from),
            timeout,
            unresolved,
            log_level: non_empty("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }

    /// Baseline store: the configured file, or an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Environment`] if the file cannot be read.
    pub fn load_environment(&self) -> Result<EnvironmentStore, ConfigError> {
        match &self.environment {
            Some(path) => {
                let store = EnvironmentStore::load(path)?;
                tracing::info!(path = %path.display(), keys = store.len(), "Loaded environment");
                Ok(store)
            }
            None => Ok(EnvironmentStore::new()),
        }
    }

    /// Server base URL, preferring the explicit setting over the store.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingServer`] when neither is set.
    pub fn server_url(&self, store: &EnvironmentStore) -> Result<String, ConfigError> {
        self.server
            .clone()
            .or_else(|| store.get(SERVER_KEY).map(ToString::to_string))
            .ok_or(ConfigError::MissingServer)
    }

    /// Write `store` to the export path, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Environment`] if the file cannot be written.
    pub fn export_environment(&self, store: &EnvironmentStore) -> Result<(), ConfigError> {
        if let Some(path) = &self.export {
            store.save(path)?;
            tracing::info!(path = %path.display(), keys = store.len(), "Exported environment");
        }
        Ok(())
    }
}
