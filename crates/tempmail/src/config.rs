//! Server settings.
//!
//! Settings come from a JSON file. Every field has a default, so a partial
//! file (or none at all) is valid.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempmail_core::Domain;
use tempmail_core::message::DEFAULT_MAX_PAGE_SIZE;
use thiserror::Error;
use tracing::info;

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for [`Settings`].
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// The file that failed.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// A value is out of range.
    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// Runtime configuration of the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Address the HTTP server listens on.
    pub bind: SocketAddr,
    /// `SQLite` database file. Defaults to the platform data directory.
    pub database_path: Option<PathBuf>,
    /// Domains mail is accepted for.
    pub domains: Vec<Domain>,
    /// Days a received message is kept.
    pub retention_days: u32,
    /// Page size used when a listing does not ask for one.
    pub default_page_size: u32,
    /// Largest page size a listing may ask for.
    pub max_page_size: u32,
    /// Seconds between retention sweeps.
    pub purge_interval_secs: u64,
    /// Key guarding API key management and ingest. Unset disables them.
    pub master_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8787)),
            database_path: None,
            domains: vec![Domain {
                owner: "Centi".to_string(),
                domain: "omailg.com".to_string(),
            }],
            retention_days: tempmail_core::ingest::DEFAULT_RETENTION_DAYS,
            default_page_size: 10,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            purge_interval_secs: 60 * 60,
            master_key: None,
        }
    }
}

impl Settings {
    /// Load settings.
    ///
    /// Reads `path` when given, otherwise `settings.json` in the platform
    /// config directory if it exists, otherwise the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting settings are invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let settings = match path {
            Some(path) => Self::read(path)?,
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    Self::read(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        settings.validate()?;
        Ok(settings)
    }

    fn read(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.domains.iter().all(|d| d.domain.trim().is_empty()) {
            return Err(SettingsError::Invalid(
                "at least one domain is required".to_string(),
            ));
        }
        if self.max_page_size == 0 {
            return Err(SettingsError::Invalid(
                "max_page_size must be at least 1".to_string(),
            ));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(SettingsError::Invalid(format!(
                "default_page_size must be between 1 and {}",
                self.max_page_size
            )));
        }
        if self.retention_days == 0 {
            return Err(SettingsError::Invalid(
                "retention_days must be at least 1".to_string(),
            ));
        }
        if self.purge_interval_secs == 0 {
            return Err(SettingsError::Invalid(
                "purge_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The database file to open.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tempmail")
                .join("tempmail.db")
        })
    }
}

/// `settings.json` under the platform config directory.
#[must_use]
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tempmail")
        .join("settings.json")
}
