//! Centralized configuration for the page CLI.
//!
//! All environment variables are loaded and validated at startup to fail fast
//! on misconfiguration rather than halfway through a command.

use std::env;
use std::fmt;
use std::path::PathBuf;

use domain::SiteId;

/// Storage backend provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageProvider {
    /// In-memory storage (data lost when the process exits)
    Memory,
    /// SQLite file-based storage
    Sqlite,
}

impl StorageProvider {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("sqlite") {
            Self::Sqlite
        } else {
            Self::Memory
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Which message catalog renders violation texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageCatalog {
    /// Built-in English texts
    English,
    /// Raw message keys such as `error.uniq_url`
    Keys,
}

impl MessageCatalog {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("none") {
            Self::Keys
        } else {
            Self::English
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// CLI configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Storage provider (default: sqlite)
    pub storage_provider: StorageProvider,
    /// SQLite database path (when using sqlite storage)
    pub db_path: PathBuf,
    /// Log format
    pub log_format: LogFormat,
    /// Site used when a command does not name one (default: 1)
    pub default_site: SiteId,
    /// Message catalog for violation output
    pub message_catalog: MessageCatalog,
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Storage provider
        let storage_provider = StorageProvider::from_str(
            &lookup("STORAGE_PROVIDER").unwrap_or_else(|| "sqlite".into()),
        );

        // DB path (for sqlite)
        let db_path = lookup("DB_PATH")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/pages.db"));

        // Log format
        let log_format =
            LogFormat::from_str(&lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".into()));

        // Default site
        let default_site = match lookup("DEFAULT_SITE") {
            None => SiteId(1),
            Some(raw) => raw.trim().parse().map(SiteId).map_err(|e| ConfigError {
                field: "DEFAULT_SITE",
                message: format!("Invalid site id '{}': {}", raw, e),
            })?,
        };

        // Message catalog
        let message_catalog =
            MessageCatalog::from_str(&lookup("MESSAGE_CATALOG").unwrap_or_else(|| "en".into()));

        Ok(Self {
            storage_provider,
            db_path,
            log_format,
            default_site,
            message_catalog,
        })
    }

    /// Log warnings about configuration that loses data.
    pub fn warn_if_volatile(&self) {
        if self.storage_provider == StorageProvider::Memory {
            tracing::warn!(
                "STORAGE_PROVIDER=memory: pages are kept in memory and discarded when the \
                 command exits."
            );
        }
    }
}
