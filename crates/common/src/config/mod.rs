//! Configuration management for ForumPulse
//!
//! Supports loading configuration from:
//! - Default values
//! - Configuration files (config/default, config/{FORUMPULSE_ENV}, config/local)
//! - An explicit file passed on the command line
//! - Environment variables (prefixed with FORUMPULSE__)
//!
//! Command-line flags are applied on top by the binary.

use crate::errors::{AppError, Result};
use crate::{DEFAULT_FETCH_LIMIT, MAX_FETCH_LIMIT};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Largest ranked list the report will render
pub const MAX_TOP_N: usize = 100;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Run options (limit, output, format)
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Local store configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Forum API configuration
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Output format of the report artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Html,
    Json,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Html => f.write_str("html"),
            ReportFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(ReportFormat::Html),
            "json" => Ok(ReportFormat::Json),
            other => Err(AppError::Configuration {
                message: format!("unknown report format '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Posts fetched per community
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Report artifact path
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Report artifact format
    #[serde(default)]
    pub format: ReportFormat,

    /// Ranked posts per list in the report
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Sentiment scorer name
    #[serde(default = "default_scorer")]
    pub scorer: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite file path (":memory:" for a throwaway store)
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Log every SQL statement
    #[serde(default)]
    pub sqlx_logging: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    /// Forum API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,

    /// Write a Prometheus text exposition of run metrics here
    #[serde(default)]
    pub metrics_file: Option<PathBuf>,
}

// Default value functions
fn default_limit() -> u32 { DEFAULT_FETCH_LIMIT }
fn default_output() -> PathBuf { PathBuf::from("report.html") }
fn default_top_n() -> usize { 10 }
fn default_scorer() -> String { "lexicon".to_string() }
fn default_db_path() -> PathBuf { PathBuf::from("forumpulse.db") }
fn default_max_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 10 }
fn default_base_url() -> String { "https://www.reddit.com".to_string() }
fn default_user_agent() -> String { format!("forumpulse/{}", crate::VERSION) }
fn default_fetch_timeout() -> u64 { 10 }
fn default_log_level() -> String { "info".to_string() }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            output: default_output(),
            format: ReportFormat::default(),
            top_n: default_top_n(),
            scorer: default_scorer(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
            sqlx_logging: false,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_fetch_timeout(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
            metrics_file: None,
        }
    }
}

/// Escape the characters sqlx treats specially in a SQLite URL path: it
/// splits at the first `?` and percent-decodes the rest.
fn encode_path(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '%' => encoded.push_str("%25"),
            '?' => encoded.push_str("%3F"),
            '#' => encoded.push_str("%23"),
            _ => encoded.push(c),
        }
    }
    encoded
}

impl DatabaseConfig {
    /// Throwaway in-memory store
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            ..Self::default()
        }
    }

    /// Connection URL for the configured path
    pub fn url(&self) -> String {
        if self.is_in_memory() {
            "sqlite::memory:".to_string()
        } else {
            format!(
                "sqlite://{}?mode=rwc",
                encode_path(&self.path.to_string_lossy())
            )
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == ":memory:"
    }
}

impl AppConfig {
    /// Load configuration from files and environment.
    ///
    /// `file` is an optional explicit configuration file; it is required to
    /// exist when given.
    pub fn load(file: Option<&Path>) -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("FORUMPULSE_ENV").unwrap_or_else(|_| "development".to_string());

        let mut builder = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            // e.g., FORUMPULSE__FETCH__TIMEOUT_SECS=5
            .add_source(
                Environment::with_prefix("FORUMPULSE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_FETCH_LIMIT).contains(&self.pipeline.limit) {
            return Err(AppError::Configuration {
                message: format!(
                    "limit must be between 1 and {}, got {}",
                    MAX_FETCH_LIMIT, self.pipeline.limit
                ),
            });
        }

        if !(1..=MAX_TOP_N).contains(&self.pipeline.top_n) {
            return Err(AppError::Configuration {
                message: format!(
                    "top_n must be between 1 and {}, got {}",
                    MAX_TOP_N, self.pipeline.top_n
                ),
            });
        }

        if self.fetch.timeout_secs == 0 {
            return Err(AppError::Configuration {
                message: "fetch.timeout_secs must be positive".to_string(),
            });
        }

        if self.fetch.base_url.trim().is_empty() {
            return Err(AppError::Configuration {
                message: "fetch.base_url must not be empty".to_string(),
            });
        }

        if self.fetch.user_agent.trim().is_empty() {
            return Err(AppError::Configuration {
                message: "fetch.user_agent must not be empty".to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(AppError::Configuration {
                message: "database.max_connections must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Get fetch timeout as Duration
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.pipeline.limit, 25);
        assert_eq!(config.pipeline.output, PathBuf::from("report.html"));
        assert_eq!(config.pipeline.format, ReportFormat::Html);
        assert_eq!(config.database.path, PathBuf::from("forumpulse.db"));
        assert_eq!(config.fetch.timeout_secs, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_url() {
        let config = DatabaseConfig::default();
        assert_eq!(config.url(), "sqlite://forumpulse.db?mode=rwc");
        assert_eq!(DatabaseConfig::in_memory().url(), "sqlite::memory:");

        let config = DatabaseConfig {
            path: PathBuf::from("data/what?%41#1.db"),
            ..DatabaseConfig::default()
        };
        assert_eq!(config.url(), "sqlite://data/what%3F%2541%231.db?mode=rwc");
    }

    #[test]
    fn test_limit_bounds() {
        let mut config = AppConfig::default();
        config.pipeline.limit = 0;
        assert!(config.validate().is_err());
        config.pipeline.limit = 101;
        assert!(config.validate().is_err());
        config.pipeline.limit = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_report_format_parsing() {
        assert_eq!("HTML".parse::<ReportFormat>().unwrap(), ReportFormat::Html);
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert!("pdf".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn test_load_from_file_fills_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[pipeline]\nlimit = 50\nformat = \"json\"\n\n[fetch]\ntimeout_secs = 3").unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.pipeline.limit, 50);
        assert_eq!(config.pipeline.format, ReportFormat::Json);
        assert_eq!(config.pipeline.top_n, 10);
        assert_eq!(config.fetch.timeout_secs, 3);
        assert_eq!(config.database.max_connections, 1);
    }
}
