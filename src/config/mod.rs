//! Configuration management.
//!
//! A [`Config`] is assembled once at start-up from defaults, an optional
//! TOML file, `SCHOLAR_DIGEST_*` environment variables and finally the
//! command line, then handed to the pipeline read-only.
//!
//! # Configuration File Format
//!
//! ```toml
//! [gmail]
//! label = "[-oss-]-_ml-in-se"
//! user = "me"
//! token_file = "~/.config/scholar-digest/token.json"
//! timeout_secs = 30
//!
//! [report]
//! format = "html"
//! mark_read = false
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Label polled when nothing else is configured ("[ OSS ]/_ML-in-SE" in the Gmail web UI)
pub const DEFAULT_LABEL: &str = "[-oss-]-_ml-in-se";

/// Gmail REST endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

/// Prefix of environment variables read by [`load_config`]
pub const ENV_PREFIX: &str = "SCHOLAR_DIGEST";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Mailbox settings
    #[serde(default)]
    pub gmail: GmailConfig,

    /// Report settings
    #[serde(default)]
    pub report: ReportConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gmail connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GmailConfig {
    /// Label whose unread messages are aggregated
    #[serde(default = "default_label")]
    pub label: String,

    /// Gmail user id; "me" is the authenticated account
    #[serde(default = "default_user")]
    pub user: String,

    /// Base URL of the Gmail v1 API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// OAuth2 access token
    #[serde(default)]
    pub access_token: Option<String>,

    /// JSON file holding an `access_token` field
    #[serde(default)]
    pub token_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            user: default_user(),
            api_base_url: default_api_base_url(),
            access_token: None,
            token_file: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_label() -> String {
    DEFAULT_LABEL.to_string()
}

fn default_user() -> String {
    "me".to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Report output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown text
    #[default]
    Markdown,
    /// Standalone HTML document
    Html,
}

/// Report settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format of the digest
    #[serde(default)]
    pub format: OutputFormat,

    /// Clear the unread marker of aggregated messages after reporting
    #[serde(default)]
    pub mark_read: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "json" for structured logs, plain text otherwise
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration from an optional file plus environment overrides
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }
    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

/// Find a configuration file in the default locations
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("scholar-digest.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("scholar-digest").join("config.toml"))
        .filter(|path| path.is_file())
}
