//! Configuration module for treesync.
//!
//! Typed configuration structs mapping to the YAML configuration file, with
//! loading, validation, defaults, and a builder for programmatic use. Every
//! section is optional in the file; missing keys take their default.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for treesync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sftp: SftpConfig,
    pub drive: DriveConfig,
    pub dropbox: DropboxConfig,
    pub filters: FiltersConfig,
    pub logging: LoggingConfig,
    pub manifest: ManifestConfig,
    pub network: NetworkConfig,
}

/// SFTP server connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SftpConfig {
    /// Host name or address. `None` until configured.
    pub host: Option<String>,
    pub port: u16,
    pub username: String,
    /// Private key used for public-key authentication.
    pub key_file: Option<PathBuf>,
}

/// Google Drive settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// OAuth client secrets downloaded from the Google console.
    pub credentials_file: PathBuf,
    /// Authorized-user token file, refreshed in place.
    pub token_file: PathBuf,
    pub api_base_url: String,
    pub upload_base_url: String,
}

/// Dropbox settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DropboxConfig {
    /// Long-lived API access token.
    pub token: Option<String>,
    pub api_base_url: String,
    pub content_base_url: String,
}

/// Exclusion filters applied by every adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FiltersConfig {
    /// Regular expressions matched against the start of each entry name.
    pub excluded_names: Vec<String>,
    /// Extensions (without the dot) that are never synchronized.
    pub excluded_formats: Vec<String>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Console level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Path to the log file. `None` disables file logging.
    pub file: Option<PathBuf>,
    /// Minimum level written to the log file.
    pub file_level: String,
}

/// Where `structure.json` manifests are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestMode {
    /// No manifest at all.
    Off,
    /// Only at the destination root.
    #[default]
    Root,
    /// In every replicated folder.
    PerFolder,
}

impl fmt::Display for ManifestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestMode::Off => write!(f, "off"),
            ManifestMode::Root => write!(f, "root"),
            ManifestMode::PerFolder => write!(f, "per_folder"),
        }
    }
}

impl FromStr for ManifestMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(ManifestMode::Off),
            "root" => Ok(ManifestMode::Root),
            "per_folder" | "per-folder" => Ok(ManifestMode::PerFolder),
            other => Err(ConfigError::InvalidValue {
                key: "manifest.mode".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Manifest settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    pub mode: ManifestMode,
}

/// HTTP behaviour of the cloud adapters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Extra attempts on throttling / server errors. 0 disables retries.
    pub max_retries: u32,
}

// ---------------------------------------------------------------------------
// Backend selection
// ---------------------------------------------------------------------------

/// The closed set of storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Local,
    Sftp,
    Drive,
    Dropbox,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Local,
        BackendKind::Sftp,
        BackendKind::Drive,
        BackendKind::Dropbox,
    ];

    /// Name used on the command line and in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Sftp => "sftp",
            BackendKind::Drive => "gdrive",
            BackendKind::Dropbox => "dropbox",
        }
    }

    fn names() -> String {
        Self::ALL
            .iter()
            .map(|kind| kind.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownBackend {
                name: s.to_string(),
                expected: Self::names(),
            })
    }
}

/// Errors raised while resolving configuration into runtime objects
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown backend '{name}'; valid options: {expected}")]
    UnknownBackend { name: String, expected: String },

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/treesync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("treesync")
            .join("config.yaml")
    }

    /// Write the configuration as YAML, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SftpConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 22,
            username: "root".to_string(),
            key_file: None,
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            credentials_file: PathBuf::from("client_secrets.json"),
            token_file: PathBuf::from("token.json"),
            api_base_url: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base_url: "https://www.googleapis.com/upload/drive/v3".to_string(),
        }
    }
}

impl Default for DropboxConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base_url: "https://api.dropboxapi.com".to_string(),
            content_base_url: "https://content.dropboxapi.com".to_string(),
        }
    }
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            excluded_names: crate::validation::DEFAULT_EXCLUDED_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            excluded_formats: crate::validation::DEFAULT_EXCLUDED_FORMATS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("treesync");
        Self {
            level: "debug".to_string(),
            file: Some(data_dir.join("file_backup.log")),
            file_level: "warn".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sftp.port"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level` and `logging.file_level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if let Err(e) = url::Url::parse(value) {
        errors.push(ValidationError {
            field: field.into(),
            message: format!("invalid URL '{value}': {e}"),
        });
    }
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid. Backend sections are
    /// checked for shape only; a missing SFTP host or Dropbox token is
    /// reported when that backend is selected.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sftp ---
        if self.sftp.port == 0 {
            errors.push(ValidationError {
                field: "sftp.port".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sftp.username.trim().is_empty() {
            errors.push(ValidationError {
                field: "sftp.username".into(),
                message: "must not be empty".into(),
            });
        }

        // --- drive / dropbox ---
        check_url(&mut errors, "drive.api_base_url", &self.drive.api_base_url);
        check_url(&mut errors, "drive.upload_base_url", &self.drive.upload_base_url);
        check_url(&mut errors, "dropbox.api_base_url", &self.dropbox.api_base_url);
        check_url(
            &mut errors,
            "dropbox.content_base_url",
            &self.dropbox.content_base_url,
        );

        // --- filters ---
        for (idx, pattern) in self.filters.excluded_names.iter().enumerate() {
            if let Err(e) = regex::Regex::new(pattern) {
                errors.push(ValidationError {
                    field: format!("filters.excluded_names[{idx}]"),
                    message: format!("invalid pattern '{pattern}': {e}"),
                });
            }
        }
        for (idx, format) in self.filters.excluded_formats.iter().enumerate() {
            if format.trim_start_matches('.').is_empty() {
                errors.push(ValidationError {
                    field: format!("filters.excluded_formats[{idx}]"),
                    message: "must not be empty".into(),
                });
            }
        }

        // --- logging ---
        for (field, level) in [
            ("logging.level", &self.logging.level),
            ("logging.file_level", &self.logging.file_level),
        ] {
            if !VALID_LOG_LEVELS.contains(&level.as_str()) {
                errors.push(ValidationError {
                    field: field.into(),
                    message: format!(
                        "invalid level '{}'; valid options: {}",
                        level,
                        VALID_LOG_LEVELS.join(", ")
                    ),
                });
            }
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use treesync_core::config::{ConfigBuilder, ManifestMode};
///
/// let config = ConfigBuilder::new()
///     .sftp_host("backup.example.com")
///     .manifest_mode(ManifestMode::PerFolder)
///     .logging_level("info")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sftp ---

    pub fn sftp_host(mut self, host: impl Into<String>) -> Self {
        self.config.sftp.host = Some(host.into());
        self
    }

    pub fn sftp_port(mut self, port: u16) -> Self {
        self.config.sftp.port = port;
        self
    }

    pub fn sftp_username(mut self, username: impl Into<String>) -> Self {
        self.config.sftp.username = username.into();
        self
    }

    pub fn sftp_key_file(mut self, key_file: PathBuf) -> Self {
        self.config.sftp.key_file = Some(key_file);
        self
    }

    // --- drive ---

    pub fn drive_token_file(mut self, token_file: PathBuf) -> Self {
        self.config.drive.token_file = token_file;
        self
    }

    pub fn drive_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.drive.api_base_url = url.into();
        self
    }

    pub fn drive_upload_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.drive.upload_base_url = url.into();
        self
    }

    // --- dropbox ---

    pub fn dropbox_token(mut self, token: impl Into<String>) -> Self {
        self.config.dropbox.token = Some(token.into());
        self
    }

    pub fn dropbox_base_urls(mut self, api: impl Into<String>, content: impl Into<String>) -> Self {
        self.config.dropbox.api_base_url = api.into();
        self.config.dropbox.content_base_url = content.into();
        self
    }

    // --- filters ---

    pub fn excluded_names(mut self, names: Vec<String>) -> Self {
        self.config.filters.excluded_names = names;
        self
    }

    pub fn excluded_formats(mut self, formats: Vec<String>) -> Self {
        self.config.filters.excluded_formats = formats;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_file(mut self, file: Option<PathBuf>) -> Self {
        self.config.logging.file = file;
        self
    }

    pub fn logging_file_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.file_level = level.into();
        self
    }

    // --- manifest / network ---

    pub fn manifest_mode(mut self, mode: ManifestMode) -> Self {
        self.config.manifest.mode = mode;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.network.max_retries = retries;
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
