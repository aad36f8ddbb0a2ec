//! Config command - View and manage treesync configuration
//!
//! Provides the `treesync config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use treesync_core::config::{Config, ManifestMode};

use super::ConfigSource;
use crate::output::{get_formatter, plural, OutputFormat};

/// Keys accepted by `config set`, with a short description
const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("sftp.host", "SFTP server host name"),
    ("sftp.port", "SFTP server port"),
    ("sftp.username", "SFTP login"),
    ("sftp.key_file", "Private key used to authenticate"),
    ("drive.credentials_file", "Google OAuth client secrets"),
    ("drive.token_file", "Google authorized-user token"),
    ("drive.api_base_url", "Drive API endpoint"),
    ("drive.upload_base_url", "Drive upload endpoint"),
    ("dropbox.token", "Dropbox access token"),
    ("dropbox.api_base_url", "Dropbox RPC endpoint"),
    ("dropbox.content_base_url", "Dropbox content endpoint"),
    ("filters.excluded_names", "Comma-separated name patterns"),
    ("filters.excluded_formats", "Comma-separated extensions"),
    ("logging.level", "trace|debug|info|warn|error"),
    ("logging.file", "Log file path (none to disable)"),
    ("logging.file_level", "trace|debug|info|warn|error"),
    ("manifest.mode", "off|root|per_folder"),
    ("network.max_retries", "Retries for throttled HTTP requests"),
];

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "sftp.host")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, source: &ConfigSource, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(source, format).await,
            ConfigCommand::Set { key, value } => {
                self.execute_set(source, key, value, format).await
            }
            ConfigCommand::Validate => self.execute_validate(source, format).await,
        }
    }

    async fn execute_show(&self, source: &ConfigSource, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let config = source.load()?;

        info!(config_path = %source.path().display(), "Showing configuration");

        if format.is_json() {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", source.path().display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }

        Ok(())
    }

    async fn execute_set(
        &self,
        source: &ConfigSource,
        key: &str,
        value: &str,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = get_formatter(format);
        let config_path = source.path();
        let mut config = Config::load_or_default(config_path);

        info!(key = %key, value = %value, "Setting configuration value");

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{}': {}", key, e));
                formatter.info("");
                formatter.info("Supported keys:");
                for (name, description) in SUPPORTED_KEYS {
                    formatter.info(&format!("  {name:<28} - {description}"));
                }
            }
            return Ok(());
        }

        let errors = config.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "errors": messages,
                }));
            } else {
                formatter.error(&format!(
                    "Invalid value for '{}': {}",
                    key,
                    messages.join("; ")
                ));
            }
            return Ok(());
        }

        config
            .save(config_path)
            .context("Failed to write configuration file")?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "value": value,
                "config_path": config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {} = {}", key, value));
            formatter.info(&format!("Saved to {}", config_path.display()));
        }

        Ok(())
    }

    async fn execute_validate(&self, source: &ConfigSource, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let config_path = source.path();

        let config = match Config::load(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                let message = if config_path.exists() {
                    format!("Failed to parse configuration: {}", e)
                } else {
                    "Configuration file not found. Using defaults.".to_string()
                };
                if format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": [message],
                    }));
                } else {
                    formatter.error(&message);
                    formatter.info(&format!("File: {}", config_path.display()));
                }
                return Ok(());
            }
        };

        info!(config_path = %config_path.display(), "Validating configuration");
        let errors = config.validate();

        if format.is_json() {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", config_path.display()));
        } else {
            let count = errors.len() as u64;
            formatter.error(&format!(
                "Configuration has {} error{}:",
                count,
                plural(count)
            ));
            formatter.info(&format!("File: {}", config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }

        Ok(())
    }
}

/// `none` or an empty value clears an optional setting
fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

fn list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- sftp ---
        "sftp.host" => config.sftp.host = optional(value),
        "sftp.port" => {
            config.sftp.port = value
                .parse::<u16>()
                .context("Expected a port number for sftp.port")?;
        }
        "sftp.username" => config.sftp.username = value.to_string(),
        "sftp.key_file" => config.sftp.key_file = optional(value).map(PathBuf::from),

        // --- drive ---
        "drive.credentials_file" => config.drive.credentials_file = PathBuf::from(value),
        "drive.token_file" => config.drive.token_file = PathBuf::from(value),
        "drive.api_base_url" => config.drive.api_base_url = value.to_string(),
        "drive.upload_base_url" => config.drive.upload_base_url = value.to_string(),

        // --- dropbox ---
        "dropbox.token" => config.dropbox.token = optional(value),
        "dropbox.api_base_url" => config.dropbox.api_base_url = value.to_string(),
        "dropbox.content_base_url" => config.dropbox.content_base_url = value.to_string(),

        // --- filters ---
        "filters.excluded_names" => config.filters.excluded_names = list(value),
        "filters.excluded_formats" => config.filters.excluded_formats = list(value),

        // --- logging ---
        "logging.level" => config.logging.level = value.to_string(),
        "logging.file" => config.logging.file = optional(value).map(PathBuf::from),
        "logging.file_level" => config.logging.file_level = value.to_string(),

        // --- manifest / network ---
        "manifest.mode" => config.manifest.mode = value.parse::<ManifestMode>()?,
        "network.max_retries" => {
            config.network.max_retries = value
                .parse::<u32>()
                .context("Expected a positive integer for network.max_retries")?;
        }

        _ => {
            anyhow::bail!("Unknown configuration key: '{}'", key);
        }
    }

    Ok(())
}
