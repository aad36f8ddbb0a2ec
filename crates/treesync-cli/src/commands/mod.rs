pub mod completions;
pub mod config;
pub mod sync;
pub mod tree;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use treesync_core::config::Config;

/// Where the configuration comes from
///
/// An explicit `--config` file must exist and parse; the default location
/// silently falls back to built-in defaults.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    path: PathBuf,
    explicit: bool,
}

impl ConfigSource {
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            Some(path) => Self {
                path: PathBuf::from(path),
                explicit: true,
            },
            None => Self {
                path: Config::default_path(),
                explicit: false,
            },
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Config> {
        if self.explicit {
            Config::load(&self.path)
                .with_context(|| format!("Failed to load configuration from {}", self.path.display()))
        } else {
            Ok(Config::load_or_default(&self.path))
        }
    }
}

/// Trailing separators removed, except for a bare root
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
