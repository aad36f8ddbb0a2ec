//! Backend selection
//!
//! Maps a [`BackendKind`] onto a connected adapter. Each adapter receives
//! its own [`Validator`] and keeps a single session for the whole run.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use treesync_cloud::{DriveAdapter, DropboxAdapter};
use treesync_core::config::{BackendKind, Config};
use treesync_core::{AdapterHandle, StorageAdapter, StorageError, Validator};
use treesync_sftp::SftpAdapter;
use treesync_sync::LocalAdapter;

/// Filter chain for a run: the configured filters, or none at all
pub fn validator(config: &Config, enabled: bool) -> Result<Validator> {
    if !enabled {
        return Ok(Validator::new());
    }
    Validator::from_filters(&config.filters).context("Invalid exclusion pattern in filters")
}

/// Opens the adapter for `kind`
pub async fn connect(
    kind: BackendKind,
    config: &Config,
    validator: Validator,
) -> Result<AdapterHandle, StorageError> {
    let retries = config.network.max_retries;
    let adapter: AdapterHandle = match kind {
        BackendKind::Local => Arc::new(LocalAdapter::new(validator)),
        BackendKind::Sftp => Arc::new(SftpAdapter::connect(&config.sftp, validator).await?),
        BackendKind::Drive => {
            Arc::new(DriveAdapter::connect(&config.drive, retries, validator).await?)
        }
        BackendKind::Dropbox => {
            Arc::new(DropboxAdapter::connect(&config.dropbox, retries, validator).await?)
        }
    };
    info!(backend = adapter.name(), "Adapter ready");
    Ok(adapter)
}
