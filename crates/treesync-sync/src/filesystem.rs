//! Local filesystem adapter (secondary/driven adapter)
//!
//! Implements [`StorageAdapter`] using `tokio::fs` for async file operations.
//!
//! ## Design Decisions
//!
//! - **Atomic writes**: content goes to `<target>.treesync.tmp` first and is renamed
//!   over the target, so an interrupted copy never leaves a truncated file.
//! - **Timestamps**: the source modification time is applied to written
//!   files, and to folders the adapter creates.
//! - **Identity**: on Unix the inode number is reported as the record id.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use filetime::FileTime;
use tracing::{debug, info, instrument, warn};

use treesync_core::domain::record::join_path;
use treesync_core::manifest::STRUCTURE_FILE_NAME;
use treesync_core::{Entry, File, Folder, Metadata, StorageAdapter, StorageError, Validator};

// ============================================================================
// LocalAdapter
// ============================================================================

/// Adapter that bridges the [`StorageAdapter`] port to the local disk.
#[derive(Debug, Clone, Default)]
pub struct LocalAdapter {
    validator: Validator,
}

impl LocalAdapter {
    #[must_use]
    pub fn new(validator: Validator) -> Self {
        Self { validator }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn to_metadata(meta: &std::fs::Metadata) -> Metadata {
    Metadata {
        size: meta.len(),
        modified: meta.modified().ok().map(DateTime::<Utc>::from),
        id: inode_of(meta),
    }
}

#[cfg(unix)]
fn inode_of(meta: &std::fs::Metadata) -> Option<String> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.ino().to_string())
}

#[cfg(not(unix))]
fn inode_of(_meta: &std::fs::Metadata) -> Option<String> {
    None
}

fn to_file_time(modified: DateTime<Utc>) -> FileTime {
    FileTime::from_unix_time(modified.timestamp(), modified.timestamp_subsec_nanos())
}

/// `stat` with the not-found case separated from other I/O failures
async fn stat(path: &str) -> Result<std::fs::Metadata, StorageError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(meta),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path, "path not found");
            Err(StorageError::NotFound(path.to_string()))
        }
        Err(e) => Err(StorageError::access(path, e)),
    }
}

/// Suffix of the staging file written next to a target
const STAGING_SUFFIX: &str = ".treesync.tmp";

fn tmp_path_for(target: &Path) -> PathBuf {
    let mut p = target.as_os_str().to_owned();
    p.push(STAGING_SUFFIX);
    PathBuf::from(p)
}

/// Write-to-temp then rename
async fn write_atomic(target: &str, data: &[u8]) -> Result<(), StorageError> {
    let target_path = Path::new(target);
    let tmp_path = tmp_path_for(target_path);

    debug!(?tmp_path, "writing to temporary file");
    if let Err(e) = tokio::fs::write(&tmp_path, data).await {
        return Err(StorageError::access(target, e));
    }
    if let Err(e) = tokio::fs::rename(&tmp_path, target_path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(StorageError::access(target, e));
    }
    Ok(())
}

// ============================================================================
// StorageAdapter implementation
// ============================================================================

#[async_trait]
impl StorageAdapter for LocalAdapter {
    fn name(&self) -> &'static str {
        "local"
    }

    fn validator(&self) -> &Validator {
        &self.validator
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn stat_file(&self, path: &str) -> Result<Metadata, StorageError> {
        let meta = stat(path).await?;
        if !meta.is_file() {
            warn!("not a file");
            return Err(StorageError::not_a_file(path));
        }
        Ok(to_metadata(&meta))
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn stat_folder(&self, path: &str) -> Result<Metadata, StorageError> {
        let meta = stat(path).await?;
        if !meta.is_dir() {
            warn!("not a folder");
            return Err(StorageError::not_a_folder(path));
        }
        Ok(to_metadata(&meta))
    }

    #[instrument(skip(self, file), fields(path = %file.path()))]
    async fn read_file(&self, file: &File) -> Result<Vec<u8>, StorageError> {
        match tokio::fs::read(file.path()).await {
            Ok(data) => {
                debug!(bytes = data.len(), "file read complete");
                Ok(data)
            }
            Err(e) => {
                warn!(error = %e, "unable to read file");
                Err(StorageError::access(file.path(), e))
            }
        }
    }

    #[instrument(
        skip(self, source, destination),
        fields(source = %source.path(), destination = %destination.path())
    )]
    async fn write_file(&self, source: &File, destination: &Folder) -> Result<Entry, StorageError> {
        let target = join_path(destination.path(), source.name());
        let data = source.read().await?;

        write_atomic(&target, &data).await?;

        if let Some(modified) = source.modified() {
            if let Err(e) = filetime::set_file_mtime(&target, to_file_time(modified)) {
                return Err(StorageError::access(&target, e));
            }
        }

        let meta = stat(&target).await.map_err(|e| match e {
            StorageError::NotFound(path) => StorageError::access(path, "vanished after write"),
            other => other,
        })?;

        info!(bytes = data.len(), "file written");
        Ok(Entry::file(
            target,
            Metadata {
                size: data.len() as u64,
                modified: source.modified().or_else(|| to_metadata(&meta).modified),
                id: inode_of(&meta),
            },
        ))
    }

    #[instrument(skip(self, folder), fields(path = %folder.path()))]
    async fn list_children(&self, folder: &Folder) -> Result<Vec<Entry>, StorageError> {
        let mut dir = match tokio::fs::read_dir(folder.path()).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(folder.path().to_string()))
            }
            Err(e) => return Err(StorageError::access(folder.path(), e)),
        };

        let mut entries = Vec::new();
        loop {
            let item = match dir.next_entry().await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(e) => return Err(StorageError::access(folder.path(), e)),
            };

            let name = item.file_name().to_string_lossy().into_owned();
            let path = join_path(folder.path(), &name);
            if !self.validate(&path) {
                debug!(path = %path, "not validated, skipping");
                continue;
            }

            // follows symlinks, like the stat calls above
            let meta = match tokio::fs::metadata(&path).await {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(path = %path, error = %e, "unable to stat entry, skipping");
                    continue;
                }
            };

            let entry = if meta.is_dir() {
                Entry::folder(path, to_metadata(&meta))
            } else {
                Entry::file(path, to_metadata(&meta))
            };
            entries.push(entry);
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(count = entries.len(), "folder listed");
        Ok(entries)
    }

    #[instrument(skip(self, source), fields(destination = %destination_path))]
    async fn materialize_folder(
        &self,
        source: &Folder,
        destination_path: &str,
    ) -> Result<Entry, StorageError> {
        let existed = tokio::fs::try_exists(destination_path).await.unwrap_or(false);

        if existed {
            debug!("folder already exists");
        } else {
            info!("creating folder");
            if let Err(e) = tokio::fs::create_dir_all(destination_path).await {
                warn!(error = %e, "unable to create folder");
                return Err(StorageError::access(destination_path, e));
            }
            if let Some(modified) = source.modified() {
                if let Err(e) = filetime::set_file_mtime(destination_path, to_file_time(modified)) {
                    debug!(error = %e, "unable to set folder mtime");
                }
            }
        }

        let meta = stat(destination_path).await?;
        if !meta.is_dir() {
            return Err(StorageError::access(
                destination_path,
                "a file occupies the folder path",
            ));
        }
        Ok(Entry::folder(destination_path, to_metadata(&meta)))
    }

    #[instrument(skip(self, folder, document), fields(path = %folder.path()))]
    async fn upload_structure_dump(
        &self,
        folder: &Folder,
        document: &[u8],
    ) -> Result<Entry, StorageError> {
        let target = join_path(folder.path(), STRUCTURE_FILE_NAME);
        info!("updating file structure");
        write_atomic(&target, document).await?;

        let meta = stat(&target).await?;
        Ok(Entry::file(target, to_metadata(&meta)))
    }
}

// ============================================================================
// Unit tests
// ============================================================================
