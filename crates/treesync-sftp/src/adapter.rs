//! SFTP storage adapter
//!
//! Maps the [`StorageAdapter`] contract onto an [`SftpTransport`]. SFTP has
//! no stable identity for remote entries, so records never carry an id.
//! Folder chains are created one segment at a time, reusing whatever
//! already exists.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use treesync_core::config::SftpConfig;
use treesync_core::domain::record::join_path;
use treesync_core::manifest::STRUCTURE_FILE_NAME;
use treesync_core::{Entry, File, Folder, Metadata, StorageAdapter, StorageError, Validator};

use crate::session::RusshTransport;
use crate::transport::{RemoteStat, SftpTransport, TransportError};

const BACKEND: &str = "sftp";

/// [`StorageAdapter`] for a remote SFTP server
pub struct SftpAdapter<T = RusshTransport> {
    transport: T,
    validator: Validator,
}

impl SftpAdapter<RusshTransport> {
    /// Opens the session described by `config`
    pub async fn connect(config: &SftpConfig, validator: Validator) -> Result<Self, StorageError> {
        let host = config
            .host
            .as_deref()
            .ok_or_else(|| StorageError::no_connection(BACKEND, "no host configured"))?;
        let key_file: PathBuf = config
            .key_file
            .clone()
            .ok_or_else(|| StorageError::no_connection(BACKEND, "no key file configured"))?;

        let transport = RusshTransport::connect(host, config.port, &config.username, &key_file)
            .await
            .map_err(|e| StorageError::no_connection(BACKEND, e))?;
        Ok(Self::new(transport, validator))
    }
}

impl<T: SftpTransport> SftpAdapter<T> {
    pub fn new(transport: T, validator: Validator) -> Self {
        Self {
            transport,
            validator,
        }
    }

    async fn stat(&self, path: &str) -> Result<RemoteStat, StorageError> {
        self.transport
            .stat(path)
            .await
            .map_err(|e| lookup_error(path, e))
    }

    /// Creates every missing segment of `path`
    async fn make_dirs(&self, path: &str) -> Result<bool, StorageError> {
        let absolute = path.starts_with('/');
        let mut current = String::new();
        let mut created = false;

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if current.is_empty() && absolute {
                current.push('/');
            }
            current = join_path(&current, segment);

            match self.transport.stat(&current).await {
                Ok(stat) if stat.is_dir => continue,
                Ok(_) => {
                    return Err(StorageError::access(
                        &current,
                        "a file occupies the folder path",
                    ))
                }
                Err(TransportError::NotFound(_)) => {
                    debug!(path = %current, "creating folder segment");
                    self.transport
                        .mkdir(&current)
                        .await
                        .map_err(|e| StorageError::access(&current, e))?;
                    created = true;
                }
                Err(e) => return Err(StorageError::access(&current, e)),
            }
        }
        Ok(created)
    }
}

fn lookup_error(path: &str, err: TransportError) -> StorageError {
    match err {
        TransportError::NotFound(_) => StorageError::NotFound(path.to_string()),
        other => StorageError::access(path, other),
    }
}

fn to_metadata(stat: &RemoteStat) -> Metadata {
    Metadata {
        size: stat.size,
        modified: stat.mtime.and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
        id: None,
    }
}

#[async_trait]
impl<T: SftpTransport> StorageAdapter for SftpAdapter<T> {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn validator(&self) -> &Validator {
        &self.validator
    }

    #[instrument(skip(self), fields(backend = BACKEND, path = %path))]
    async fn stat_file(&self, path: &str) -> Result<Metadata, StorageError> {
        let stat = self.stat(path).await?;
        if stat.is_dir {
            warn!("not a file");
            return Err(StorageError::not_a_file(path));
        }
        Ok(to_metadata(&stat))
    }

    #[instrument(skip(self), fields(backend = BACKEND, path = %path))]
    async fn stat_folder(&self, path: &str) -> Result<Metadata, StorageError> {
        let stat = self.stat(path).await?;
        if !stat.is_dir {
            warn!("not a folder");
            return Err(StorageError::not_a_folder(path));
        }
        Ok(to_metadata(&stat))
    }

    #[instrument(skip(self, file), fields(backend = BACKEND, path = %file.path()))]
    async fn read_file(&self, file: &File) -> Result<Vec<u8>, StorageError> {
        let data = self.transport.read(file.path()).await.map_err(|e| {
            warn!(error = %e, "unable to read file");
            StorageError::access(file.path(), e)
        })?;
        debug!(bytes = data.len(), "file read complete");
        Ok(data)
    }

    #[instrument(
        skip(self, source, destination),
        fields(backend = BACKEND, source = %source.path(), destination = %destination.path())
    )]
    async fn write_file(&self, source: &File, destination: &Folder) -> Result<Entry, StorageError> {
        let target = join_path(destination.path(), source.name());
        let data = source.read().await?;

        self.transport
            .write(&target, &data)
            .await
            .map_err(|e| StorageError::access(&target, e))?;
        if let Some(modified) = source.modified() {
            self.transport
                .set_mtime(&target, modified.timestamp())
                .await
                .map_err(|e| StorageError::access(&target, e))?;
        }

        info!(bytes = data.len(), "file uploaded");
        Ok(Entry::file(
            target,
            Metadata {
                size: data.len() as u64,
                modified: source.modified(),
                id: None,
            },
        ))
    }

    #[instrument(skip(self, folder), fields(backend = BACKEND, path = %folder.path()))]
    async fn list_children(&self, folder: &Folder) -> Result<Vec<Entry>, StorageError> {
        let listing = self
            .transport
            .read_dir(folder.path())
            .await
            .map_err(|e| lookup_error(folder.path(), e))?;

        let mut entries: Vec<Entry> = listing
            .into_iter()
            .filter_map(|remote| {
                let path = join_path(folder.path(), &remote.name);
                if !self.validate(&path) {
                    debug!(path = %path, "not validated, skipping");
                    return None;
                }
                let metadata = to_metadata(&remote.stat);
                Some(if remote.stat.is_dir {
                    Entry::folder(path, metadata)
                } else {
                    Entry::file(path, metadata)
                })
            })
            .collect();

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    #[instrument(skip(self, source), fields(backend = BACKEND, destination = %destination_path))]
    async fn materialize_folder(
        &self,
        source: &Folder,
        destination_path: &str,
    ) -> Result<Entry, StorageError> {
        let created = self.make_dirs(destination_path).await?;

        if created {
            info!("folder created");
            if let Some(modified) = source.modified() {
                if let Err(e) = self
                    .transport
                    .set_mtime(destination_path, modified.timestamp())
                    .await
                {
                    debug!(error = %e, "unable to set folder mtime");
                }
            }
        } else {
            debug!("folder already exists");
        }

        let stat = self.stat(destination_path).await?;
        Ok(Entry::folder(destination_path, to_metadata(&stat)))
    }

    #[instrument(skip(self, folder, document), fields(backend = BACKEND, path = %folder.path()))]
    async fn upload_structure_dump(
        &self,
        folder: &Folder,
        document: &[u8],
    ) -> Result<Entry, StorageError> {
        let target = join_path(folder.path(), STRUCTURE_FILE_NAME);
        self.transport
            .write(&target, document)
            .await
            .map_err(|e| StorageError::access(&target, e))?;

        info!("file structure updated");
        let stat = self.stat(&target).await?;
        Ok(Entry::file(target, to_metadata(&stat)))
    }
}

// ============================================================================
// Unit tests
// ============================================================================
