//! Dropbox storage adapter
//!
//! Dropbox is path addressed, so records map onto API calls directly. The
//! root has no metadata of its own and is reported with id `"0"`. Folder
//! materialization replaces whatever sits at the destination path.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use treesync_core::config::DropboxConfig;
use treesync_core::domain::record::join_path;
use treesync_core::{Entry, File, Folder, Metadata, StorageAdapter, StorageError, Validator};

use super::client::{api_path, is_not_found, DropboxClient, DropboxMetadata};
use crate::http::{HttpClient, HttpError};

const BACKEND: &str = "dropbox";

/// Id reported for the account root
pub const ROOT_ID: &str = "0";

/// [`StorageAdapter`] for Dropbox
pub struct DropboxAdapter {
    client: DropboxClient,
    validator: Validator,
}

fn to_metadata(meta: &DropboxMetadata) -> Metadata {
    Metadata {
        size: meta.size.unwrap_or(0),
        modified: meta.server_modified,
        id: meta.id.clone(),
    }
}

fn root_metadata() -> Metadata {
    Metadata {
        size: 0,
        modified: None,
        id: Some(ROOT_ID.to_string()),
    }
}

fn lookup_error(path: &str, err: HttpError) -> StorageError {
    if is_not_found(&err) {
        StorageError::NotFound(path.to_string())
    } else {
        err.into_lookup_error(path)
    }
}

impl DropboxAdapter {
    /// Verifies the configured token against the account endpoint
    pub async fn connect(
        config: &DropboxConfig,
        max_retries: u32,
        validator: Validator,
    ) -> Result<Self, StorageError> {
        let token = config
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| StorageError::no_connection(BACKEND, "no access token configured"))?;
        let client = DropboxClient::new(
            HttpClient::new(max_retries),
            &config.api_base_url,
            &config.content_base_url,
            token,
        );
        Self::with_client(client, validator).await
    }

    pub async fn with_client(client: DropboxClient, validator: Validator) -> Result<Self, StorageError> {
        let account = client
            .current_account()
            .await
            .map_err(|e| StorageError::no_connection(BACKEND, e))?;
        info!(account = %account, "Connected to Dropbox");
        Ok(Self { client, validator })
    }

    async fn stat(&self, path: &str) -> Result<Option<DropboxMetadata>, StorageError> {
        if api_path(path).is_empty() {
            return Ok(None);
        }
        let meta = self
            .client
            .get_metadata(path)
            .await
            .map_err(|e| lookup_error(path, e))?;
        if meta.tag.as_deref() == Some("deleted") {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(Some(meta))
    }
}

#[async_trait]
impl StorageAdapter for DropboxAdapter {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn validator(&self) -> &Validator {
        &self.validator
    }

    #[instrument(skip(self), fields(backend = BACKEND, path = %path))]
    async fn stat_file(&self, path: &str) -> Result<Metadata, StorageError> {
        match self.stat(path).await? {
            Some(meta) if meta.is_file() => Ok(to_metadata(&meta)),
            _ => {
                warn!("not a file");
                Err(StorageError::not_a_file(path))
            }
        }
    }

    #[instrument(skip(self), fields(backend = BACKEND, path = %path))]
    async fn stat_folder(&self, path: &str) -> Result<Metadata, StorageError> {
        match self.stat(path).await? {
            None => Ok(root_metadata()),
            Some(meta) if meta.is_folder() => Ok(to_metadata(&meta)),
            Some(_) => {
                warn!("not a folder");
                Err(StorageError::not_a_folder(path))
            }
        }
    }

    #[instrument(skip(self, file), fields(backend = BACKEND, path = %file.path()))]
    async fn read_file(&self, file: &File) -> Result<Vec<u8>, StorageError> {
        let data = self.client.download(file.path()).await.map_err(|e| {
            warn!(error = %e, "unable to download file");
            e.into_access_error(file.path())
        })?;
        debug!(bytes = data.len(), "file downloaded");
        Ok(data)
    }

    #[instrument(
        skip(self, source, destination),
        fields(backend = BACKEND, source = %source.path(), destination = %destination.path())
    )]
    async fn write_file(&self, source: &File, destination: &Folder) -> Result<Entry, StorageError> {
        let target = join_path(destination.path(), source.name());
        let data = source.read().await?;
        let bytes = data.len();

        let uploaded = self
            .client
            .upload(&target, data, source.modified())
            .await
            .map_err(|e| e.into_access_error(&target))?;

        info!(bytes, "file uploaded");
        Ok(Entry::file(target, to_metadata(&uploaded)))
    }

    #[instrument(skip(self, folder), fields(backend = BACKEND, path = %folder.path()))]
    async fn list_children(&self, folder: &Folder) -> Result<Vec<Entry>, StorageError> {
        let listing = self
            .client
            .list_folder(folder.path())
            .await
            .map_err(|e| lookup_error(folder.path(), e))?;

        let mut entries: Vec<Entry> = listing
            .iter()
            .filter(|meta| meta.is_file() || meta.is_folder())
            .filter_map(|meta| {
                let path = join_path(folder.path(), &meta.name);
                if !self.validate(&path) {
                    debug!(path = %path, "not validated, skipping");
                    return None;
                }
                Some(if meta.is_folder() {
                    Entry::folder(path, to_metadata(meta))
                } else {
                    Entry::file(path, to_metadata(meta))
                })
            })
            .collect();

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    #[instrument(skip(self, _source), fields(backend = BACKEND, destination = %destination_path))]
    async fn materialize_folder(
        &self,
        _source: &Folder,
        destination_path: &str,
    ) -> Result<Entry, StorageError> {
        if api_path(destination_path).is_empty() {
            debug!("destination is the account root");
            return Ok(Entry::folder(destination_path, root_metadata()));
        }

        self.client
            .delete(destination_path)
            .await
            .map_err(|e| e.into_access_error(destination_path))?;
        let created = self
            .client
            .create_folder(destination_path)
            .await
            .map_err(|e| e.into_access_error(destination_path))?;

        info!("folder created");
        Ok(Entry::folder(
            destination_path,
            Metadata {
                size: 0,
                modified: Some(Utc::now()),
                id: created.id,
            },
        ))
    }
}
