//! Google Drive storage adapter
//!
//! Records carry `/`-separated paths rooted at "My Drive"; every path
//! operation walks the segments from the root folder id fetched at connect
//! time. Drive allows several items with the same name under one parent:
//! lookups take the first match.

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use treesync_core::config::DriveConfig;
use treesync_core::domain::record::join_path;
use treesync_core::manifest::STRUCTURE_FILE_NAME;
use treesync_core::{Entry, File, Folder, Metadata, StorageAdapter, StorageError, Validator};

use super::auth;
use super::client::{DriveClient, DriveFile};
use crate::http::HttpClient;

const BACKEND: &str = "gdrive";

const OCTET_STREAM: &str = "application/octet-stream";
const JSON_MIME_TYPE: &str = "application/json";

/// [`StorageAdapter`] for Google Drive
pub struct DriveAdapter {
    client: DriveClient,
    root: DriveFile,
    validator: Validator,
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn to_metadata(file: &DriveFile) -> Metadata {
    Metadata {
        size: file.size_bytes(),
        modified: file.modified_time,
        id: Some(file.id.clone()),
    }
}

fn to_entry(path: String, file: &DriveFile) -> Entry {
    if file.is_folder() {
        Entry::folder(path, to_metadata(file))
    } else {
        Entry::file(path, to_metadata(file))
    }
}

impl DriveAdapter {
    /// Loads the OAuth token and resolves the root folder
    pub async fn connect(
        config: &DriveConfig,
        max_retries: u32,
        validator: Validator,
    ) -> Result<Self, StorageError> {
        let token = auth::access_token(&config.token_file, &config.credentials_file).await?;
        let client = DriveClient::new(
            HttpClient::new(max_retries),
            &config.api_base_url,
            &config.upload_base_url,
            token,
        );
        Self::with_client(client, validator).await
    }

    /// Builds the adapter over an already authenticated client
    pub async fn with_client(client: DriveClient, validator: Validator) -> Result<Self, StorageError> {
        let root = client
            .root()
            .await
            .map_err(|e| StorageError::no_connection(BACKEND, e))?;
        info!(root_id = %root.id, "Connected to Google Drive");
        Ok(Self {
            client,
            root,
            validator,
        })
    }

    /// Walks `path` from the root, one name lookup per segment
    async fn resolve(&self, path: &str) -> Result<DriveFile, StorageError> {
        let mut current = self.root.clone();
        for segment in segments(path) {
            if !current.is_folder() {
                return Err(StorageError::NotFound(path.to_string()));
            }
            let matches = self
                .client
                .find(&current.id, segment)
                .await
                .map_err(|e| e.into_lookup_error(path))?;
            current = matches
                .into_iter()
                .next()
                .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        }
        Ok(current)
    }

    /// Folder id for a record, resolving the path when the record has none
    async fn folder_id(&self, folder: &Folder) -> Result<String, StorageError> {
        match folder.id() {
            Some(id) => Ok(id.to_string()),
            None => Ok(self.resolve(folder.path()).await?.id),
        }
    }

    /// Removes every non-folder item called `name` under `parent_id`
    async fn delete_files_named(&self, parent_id: &str, name: &str, path: &str) -> Result<(), StorageError> {
        let existing = self
            .client
            .find(parent_id, name)
            .await
            .map_err(|e| e.into_access_error(path))?;
        for item in existing.iter().filter(|f| !f.is_folder()) {
            debug!(id = %item.id, "Removing previous version");
            self.client
                .delete(&item.id)
                .await
                .map_err(|e| e.into_access_error(path))?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for DriveAdapter {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn validator(&self) -> &Validator {
        &self.validator
    }

    #[instrument(skip(self), fields(backend = BACKEND, path = %path))]
    async fn stat_file(&self, path: &str) -> Result<Metadata, StorageError> {
        let file = self.resolve(path).await?;
        if file.is_folder() {
            warn!("not a file");
            return Err(StorageError::not_a_file(path));
        }
        Ok(to_metadata(&file))
    }

    #[instrument(skip(self), fields(backend = BACKEND, path = %path))]
    async fn stat_folder(&self, path: &str) -> Result<Metadata, StorageError> {
        let file = self.resolve(path).await?;
        if !file.is_folder() {
            warn!("not a folder");
            return Err(StorageError::not_a_folder(path));
        }
        Ok(to_metadata(&file))
    }

    #[instrument(skip(self, file), fields(backend = BACKEND, path = %file.path()))]
    async fn read_file(&self, file: &File) -> Result<Vec<u8>, StorageError> {
        let id = match file.id() {
            Some(id) => id.to_string(),
            None => self
                .resolve(file.path())
                .await
                .map_err(|e| StorageError::access(file.path(), e))?
                .id,
        };
        let data = self.client.download(&id).await.map_err(|e| {
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
        let parent_id = self
            .folder_id(destination)
            .await
            .map_err(|e| StorageError::access(&target, e))?;
        let data = source.read().await?;
        let bytes = data.len();

        self.delete_files_named(&parent_id, source.name(), &target)
            .await?;
        let created = self
            .client
            .create_file(&parent_id, source.name(), OCTET_STREAM, source.modified(), data)
            .await
            .map_err(|e| e.into_access_error(&target))?;

        info!(bytes, id = %created.id, "file uploaded");
        Ok(Entry::file(target, to_metadata(&created)))
    }

    #[instrument(skip(self, folder), fields(backend = BACKEND, path = %folder.path()))]
    async fn list_children(&self, folder: &Folder) -> Result<Vec<Entry>, StorageError> {
        let parent_id = self.folder_id(folder).await?;
        let listing = self
            .client
            .list(&parent_id)
            .await
            .map_err(|e| e.into_lookup_error(folder.path()))?;

        let mut entries: Vec<Entry> = listing
            .iter()
            .filter_map(|item| {
                let path = join_path(folder.path(), &item.name);
                if !self.validate(&path) {
                    debug!(path = %path, "not validated, skipping");
                    return None;
                }
                Some(to_entry(path, item))
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
        let names: Vec<&str> = segments(destination_path).collect();
        let mut current = self.root.clone();

        for (index, name) in names.iter().enumerate() {
            let existing = self
                .client
                .find(&current.id, name)
                .await
                .map_err(|e| e.into_access_error(destination_path))?;

            current = match existing.into_iter().find(DriveFile::is_folder) {
                Some(folder) => {
                    debug!(name, id = %folder.id, "reusing folder");
                    folder
                }
                None => {
                    let modified = if index + 1 == names.len() {
                        source.modified()
                    } else {
                        None
                    };
                    let folder = self
                        .client
                        .create_folder(&current.id, name, modified)
                        .await
                        .map_err(|e| e.into_access_error(destination_path))?;
                    info!(name, id = %folder.id, "folder created");
                    folder
                }
            };
        }

        Ok(Entry::folder(destination_path, to_metadata(&current)))
    }

    #[instrument(skip(self, folder, document), fields(backend = BACKEND, path = %folder.path()))]
    async fn upload_structure_dump(
        &self,
        folder: &Folder,
        document: &[u8],
    ) -> Result<Entry, StorageError> {
        let target = join_path(folder.path(), STRUCTURE_FILE_NAME);
        let parent_id = self
            .folder_id(folder)
            .await
            .map_err(|e| StorageError::access(&target, e))?;

        self.delete_files_named(&parent_id, STRUCTURE_FILE_NAME, &target)
            .await?;
        let created = self
            .client
            .create_file(
                &parent_id,
                STRUCTURE_FILE_NAME,
                JSON_MIME_TYPE,
                None,
                document.to_vec(),
            )
            .await
            .map_err(|e| e.into_access_error(&target))?;

        info!(id = %created.id, "file structure updated");
        Ok(Entry::file(target, to_metadata(&created)))
    }
}
