//! Storage adapter port (driven/secondary port)
//!
//! A storage adapter binds the record model to one backend: it resolves
//! paths to metadata, moves file content in and out, enumerates folders and
//! creates folder chains. Adapters are shared between every record they
//! produce through an [`AdapterHandle`].
//!
//! ## Design Notes
//!
//! - Errors are classified through [`StorageError`] because the replication
//!   engine's skip/abort policy depends on the kind.
//! - `list_children` must apply the adapter's [`Validator`] itself; rejected
//!   entries never reach the caller.
//! - Write operations receive the *source* record plus the destination
//!   parent, so adapters can carry over names and modification times.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::StorageError;
use crate::domain::record::{Entry, File, Folder, Metadata};
use crate::validation::Validator;

/// Shared handle to an adapter, owned by every record it produces
pub type AdapterHandle = Arc<dyn StorageAdapter>;

/// Backend operations required by the record model and the engine
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Short backend name used in logs and error messages
    fn name(&self) -> &'static str;

    /// Filter chain applied by [`StorageAdapter::list_children`]
    fn validator(&self) -> &Validator;

    /// Runs `path` through the adapter's filter chain
    fn validate(&self, path: &str) -> bool {
        self.validator().validate(path)
    }

    /// Metadata of the file at `path`
    ///
    /// Fails with `NotFound` when nothing exists there and `WrongKind` when
    /// the path is a folder.
    async fn stat_file(&self, path: &str) -> Result<Metadata, StorageError>;

    /// Metadata of the folder at `path`
    async fn stat_folder(&self, path: &str) -> Result<Metadata, StorageError>;

    /// Full content of a file this adapter owns
    async fn read_file(&self, file: &File) -> Result<Vec<u8>, StorageError>;

    /// Creates or overwrites `destination/<source name>` with the content of
    /// `source`, which may belong to any adapter
    async fn write_file(&self, source: &File, destination: &Folder) -> Result<Entry, StorageError>;

    /// Immediate children of `folder` that pass the filter chain
    async fn list_children(&self, folder: &Folder) -> Result<Vec<Entry>, StorageError>;

    /// Ensures the folder chain `destination_path` exists, reusing whatever
    /// is already there
    async fn materialize_folder(
        &self,
        source: &Folder,
        destination_path: &str,
    ) -> Result<Entry, StorageError>;

    /// Stores a `structure.json` document inside `folder`
    ///
    /// Backends without manifest support keep the default, which reports
    /// [`StorageError::Unsupported`].
    async fn upload_structure_dump(
        &self,
        _folder: &Folder,
        _document: &[u8],
    ) -> Result<Entry, StorageError> {
        Err(StorageError::Unsupported {
            backend: self.name().to_string(),
            operation: "structure dumps".to_string(),
        })
    }
}
