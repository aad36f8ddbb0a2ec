//! Record model
//!
//! A [`Record`] is the in-memory snapshot of one node of a storage tree,
//! either a [`File`] or a [`Folder`]. Every record owns the adapter handle it
//! was produced by; content operations are always routed through that
//! handle, and copying a record onto another backend produces a brand new
//! record owned by the destination adapter.
//!
//! ## Lifecycle
//!
//! - `File::open` / `Folder::open` build a record from a live stat lookup.
//! - `File::from_entry` / `Folder::from_entry` build one from an [`Entry`]
//!   an adapter already returned (listing rows, write results), avoiding a
//!   second round-trip.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::errors::StorageError;
use crate::ports::storage_adapter::AdapterHandle;

/// Boxed, sendable future used by the recursive record operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ============================================================================
// Metadata / Entry
// ============================================================================

/// Point-in-time metadata of a record
///
/// `id` is only present where the backend exposes a stable handle (inode
/// numbers, cloud item ids). It is never portable across adapters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Size in bytes (0 for folders on backends that do not report one)
    pub size: u64,
    /// Last modification time; `None` when the backend has no value
    pub modified: Option<DateTime<Utc>>,
    /// Backend-assigned identity token
    pub id: Option<String>,
}

/// Kind of a listed or written record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

/// Stat payload returned by adapters for listings and writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Adapter-specific path of the record
    pub path: String,
    /// Whether this is a file or a folder
    pub kind: EntryKind,
    /// Metadata as reported by the backend
    pub metadata: Metadata,
}

impl Entry {
    pub fn file(path: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
            metadata,
        }
    }

    pub fn folder(path: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Folder,
            metadata,
        }
    }

    /// Final path segment
    pub fn name(&self) -> &str {
        name_of(&self.path)
    }
}

// ============================================================================
// Path helpers
// ============================================================================

/// Joins a child name onto a parent path with a single `/`
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Final segment of a `/`-separated path (trailing separators ignored)
pub fn name_of(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Parent portion of a `/`-separated path, empty when there is none
pub fn parent_of(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => "/",
        Some(idx) => &trimmed[..idx],
        None => "",
    }
}

/// Substring after the final `.` of a name, empty when there is no dot
pub fn extension_of(name: &str) -> &str {
    name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("")
}

// ============================================================================
// File
// ============================================================================

/// A leaf record
#[derive(Clone)]
pub struct File {
    path: String,
    name: String,
    format: String,
    metadata: Metadata,
    handler: AdapterHandle,
}

impl File {
    /// Stats `path` on `handler` and builds the record from the result
    pub async fn open(path: impl Into<String>, handler: AdapterHandle) -> Result<Self, StorageError> {
        let path = path.into();
        let metadata = handler.stat_file(&path).await?;
        Ok(Self::with_metadata(path, metadata, handler))
    }

    /// Builds a record from metadata that is already known
    pub fn with_metadata(path: impl Into<String>, metadata: Metadata, handler: AdapterHandle) -> Self {
        let path = path.into();
        let name = name_of(&path).to_string();
        let format = extension_of(&name).to_string();
        Self {
            path,
            name,
            format,
            metadata,
            handler,
        }
    }

    /// Builds a record from a listing or write result
    pub fn from_entry(entry: Entry, handler: AdapterHandle) -> Self {
        Self::with_metadata(entry.path, entry.metadata, handler)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extension of the file name, empty when it has none
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn size(&self) -> u64 {
        self.metadata.size
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.metadata.modified
    }

    pub fn id(&self) -> Option<&str> {
        self.metadata.id.as_deref()
    }

    /// The adapter that owns this record
    pub fn handler(&self) -> &AdapterHandle {
        &self.handler
    }

    /// Reads the whole file content through the owning adapter
    pub async fn read(&self) -> Result<Vec<u8>, StorageError> {
        self.handler.read_file(self).await
    }

    /// Creates or overwrites this file inside `destination`
    ///
    /// Returns the record describing the destination-side result, owned by
    /// the destination folder's adapter.
    pub async fn copy_to(&self, destination: &Folder) -> Result<File, StorageError> {
        let handler = destination.handler().clone();
        let entry = handler.write_file(self, destination).await?;
        Ok(File::from_entry(entry, handler))
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("metadata", &self.metadata)
            .field("handler", &self.handler.name())
            .finish()
    }
}

// ============================================================================
// Folder
// ============================================================================

/// A record with children
///
/// `children` is keyed by child path, so adding a record whose path is
/// already present replaces the previous one.
#[derive(Clone)]
pub struct Folder {
    path: String,
    name: String,
    metadata: Metadata,
    base_location: Option<String>,
    children: BTreeMap<String, Record>,
    handler: AdapterHandle,
}

impl Folder {
    /// Stats `path` on `handler` and builds an empty folder record
    pub async fn open(
        path: impl Into<String>,
        handler: AdapterHandle,
        base_location: Option<String>,
    ) -> Result<Self, StorageError> {
        let path = path.into();
        let metadata = handler.stat_folder(&path).await?;
        Ok(Self::with_metadata(path, metadata, handler, base_location))
    }

    /// Builds a folder record from metadata that is already known
    pub fn with_metadata(
        path: impl Into<String>,
        metadata: Metadata,
        handler: AdapterHandle,
        base_location: Option<String>,
    ) -> Self {
        let path = path.into();
        let name = name_of(&path).to_string();
        Self {
            path,
            name,
            metadata,
            base_location,
            children: BTreeMap::new(),
            handler,
        }
    }

    /// Builds a folder record from a listing or write result
    pub fn from_entry(entry: Entry, handler: AdapterHandle, base_location: Option<String>) -> Self {
        Self::with_metadata(entry.path, entry.metadata, handler, base_location)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn size(&self) -> u64 {
        self.metadata.size
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.metadata.modified
    }

    pub fn id(&self) -> Option<&str> {
        self.metadata.id.as_deref()
    }

    pub fn handler(&self) -> &AdapterHandle {
        &self.handler
    }

    /// Root this folder was enumerated from; empty strings count as unset
    pub fn base_location(&self) -> Option<&str> {
        self.base_location.as_deref().filter(|base| !base.is_empty())
    }

    pub fn children(&self) -> &BTreeMap<String, Record> {
        &self.children
    }

    /// Inserts `record` under its path, replacing any previous entry
    pub fn add_child(&mut self, record: Record) {
        self.children.insert(record.path().to_string(), record);
    }

    /// Path of this folder with the base location removed
    ///
    /// This is plain textual prefix removal: a base location that is not a
    /// literal prefix of the path leaves the path unchanged. Trailing
    /// separators on the base are not part of the prefix, so a non-empty
    /// result always starts with `/` when the base matched.
    pub fn relative_path(&self) -> Result<&str, StorageError> {
        match self.base_location() {
            Some(base) => {
                let prefix = base.trim_end_matches('/');
                Ok(self
                    .path
                    .strip_prefix(prefix)
                    .map(|rest| rest.trim_end_matches('/'))
                    .unwrap_or(&self.path))
            }
            None => Err(StorageError::NoBasePath(self.path.clone())),
        }
    }

    /// Recursively enumerates the folder through its adapter
    ///
    /// Child folders inherit this folder's base location. Entries the
    /// adapter's filters reject never reach the tree. Errors abort the
    /// enumeration and propagate to the caller.
    pub fn load_content(&mut self) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(async move {
            let handler = self.handler.clone();
            let entries = handler.list_children(self).await?;
            debug!(
                backend = handler.name(),
                path = %self.path,
                entries = entries.len(),
                "Enumerated folder"
            );

            for entry in entries {
                match entry.kind {
                    EntryKind::File => {
                        self.add_child(Record::File(File::from_entry(entry, handler.clone())));
                    }
                    EntryKind::Folder => {
                        let mut child =
                            Folder::from_entry(entry, handler.clone(), self.base_location.clone());
                        child.load_content().await?;
                        self.add_child(Record::Folder(child));
                    }
                }
            }

            Ok(())
        })
    }

    /// Totals over the whole subtree (this folder excluded)
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        for child in self.children.values() {
            match child {
                Record::File(file) => {
                    stats.files += 1;
                    stats.bytes += file.size();
                }
                Record::Folder(folder) => {
                    stats.folders += 1;
                    let nested = folder.stats();
                    stats.files += nested.files;
                    stats.folders += nested.folders;
                    stats.bytes += nested.bytes;
                }
            }
        }
        stats
    }
}

impl fmt::Debug for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Folder")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .field("base_location", &self.base_location)
            .field("children", &self.children)
            .field("handler", &self.handler.name())
            .finish()
    }
}

/// File/folder/byte totals of a tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub files: u64,
    pub folders: u64,
    pub bytes: u64,
}

// ============================================================================
// Record
// ============================================================================

/// Either kind of tree node
#[derive(Debug, Clone)]
pub enum Record {
    File(File),
    Folder(Folder),
}

impl Record {
    pub fn path(&self) -> &str {
        match self {
            Record::File(file) => file.path(),
            Record::Folder(folder) => folder.path(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Record::File(file) => file.name(),
            Record::Folder(folder) => folder.name(),
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Record::File(_) => EntryKind::File,
            Record::Folder(_) => EntryKind::Folder,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        match self {
            Record::File(file) => file.metadata(),
            Record::Folder(folder) => folder.metadata(),
        }
    }

    pub fn as_folder(&self) -> Option<&Folder> {
        match self {
            Record::Folder(folder) => Some(folder),
            Record::File(_) => None,
        }
    }
}

// ============================================================================
// Unit tests
// ============================================================================
