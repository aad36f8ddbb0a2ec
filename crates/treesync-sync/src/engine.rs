//! Recursive replication engine
//!
//! The [`SyncEngine`] copies a directory tree from one storage adapter onto
//! another, one-way and depth-first.
//!
//! ## Sync Flow
//!
//! 1. **Enumerate**: open the source root with itself as base location and
//!    load its content recursively (filters applied by the source adapter)
//! 2. **Replicate**: for every folder, materialize `dest_root + relative
//!    path` on the destination, then re-validate and copy each child
//! 3. **Manifest**: emit `structure.json` according to [`ManifestMode`]
//!
//! ## Failure isolation
//!
//! An `Access` error on a single child (file or folder) is logged, recorded
//! in [`SyncResult::errors`] and skipped; its siblings still proceed. Any
//! other error aborts the folder being written and propagates upwards.

use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use treesync_core::config::ManifestMode;
use treesync_core::domain::record::{join_path, BoxFuture};
use treesync_core::manifest;
use treesync_core::{AdapterHandle, Folder, Record, StorageError};

// ============================================================================
// SyncResult
// ============================================================================

/// Summary of one replication run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResult {
    /// Folders materialized on the destination (root included)
    pub folders_written: u32,
    /// Files copied to the destination
    pub files_written: u32,
    /// Bytes reported by the destination for copied files
    pub bytes_written: u64,
    /// Children rejected by the destination's filters at write time
    pub excluded: u32,
    /// Children skipped after an access failure (non-fatal)
    pub errors: Vec<String>,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
}

impl SyncResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn record_skip(&mut self, path: &str, err: &StorageError) {
        self.errors.push(format!("{path}: {err}"));
    }
}

/// Replicated destination tree plus the run summary
#[derive(Debug)]
pub struct SyncOutcome {
    pub tree: Folder,
    pub result: SyncResult,
}

/// Formats an elapsed duration as `H:MM:SS.mmm`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!(
        "{}:{:02}:{:02}.{:03}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        elapsed.subsec_millis()
    )
}

/// `dest_root` with a relative path appended, one `/` between them
fn destination_path(dest_root: &str, relative: &str) -> String {
    if relative.is_empty() {
        dest_root.to_string()
    } else if relative.starts_with('/') {
        format!("{}{relative}", dest_root.trim_end_matches('/'))
    } else {
        join_path(dest_root, relative)
    }
}

// ============================================================================
// SyncEngine
// ============================================================================

/// One-way tree replication between two adapters
pub struct SyncEngine {
    source: AdapterHandle,
    destination: AdapterHandle,
    manifest: ManifestMode,
}

impl SyncEngine {
    /// Creates an engine writing a root manifest
    pub fn new(source: AdapterHandle, destination: AdapterHandle) -> Self {
        Self {
            source,
            destination,
            manifest: ManifestMode::Root,
        }
    }

    pub fn with_manifest(mut self, mode: ManifestMode) -> Self {
        self.manifest = mode;
        self
    }

    /// Builds the in-memory tree rooted at `root` on the source adapter
    ///
    /// The root becomes the base location of every folder in the tree.
    /// `NotFound` and `WrongKind` on the root, and any failure while
    /// listing, propagate to the caller.
    #[instrument(skip(self), fields(backend = self.source.name()))]
    pub async fn enumerate(&self, root: &str) -> Result<Folder, StorageError> {
        let mut folder = Folder::open(root, self.source.clone(), Some(root.to_string())).await?;
        folder.load_content().await?;

        let stats = folder.stats();
        info!(
            files = stats.files,
            folders = stats.folders,
            bytes = stats.bytes,
            "Source tree enumerated"
        );
        Ok(folder)
    }

    /// Replicates `source` under `dest_root` on the destination adapter
    ///
    /// The destination path is `dest_root` followed by the source folder's
    /// relative path. When `with_content` is false only the folder chain is
    /// materialized. No manifest is written.
    pub async fn write_folder(
        &self,
        source: &Folder,
        dest_root: &str,
        with_content: bool,
    ) -> Result<Folder, StorageError> {
        let mut result = SyncResult::default();
        self.write_folder_into(source, dest_root, with_content, &mut result)
            .await
    }

    /// Enumerates `source_root`, replicates it onto `dest_root` and emits the
    /// configured manifest
    #[instrument(
        skip(self),
        fields(source = self.source.name(), destination = self.destination.name())
    )]
    pub async fn run(&self, source_root: &str, dest_root: &str) -> Result<SyncOutcome, StorageError> {
        let started = Instant::now();
        let mut result = SyncResult::default();

        let tree = self.enumerate(source_root).await?;
        let replicated = self
            .write_folder_into(&tree, dest_root, true, &mut result)
            .await?;

        if self.manifest == ManifestMode::Root {
            self.dump_structure(&replicated, &mut result).await;
        }

        let elapsed = started.elapsed();
        result.duration_ms = elapsed.as_millis() as u64;

        info!(
            folders = result.folders_written,
            files = result.files_written,
            bytes = result.bytes_written,
            excluded = result.excluded,
            skipped = result.errors.len(),
            "Done in {}",
            format_elapsed(elapsed)
        );

        Ok(SyncOutcome {
            tree: replicated,
            result,
        })
    }

    fn write_folder_into<'a>(
        &'a self,
        source: &'a Folder,
        dest_root: &'a str,
        with_content: bool,
        result: &'a mut SyncResult,
    ) -> BoxFuture<'a, Result<Folder, StorageError>> {
        Box::pin(async move {
            let relative = source.relative_path()?;
            let destination_path = destination_path(dest_root, relative);

            debug!(
                source = %source.path(),
                destination = %destination_path,
                "Materializing folder"
            );
            let entry = self
                .destination
                .materialize_folder(source, &destination_path)
                .await?;
            result.folders_written += 1;

            let mut replicated = Folder::from_entry(
                entry,
                self.destination.clone(),
                Some(dest_root.to_string()),
            );

            if !with_content {
                return Ok(replicated);
            }

            for (path, child) in source.children() {
                if !self.destination.validate(path) {
                    debug!(path = %path, "Rejected by destination filters, skipping");
                    result.excluded += 1;
                    continue;
                }

                match child {
                    Record::File(file) => match file.copy_to(&replicated).await {
                        Ok(copied) => {
                            result.files_written += 1;
                            result.bytes_written += copied.size();
                            replicated.add_child(Record::File(copied));
                        }
                        Err(err) if err.is_skippable() => {
                            warn!(path = %path, error = %err, "Unable to copy file, skipping");
                            result.record_skip(path, &err);
                        }
                        Err(err) => return Err(err),
                    },
                    Record::Folder(folder) => {
                        match self.write_folder_into(folder, dest_root, true, result).await {
                            Ok(sub) => replicated.add_child(Record::Folder(sub)),
                            Err(err) if err.is_skippable() => {
                                warn!(path = %path, error = %err, "Unable to copy folder, skipping");
                                result.record_skip(path, &err);
                            }
                            Err(err) => return Err(err),
                        }
                    }
                }
            }

            if self.manifest == ManifestMode::PerFolder {
                self.dump_structure(&replicated, result).await;
            }

            Ok(replicated)
        })
    }

    /// Writes `structure.json` describing `folder` into `folder`
    ///
    /// Manifest failures never fail the run.
    async fn dump_structure(&self, folder: &Folder, result: &mut SyncResult) {
        let document = match manifest::render(folder) {
            Ok(document) => document,
            Err(err) => {
                warn!(path = %folder.path(), error = %err, "Unable to render structure");
                result.errors.push(format!("{}: {err}", folder.path()));
                return;
            }
        };

        match self
            .destination
            .upload_structure_dump(folder, &document)
            .await
        {
            Ok(entry) => debug!(path = %entry.path, "Structure updated"),
            Err(err @ StorageError::Unsupported { .. }) => {
                warn!(error = %err, "Structure dump skipped");
            }
            Err(err) => {
                warn!(path = %folder.path(), error = %err, "Unable to write structure");
                result.record_skip(folder.path(), &err);
            }
        }
    }
}

// ============================================================================
// Unit tests
// ============================================================================
