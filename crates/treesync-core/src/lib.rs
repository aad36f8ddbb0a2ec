//! treesync Core - Record model, ports and filters
//!
//! This crate contains the backend-agnostic heart of treesync:
//! - **Record model** - `File`, `Folder`, `Record`, plus the `Metadata`/`Entry`
//!   payloads adapters hand back
//! - **Port definitions** - the [`ports::StorageAdapter`] trait every backend implements
//! - **Validation** - composable path filters injected into adapters
//! - **Manifest** - the `structure.json` tree description
//! - **Configuration** - the YAML configuration file
//!
//! # Architecture
//!
//! Like the rest of the workspace this crate follows a ports & adapters
//! layout. Nothing here performs I/O on its own: every read or write goes
//! through the adapter handle a record owns.

pub mod config;
pub mod domain;
pub mod manifest;
pub mod ports;
pub mod validation;

pub use domain::errors::StorageError;
pub use domain::record::{Entry, EntryKind, File, Folder, Metadata, Record};
pub use ports::storage_adapter::{AdapterHandle, StorageAdapter};
pub use validation::Validator;
