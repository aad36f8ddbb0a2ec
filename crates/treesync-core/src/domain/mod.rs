//! Domain model
//!
//! - [`record`] - `File`/`Folder` records and the payloads adapters return
//! - [`errors`] - the [`errors::StorageError`] taxonomy shared by all adapters

pub mod errors;
pub mod record;

pub use errors::{ExpectedKind, StorageError};
pub use record::{Entry, EntryKind, File, Folder, Metadata, Record};
