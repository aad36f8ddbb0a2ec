//! Port definitions
//!
//! The record model depends on a single driven port: [`StorageAdapter`].
//! Implementations live in the adapter crates (`treesync-sync` for the
//! local filesystem, `treesync-sftp`, `treesync-cloud`).

pub mod storage_adapter;

pub use storage_adapter::{AdapterHandle, StorageAdapter};
