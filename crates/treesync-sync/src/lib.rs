//! treesync Sync - Recursive replication engine
//!
//! Provides:
//! - Depth-first enumeration of a source tree through its adapter
//! - Replication of that tree onto any destination adapter
//! - Per-child failure isolation and run summaries
//! - `structure.json` manifest emission
//!
//! ## Modules
//!
//! - [`engine`] - The replication engine and its run summary
//! - [`filesystem`] - Local filesystem adapter (atomic writes, mtime preservation)

pub mod engine;
pub mod filesystem;

pub use engine::{SyncEngine, SyncOutcome, SyncResult};
pub use filesystem::LocalAdapter;
