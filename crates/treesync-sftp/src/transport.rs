//! SFTP transport port
//!
//! The adapter only needs a handful of remote operations. Keeping them
//! behind [`SftpTransport`] lets the adapter logic run against an in-memory
//! server in tests.

use async_trait::async_trait;
use thiserror::Error;

/// Attributes of a remote path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteStat {
    pub is_dir: bool,
    pub size: u64,
    /// Seconds since the Unix epoch
    pub mtime: Option<i64>,
}

/// One row of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub stat: RemoteStat,
}

/// Errors reported by a transport
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("no such file: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("session failure: {0}")]
    Failure(String),
}

/// Remote operations used by [`crate::SftpAdapter`]
#[async_trait]
pub trait SftpTransport: Send + Sync {
    async fn stat(&self, path: &str) -> Result<RemoteStat, TransportError>;

    async fn read(&self, path: &str) -> Result<Vec<u8>, TransportError>;

    /// Creates or truncates `path` and writes `data`
    async fn write(&self, path: &str, data: &[u8]) -> Result<(), TransportError>;

    /// Creates a single directory; the parent must exist
    async fn mkdir(&self, path: &str) -> Result<(), TransportError>;

    /// Sets both access and modification time
    async fn set_mtime(&self, path: &str, mtime: i64) -> Result<(), TransportError>;

    /// Entries of a directory, without `.` and `..`
    async fn read_dir(&self, path: &str) -> Result<Vec<RemoteEntry>, TransportError>;
}
