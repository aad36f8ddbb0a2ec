//! Domain error types
//!
//! Every storage adapter reports failures through [`StorageError`]. The
//! variants encode the propagation policy of a run: `Access` is the only
//! kind the engine converts into a skip-and-log outcome, everything else
//! aborts the branch it occurs in.

use std::fmt;

use thiserror::Error;

/// Which kind of record an operation expected to find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedKind {
    File,
    Folder,
}

impl fmt::Display for ExpectedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedKind::File => write!(f, "file"),
            ExpectedKind::Folder => write!(f, "folder"),
        }
    }
}

/// Errors raised by storage adapters and the record model
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Nothing exists at the queried path
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The path exists but holds the other kind of record
    #[error("{path} is not a {expected}")]
    WrongKind {
        /// The offending path
        path: String,
        /// The kind the caller asked for
        expected: ExpectedKind,
    },

    /// The backend is reachable but the I/O itself failed
    #[error("Unable to access {path}: {reason}")]
    Access {
        /// Path (or backend id) the operation targeted
        path: String,
        /// Backend-specific failure description
        reason: String,
    },

    /// Replication was attempted on a folder without a base location
    #[error("No base path for {0}")]
    NoBasePath(String),

    /// The adapter could not establish its backend session
    #[error("No connection to {backend}: {reason}")]
    NoConnection {
        /// Adapter name
        backend: String,
        /// Why the session could not be established
        reason: String,
    },

    /// An optional capability the backend does not implement
    #[error("{backend} does not support {operation}")]
    Unsupported {
        /// Adapter name
        backend: String,
        /// The operation that was requested
        operation: String,
    },
}

impl StorageError {
    /// Shorthand for an [`StorageError::Access`] error
    pub fn access(path: impl Into<String>, reason: impl fmt::Display) -> Self {
        StorageError::Access {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for a [`StorageError::NoConnection`] error
    pub fn no_connection(backend: impl Into<String>, reason: impl fmt::Display) -> Self {
        StorageError::NoConnection {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }

    /// `path` was expected to be a file but is a folder
    pub fn not_a_file(path: impl Into<String>) -> Self {
        StorageError::WrongKind {
            path: path.into(),
            expected: ExpectedKind::File,
        }
    }

    /// `path` was expected to be a folder but is a file
    pub fn not_a_folder(path: impl Into<String>) -> Self {
        StorageError::WrongKind {
            path: path.into(),
            expected: ExpectedKind::Folder,
        }
    }

    /// Whether the engine may skip the failing child and carry on
    pub fn is_skippable(&self) -> bool {
        matches!(self, StorageError::Access { .. })
    }
}
