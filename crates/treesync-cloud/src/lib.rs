//! treesync Cloud - HTTP storage adapters
//!
//! Provides:
//! - [`drive::DriveAdapter`] - Google Drive v3, where folders are addressed by
//!   id and paths have to be walked one segment at a time
//! - [`dropbox::DropboxAdapter`] - Dropbox API v2, path addressed
//! - [`http::HttpClient`] - shared request execution with optional retries
//!
//! Both adapters hold a single authenticated client for the whole run.

pub mod drive;
pub mod dropbox;
pub mod http;

pub use drive::DriveAdapter;
pub use dropbox::DropboxAdapter;
pub use http::{HttpClient, HttpError};
