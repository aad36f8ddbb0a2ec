//! Google Drive backend

mod adapter;
pub mod auth;
pub mod client;

pub use adapter::DriveAdapter;
pub use client::{DriveClient, DriveFile, FOLDER_MIME_TYPE};
