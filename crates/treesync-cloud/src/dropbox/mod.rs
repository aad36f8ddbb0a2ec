//! Dropbox backend

mod adapter;
pub mod client;

pub use adapter::{DropboxAdapter, ROOT_ID};
pub use client::{DropboxClient, DropboxMetadata};
