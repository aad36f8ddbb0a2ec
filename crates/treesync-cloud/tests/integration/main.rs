//! Integration tests for treesync-cloud
//!
//! Uses wiremock to simulate the Google Drive and Dropbox HTTP APIs and
//! drives the adapters through the record model and the sync engine.

mod common;

mod test_drive;
mod test_dropbox;
