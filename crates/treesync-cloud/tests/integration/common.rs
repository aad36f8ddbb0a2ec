//! Shared test helpers for the cloud adapter integration tests
//!
//! Each setup helper mounts the endpoints an adapter calls while connecting
//! and returns the adapter pointed at the mock server.

use std::path::Path;
use std::sync::Arc;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use treesync_cloud::drive::{DriveClient, FOLDER_MIME_TYPE};
use treesync_cloud::dropbox::DropboxClient;
use treesync_cloud::{DriveAdapter, DropboxAdapter, HttpClient};
use treesync_core::{AdapterHandle, Validator};
use treesync_sync::LocalAdapter;

pub const DRIVE_ROOT_ID: &str = "root-test-001";

/// Drive mock with `GET /files/root` mounted, no filters
pub async fn setup_drive_mock() -> (MockServer, DriveAdapter) {
    setup_drive_mock_with(Validator::new()).await
}

pub async fn setup_drive_mock_with(validator: Validator) -> (MockServer, DriveAdapter) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/files/root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": DRIVE_ROOT_ID,
            "name": "My Drive",
            "mimeType": FOLDER_MIME_TYPE
        })))
        .mount(&server)
        .await;

    let client = DriveClient::new(
        HttpClient::new(0),
        server.uri(),
        format!("{}/upload", server.uri()),
        "test-access-token",
    );
    let adapter = DriveAdapter::with_client(client, validator)
        .await
        .expect("drive adapter connects");

    (server, adapter)
}

/// Mounts the name lookup of `name` under `parent_id`
pub async fn mount_drive_find(
    server: &MockServer,
    parent_id: &str,
    name: &str,
    files: serde_json::Value,
) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param(
            "q",
            format!("name = '{name}' and '{parent_id}' in parents and trashed = false").as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": files
        })))
        .mount(server)
        .await;
}

/// Mounts the full listing of `parent_id`
pub async fn mount_drive_list(server: &MockServer, parent_id: &str, files: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param(
            "q",
            format!("'{parent_id}' in parents and trashed = false").as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": files
        })))
        .mount(server)
        .await;
}

pub fn drive_folder(id: &str, name: &str) -> serde_json::Value {
    serde_json::json!({ "id": id, "name": name, "mimeType": FOLDER_MIME_TYPE })
}

pub fn drive_file(id: &str, name: &str, size: u64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "mimeType": "text/plain",
        "size": size.to_string(),
        "modifiedTime": "2024-01-02T03:04:05.000Z"
    })
}

/// Dropbox mock with the account check mounted, no filters
pub async fn setup_dropbox_mock() -> (MockServer, DropboxAdapter) {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/users/get_current_account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "account_id": "dbid:test-001",
            "name": { "display_name": "Test User" },
            "email": "test@example.com"
        })))
        .mount(&server)
        .await;

    let client = DropboxClient::new(HttpClient::new(0), server.uri(), server.uri(), "test-access-token");
    let adapter = DropboxAdapter::with_client(client, Validator::new())
        .await
        .expect("dropbox adapter connects");

    (server, adapter)
}

pub fn local_adapter() -> AdapterHandle {
    Arc::new(LocalAdapter::new(Validator::new()))
}

pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
