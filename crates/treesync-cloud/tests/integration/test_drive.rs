//! Google Drive adapter against a mocked Drive v3 API

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use treesync_cloud::drive::DriveClient;
use treesync_cloud::{DriveAdapter, HttpClient};
use treesync_core::{
    AdapterHandle, EntryKind, File, Folder, Metadata, StorageAdapter, StorageError, Validator,
};

use crate::common::{self, drive_file, drive_folder, DRIVE_ROOT_ID};

#[tokio::test]
async fn test_stat_folder_walks_each_segment() {
    let (server, drive) = common::setup_drive_mock().await;
    common::mount_drive_find(&server, DRIVE_ROOT_ID, "backup", json!([drive_folder("b1", "backup")])).await;
    common::mount_drive_find(&server, "b1", "daily", json!([drive_folder("d1", "daily")])).await;

    let meta = drive.stat_folder("/backup/daily").await.unwrap();
    assert_eq!(meta.id.as_deref(), Some("d1"));

    let root = drive.stat_folder("/").await.unwrap();
    assert_eq!(root.id.as_deref(), Some(DRIVE_ROOT_ID));
}

#[tokio::test]
async fn test_stat_reports_missing_and_wrong_kind() {
    let (server, drive) = common::setup_drive_mock().await;
    common::mount_drive_find(&server, DRIVE_ROOT_ID, "backup", json!([drive_folder("b1", "backup")])).await;
    common::mount_drive_find(&server, "b1", "gone.txt", json!([])).await;

    assert_eq!(
        drive.stat_file("/backup/gone.txt").await.unwrap_err(),
        StorageError::NotFound("/backup/gone.txt".to_string())
    );
    assert_eq!(
        drive.stat_file("/backup").await.unwrap_err(),
        StorageError::not_a_file("/backup")
    );
}

#[tokio::test]
async fn test_enumeration_applies_filters() {
    let validator = Validator::with_defaults().unwrap();
    let (server, drive) = common::setup_drive_mock_with(validator).await;
    common::mount_drive_find(&server, DRIVE_ROOT_ID, "backup", json!([drive_folder("b1", "backup")])).await;
    common::mount_drive_list(
        &server,
        "b1",
        json!([
            drive_file("f1", "a.txt", 5),
            drive_file("f2", "module.pyc", 9),
            drive_folder("n1", "node_modules"),
            drive_folder("s1", "sub"),
        ]),
    )
    .await;
    common::mount_drive_list(&server, "s1", json!([drive_file("f3", "b.txt", 6)])).await;

    let handle: AdapterHandle = Arc::new(drive);
    let mut root = Folder::open("/backup", handle, Some("/backup".to_string()))
        .await
        .unwrap();
    root.load_content().await.unwrap();

    let paths: Vec<_> = root.children().keys().cloned().collect();
    assert_eq!(paths, vec!["/backup/a.txt", "/backup/sub"]);

    let sub = root.children()["/backup/sub"].as_folder().unwrap();
    let b = &sub.children()["/backup/sub/b.txt"];
    assert_eq!(b.kind(), EntryKind::File);
    assert_eq!(b.metadata().size, 6);
    assert_eq!(b.metadata().id.as_deref(), Some("f3"));
}

#[tokio::test]
async fn test_materialize_reuses_first_folder_and_creates_missing() {
    let (server, drive) = common::setup_drive_mock().await;
    common::mount_drive_find(
        &server,
        DRIVE_ROOT_ID,
        "backup",
        json!([drive_file("x1", "backup", 1), drive_folder("b1", "backup"), drive_folder("b2", "backup")]),
    )
    .await;
    common::mount_drive_find(&server, "b1", "new", json!([])).await;
    Mock::given(method("POST"))
        .and(path("/files"))
        .and(body_partial_json(json!({ "name": "new", "parents": ["b1"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(drive_folder("n1", "new")))
        .expect(1)
        .mount(&server)
        .await;

    let handle: AdapterHandle = Arc::new(drive);
    let source = Folder::with_metadata("/src/new", Metadata::default(), handle.clone(), None);
    let entry = handle.materialize_folder(&source, "/backup/new").await.unwrap();

    assert_eq!(entry.kind, EntryKind::Folder);
    assert_eq!(entry.path, "/backup/new");
    assert_eq!(entry.metadata.id.as_deref(), Some("n1"));
}

#[tokio::test]
async fn test_write_file_replaces_previous_version() {
    let (server, drive) = common::setup_drive_mock().await;
    common::mount_drive_find(
        &server,
        "b1",
        "a.txt",
        json!([drive_file("old", "a.txt", 3), drive_folder("keep", "a.txt")]),
    )
    .await;
    Mock::given(method("DELETE"))
        .and(path("/files/old"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/files/keep"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files"))
        .and(body_partial_json(json!({
            "name": "a.txt",
            "parents": ["b1"],
            "modifiedTime": "2017-07-14T02:40:00+00:00"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "new" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/upload/files/new"))
        .and(query_param("uploadType", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_json(drive_file("new", "a.txt", 5)))
        .expect(1)
        .mount(&server)
        .await;

    let src = tempfile::TempDir::new().unwrap();
    let src_file = src.path().join("a.txt");
    std::fs::write(&src_file, b"alpha").unwrap();
    filetime::set_file_mtime(&src_file, filetime::FileTime::from_unix_time(1_500_000_000, 0))
        .unwrap();

    let source = File::open(common::path_str(&src_file), common::local_adapter())
        .await
        .unwrap();
    let handle: AdapterHandle = Arc::new(drive);
    let destination = Folder::with_metadata(
        "/backup",
        Metadata {
            id: Some("b1".to_string()),
            ..Metadata::default()
        },
        handle,
        None,
    );

    let copied = source.copy_to(&destination).await.unwrap();
    assert_eq!(copied.path(), "/backup/a.txt");
    assert_eq!(copied.id(), Some("new"));
    assert_eq!(copied.size(), 5);
}

#[tokio::test]
async fn test_structure_dump_replaces_existing_manifest() {
    let (server, drive) = common::setup_drive_mock().await;
    common::mount_drive_find(
        &server,
        "b1",
        "structure.json",
        json!([drive_file("m-old", "structure.json", 10)]),
    )
    .await;
    Mock::given(method("DELETE"))
        .and(path("/files/m-old"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "m-new" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/upload/files/m-new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(drive_file("m-new", "structure.json", 2)))
        .expect(1)
        .mount(&server)
        .await;

    let handle: AdapterHandle = Arc::new(drive);
    let folder = Folder::with_metadata(
        "/backup",
        Metadata {
            id: Some("b1".to_string()),
            ..Metadata::default()
        },
        handle.clone(),
        None,
    );

    let entry = handle.upload_structure_dump(&folder, b"{}").await.unwrap();
    assert_eq!(entry.path, "/backup/structure.json");
    assert_eq!(entry.metadata.id.as_deref(), Some("m-new"));
}

#[tokio::test]
async fn test_rejected_token_is_no_connection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/root"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
        .mount(&server)
        .await;

    let client = DriveClient::new(HttpClient::new(0), server.uri(), server.uri(), "expired");
    let err = DriveAdapter::with_client(client, Validator::new())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, StorageError::NoConnection { .. }));
}
