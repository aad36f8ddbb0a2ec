//! Dropbox adapter against a mocked Dropbox v2 API

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, Request, ResponseTemplate};

use treesync_cloud::dropbox::ROOT_ID;
use treesync_core::{AdapterHandle, EntryKind, File, Folder, Metadata, StorageAdapter, StorageError};
use treesync_sync::SyncEngine;

use crate::common;

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(409).set_body_json(json!({
        "error_summary": "path/not_found/...",
        "error": { ".tag": "path", "path": { ".tag": "not_found" } }
    }))
}

fn api_arg(request: &Request) -> serde_json::Value {
    request
        .headers
        .get("Dropbox-API-Arg")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| serde_json::from_str(v).ok())
        .unwrap_or(serde_json::Value::Null)
}

#[tokio::test]
async fn test_root_is_reported_without_a_request() {
    let (_server, dropbox) = common::setup_dropbox_mock().await;

    let root = dropbox.stat_folder("/").await.unwrap();
    assert_eq!(root.id.as_deref(), Some(ROOT_ID));
    assert!(root.modified.is_none());

    assert_eq!(
        dropbox.stat_file("").await.unwrap_err(),
        StorageError::not_a_file("")
    );
}

#[tokio::test]
async fn test_stat_maps_conflicts() {
    let (server, dropbox) = common::setup_dropbox_mock().await;
    Mock::given(method("POST"))
        .and(path("/2/files/get_metadata"))
        .and(body_json(json!({ "path": "/missing.txt" })))
        .respond_with(not_found())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/files/get_metadata"))
        .and(body_json(json!({ "path": "/Backup" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            ".tag": "folder",
            "name": "Backup",
            "path_display": "/Backup",
            "id": "id:backup"
        })))
        .mount(&server)
        .await;

    assert_eq!(
        dropbox.stat_file("/missing.txt").await.unwrap_err(),
        StorageError::NotFound("/missing.txt".to_string())
    );
    assert_eq!(
        dropbox.stat_file("/Backup").await.unwrap_err(),
        StorageError::not_a_file("/Backup")
    );
    let meta = dropbox.stat_folder("/Backup").await.unwrap();
    assert_eq!(meta.id.as_deref(), Some("id:backup"));
}

#[tokio::test]
async fn test_listing_skips_deleted_entries() {
    let (server, dropbox) = common::setup_dropbox_mock().await;
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [
                { ".tag": "file", "name": "b.txt", "id": "id:b", "size": 2,
                  "server_modified": "2024-01-02T03:04:05Z" },
                { ".tag": "deleted", "name": "old.txt" },
                { ".tag": "folder", "name": "a", "id": "id:a" }
            ],
            "cursor": "c1",
            "has_more": false
        })))
        .mount(&server)
        .await;

    let handle: AdapterHandle = Arc::new(dropbox);
    let folder = Folder::with_metadata("/Backup", Metadata::default(), handle.clone(), None);
    let entries = handle.list_children(&folder).await.unwrap();

    let listed: Vec<_> = entries.iter().map(|e| (e.path.as_str(), e.kind)).collect();
    assert_eq!(
        listed,
        vec![("/Backup/a", EntryKind::Folder), ("/Backup/b.txt", EntryKind::File)]
    );
}

#[tokio::test]
async fn test_materialize_replaces_existing_folder() {
    let (server, dropbox) = common::setup_dropbox_mock().await;
    Mock::given(method("POST"))
        .and(path("/2/files/delete_v2"))
        .and(body_json(json!({ "path": "/Backup/sub" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": { ".tag": "folder", "name": "sub", "id": "id:old" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/files/create_folder_v2"))
        .and(body_json(json!({ "path": "/Backup/sub", "autorename": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": { "name": "sub", "id": "id:new", "path_display": "/Backup/sub" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let handle: AdapterHandle = Arc::new(dropbox);
    let source = Folder::with_metadata("/src/sub", Metadata::default(), handle.clone(), None);
    let entry = handle.materialize_folder(&source, "/Backup/sub").await.unwrap();

    assert_eq!(entry.kind, EntryKind::Folder);
    assert_eq!(entry.metadata.id.as_deref(), Some("id:new"));
    assert!(entry.metadata.modified.is_some());
}

#[tokio::test]
async fn test_write_file_uploads_with_overwrite_and_client_modified() {
    let (server, dropbox) = common::setup_dropbox_mock().await;
    Mock::given(method("POST"))
        .and(path("/2/files/upload"))
        .and(|request: &Request| {
            let arg = api_arg(request);
            arg["path"] == "/Backup/a.txt"
                && arg["mode"] == "overwrite"
                && arg["mute"] == true
                && arg["client_modified"] == "2017-07-14T02:40:00Z"
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "a.txt",
            "id": "id:a",
            "size": 5,
            "server_modified": "2024-01-02T03:04:05Z"
        })))
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
    let handle: AdapterHandle = Arc::new(dropbox);
    let destination = Folder::with_metadata("/Backup", Metadata::default(), handle, None);

    let copied = source.copy_to(&destination).await.unwrap();
    assert_eq!(copied.path(), "/Backup/a.txt");
    assert_eq!(copied.id(), Some("id:a"));
    // server metadata, not the source mtime
    assert_eq!(copied.modified().unwrap().timestamp(), 1_704_164_645);
}

#[tokio::test]
async fn test_local_tree_replicates_to_dropbox() {
    let (server, dropbox) = common::setup_dropbox_mock().await;
    Mock::given(method("POST"))
        .and(path("/2/files/delete_v2"))
        .respond_with(not_found())
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/files/create_folder_v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": { "name": "folder", "id": "id:folder" }
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/files/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "uploaded",
            "id": "id:file",
            "size": 5
        })))
        .expect(2)
        .mount(&server)
        .await;

    let src = tempfile::TempDir::new().unwrap();
    std::fs::create_dir_all(src.path().join("sub")).unwrap();
    std::fs::write(src.path().join("a.txt"), b"alpha").unwrap();
    std::fs::write(src.path().join("sub/b.txt"), b"bravo").unwrap();

    let engine = SyncEngine::new(common::local_adapter(), Arc::new(dropbox));
    let outcome = engine
        .run(&common::path_str(src.path()), "/Backup")
        .await
        .unwrap();

    assert_eq!(outcome.tree.path(), "/Backup");
    assert_eq!(outcome.tree.children().len(), 2);
    assert_eq!(outcome.result.files_written, 2);
    assert_eq!(outcome.result.folders_written, 2);
    // no structure.json on Dropbox, which is not a failure
    assert!(outcome.result.is_clean());

    let uploads: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/2/files/upload")
        .map(|r| api_arg(r)["path"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(uploads, vec!["/Backup/a.txt", "/Backup/sub/b.txt"]);
}
