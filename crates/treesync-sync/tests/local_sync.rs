//! End-to-end replication between two local directories

use std::fs;
use std::path::Path;
use std::sync::Arc;

use filetime::FileTime;
use tempfile::TempDir;

use treesync_core::{AdapterHandle, Validator};
use treesync_sync::{LocalAdapter, SyncEngine};

fn adapter() -> AdapterHandle {
    Arc::new(LocalAdapter::new(
        Validator::with_defaults().expect("default patterns compile"),
    ))
}

fn as_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// root/{a.txt, sub/b.txt, __pycache__/c.pyc}
fn seed_source(root: &Path) {
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::create_dir_all(root.join("__pycache__")).unwrap();
    fs::write(root.join("a.txt"), b"alpha").unwrap();
    fs::write(root.join("sub/b.txt"), b"bravo!").unwrap();
    fs::write(root.join("__pycache__/c.pyc"), b"\x00\x01").unwrap();
}

fn listing(root: &Path) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            let rel = path.strip_prefix(root).unwrap().to_string_lossy().into_owned();
            if path.is_dir() {
                stack.push(path);
                out.push(format!("{rel}/"));
            } else {
                out.push(rel);
            }
        }
    }
    out.sort();
    out
}

#[tokio::test]
async fn filtered_tree_is_replicated_with_manifest() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    seed_source(src.path());

    let engine = SyncEngine::new(adapter(), adapter());
    let outcome = engine
        .run(&as_str(src.path()), &as_str(dst.path()))
        .await
        .unwrap();

    assert_eq!(
        listing(dst.path()),
        vec!["a.txt", "structure.json", "sub/", "sub/b.txt"]
    );
    assert_eq!(outcome.tree.children().len(), 2);
    assert!(outcome.result.is_clean());

    let manifest: serde_json::Value =
        serde_json::from_slice(&fs::read(dst.path().join("structure.json")).unwrap()).unwrap();
    let root = &manifest[as_str(dst.path())];
    assert_eq!(root["children"].as_array().unwrap().len(), 2);
    assert_eq!(root["data"]["type"], "Folder");
}

#[tokio::test]
async fn rerun_overwrites_in_place() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    seed_source(src.path());

    let engine = SyncEngine::new(adapter(), adapter());
    let (src_root, dst_root) = (as_str(src.path()), as_str(dst.path()));

    engine.run(&src_root, &dst_root).await.unwrap();
    fs::write(src.path().join("a.txt"), b"alpha, second edition").unwrap();
    let outcome = engine.run(&src_root, &dst_root).await.unwrap();

    assert_eq!(
        listing(dst.path()),
        vec!["a.txt", "structure.json", "sub/", "sub/b.txt"]
    );
    assert_eq!(
        fs::read(dst.path().join("a.txt")).unwrap(),
        b"alpha, second edition"
    );
    assert_eq!(outcome.result.files_written, 2);
}

#[tokio::test]
async fn modification_times_survive_the_copy() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    seed_source(src.path());
    let stamp = FileTime::from_unix_time(1_500_000_000, 0);
    filetime::set_file_mtime(src.path().join("sub/b.txt"), stamp).unwrap();

    let engine = SyncEngine::new(adapter(), adapter());
    let outcome = engine
        .run(&as_str(src.path()), &as_str(dst.path()))
        .await
        .unwrap();

    let copied = fs::metadata(dst.path().join("sub/b.txt")).unwrap();
    assert_eq!(
        FileTime::from_last_modification_time(&copied).unix_seconds(),
        1_500_000_000
    );

    let sub_key = format!("{}/sub", as_str(dst.path()));
    let sub = outcome.tree.children()[&sub_key].as_folder().unwrap();
    let b = sub.children().values().next().unwrap();
    assert_eq!(b.metadata().size, 6);
}

#[tokio::test]
async fn source_root_with_trailing_separator_stays_inside_destination() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    seed_source(src.path());

    let engine = SyncEngine::new(adapter(), adapter());
    let outcome = engine
        .run(&format!("{}/", as_str(src.path())), &as_str(dst.path()))
        .await
        .unwrap();

    assert_eq!(
        listing(dst.path()),
        vec!["a.txt", "structure.json", "sub/", "sub/b.txt"]
    );
    let sub_key = format!("{}/sub", as_str(dst.path()));
    assert!(outcome.tree.children().contains_key(&sub_key));

    let stray = format!("{}sub", as_str(dst.path()));
    assert!(!Path::new(&stray).exists());
}
