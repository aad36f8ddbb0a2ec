//! `structure.json` manifest
//!
//! The manifest is a write-only description of a replicated tree. Each
//! folder renders as a single-key object mapping its path to its `data`
//! block and its `children`; files render as a bare data block.
//!
//! ```json
//! {
//!   "/dst": {
//!     "data": { "type": "Folder", "name": "dst", "size": 0, "modified": null },
//!     "children": [
//!       { "type": "File", "name": "a.txt", "size": 3, "modified": "...", "format": "txt" }
//!     ]
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::record::{File, Folder, Metadata, Record};

/// File name the manifest is stored under
pub const STRUCTURE_FILE_NAME: &str = "structure.json";

/// Per-record data block
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RecordData {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl RecordData {
    fn new(kind: &'static str, name: &str, metadata: &Metadata) -> Self {
        Self {
            kind,
            name: name.to_string(),
            size: metadata.size,
            modified: metadata.modified,
            id: metadata.id.clone(),
            format: None,
        }
    }

    pub fn of_file(file: &File) -> Self {
        Self {
            format: Some(file.format().to_string()),
            ..Self::new("File", file.name(), file.metadata())
        }
    }

    pub fn of_folder(folder: &Folder) -> Self {
        Self::new("Folder", folder.name(), folder.metadata())
    }
}

/// A folder node: data block plus rendered children
#[derive(Debug, Clone, Serialize)]
pub struct FolderNode {
    pub data: RecordData,
    pub children: Vec<Node>,
}

/// Either a nested folder (`{path: FolderNode}`) or a file data block
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Node {
    Folder(BTreeMap<String, FolderNode>),
    File(RecordData),
}

/// Builds the manifest tree rooted at `folder`
pub fn structure_of(folder: &Folder) -> BTreeMap<String, FolderNode> {
    let children = folder
        .children()
        .values()
        .map(|record| match record {
            Record::File(file) => Node::File(RecordData::of_file(file)),
            Record::Folder(sub) => Node::Folder(structure_of(sub)),
        })
        .collect();

    let mut root = BTreeMap::new();
    root.insert(
        folder.path().to_string(),
        FolderNode {
            data: RecordData::of_folder(folder),
            children,
        },
    );
    root
}

/// Serializes the manifest of `folder` as pretty-printed JSON
pub fn render(folder: &Folder) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec_pretty(&structure_of(folder))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::domain::errors::StorageError;
    use crate::domain::record::Entry;
    use crate::ports::storage_adapter::{AdapterHandle, StorageAdapter};
    use crate::validation::Validator;

    struct NullAdapter(Validator);

    #[async_trait]
    impl StorageAdapter for NullAdapter {
        fn name(&self) -> &'static str {
            "null"
        }
        fn validator(&self) -> &Validator {
            &self.0
        }
        async fn stat_file(&self, path: &str) -> Result<Metadata, StorageError> {
            Err(StorageError::NotFound(path.to_string()))
        }
        async fn stat_folder(&self, path: &str) -> Result<Metadata, StorageError> {
            Err(StorageError::NotFound(path.to_string()))
        }
        async fn read_file(&self, file: &File) -> Result<Vec<u8>, StorageError> {
            Err(StorageError::NotFound(file.path().to_string()))
        }
        async fn write_file(&self, source: &File, _: &Folder) -> Result<Entry, StorageError> {
            Err(StorageError::NotFound(source.path().to_string()))
        }
        async fn list_children(&self, _: &Folder) -> Result<Vec<Entry>, StorageError> {
            Ok(Vec::new())
        }
        async fn materialize_folder(&self, _: &Folder, path: &str) -> Result<Entry, StorageError> {
            Err(StorageError::NotFound(path.to_string()))
        }
    }

    fn tree() -> Folder {
        let handler: AdapterHandle = Arc::new(NullAdapter(Validator::new()));
        let mut root = Folder::with_metadata("/dst", Metadata::default(), handler.clone(), None);
        root.add_child(Record::File(File::with_metadata(
            "/dst/a.txt",
            Metadata {
                size: 3,
                modified: None,
                id: Some("42".to_string()),
            },
            handler.clone(),
        )));

        let mut sub = Folder::with_metadata("/dst/sub", Metadata::default(), handler.clone(), None);
        sub.add_child(Record::File(File::with_metadata(
            "/dst/sub/b.txt",
            Metadata::default(),
            handler,
        )));
        root.add_child(Record::Folder(sub));
        root
    }

    #[test]
    fn test_manifest_shape() {
        let json: Value = serde_json::from_slice(&render(&tree()).unwrap()).unwrap();

        let root = &json["/dst"];
        assert_eq!(root["data"]["type"], "Folder");
        assert_eq!(root["data"]["name"], "dst");
        assert!(root["data"].get("format").is_none());

        let children = root["children"].as_array().unwrap();
        assert_eq!(children.len(), 2);

        let file = &children[0];
        assert_eq!(file["type"], "File");
        assert_eq!(file["name"], "a.txt");
        assert_eq!(file["size"], 3);
        assert_eq!(file["format"], "txt");
        assert_eq!(file["id"], "42");
        assert!(file["modified"].is_null());

        let sub = &children[1]["/dst/sub"];
        assert_eq!(sub["data"]["type"], "Folder");
        assert_eq!(sub["children"][0]["name"], "b.txt");
        assert!(sub["children"][0].get("id").is_none());
    }
}
