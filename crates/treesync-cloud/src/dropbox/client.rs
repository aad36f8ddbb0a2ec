//! Dropbox API v2 client
//!
//! RPC endpoints take a JSON body on the API host; content endpoints live on
//! the content host and carry their arguments in the `Dropbox-API-Arg`
//! header, which must be plain ASCII.

use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::http::{HttpClient, HttpError};

const API_ARG_HEADER: &str = "Dropbox-API-Arg";

/// Timestamp layout Dropbox accepts for `client_modified`
const CLIENT_MODIFIED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// File or folder metadata as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropboxMetadata {
    /// `file`, `folder` or `deleted`; absent on some folder results
    #[serde(rename = ".tag", default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path_display: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub server_modified: Option<DateTime<Utc>>,
}

impl DropboxMetadata {
    pub fn is_folder(&self) -> bool {
        self.tag.as_deref() == Some("folder")
    }

    pub fn is_file(&self) -> bool {
        self.tag.as_deref() == Some("file")
    }
}

#[derive(Debug, Deserialize)]
struct ListFolderResult {
    entries: Vec<DropboxMetadata>,
    cursor: String,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct CreateFolderResult {
    metadata: DropboxMetadata,
}

/// Path form expected by the API: `""` for the root, otherwise `/`-prefixed
pub fn api_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Serializes `value` for an HTTP header, escaping every non-ASCII char
pub fn header_json(value: &Value) -> String {
    let raw = value.to_string();
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}

/// Whether an error is the API's "path/not_found" conflict
pub fn is_not_found(err: &HttpError) -> bool {
    match err {
        HttpError::Status { status, body } => {
            *status == StatusCode::CONFLICT && body.contains("not_found")
        }
        _ => false,
    }
}

/// Authenticated Dropbox client
#[derive(Debug, Clone)]
pub struct DropboxClient {
    http: HttpClient,
    api_base: String,
    content_base: String,
    token: String,
}

impl DropboxClient {
    pub fn new(
        http: HttpClient,
        api_base: impl Into<String>,
        content_base: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            content_base: content_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    async fn rpc(&self, endpoint: &str, body: &Value) -> Result<reqwest::Response, HttpError> {
        let request = self
            .http
            .client()
            .post(format!("{}/2/{}", self.api_base, endpoint))
            .bearer_auth(&self.token)
            .json(body);
        self.http.execute(request).await
    }

    /// Display name of the account owning the token
    pub async fn current_account(&self) -> Result<String, HttpError> {
        let account: Value = self
            .rpc("users/get_current_account", &Value::Null)
            .await?
            .json()
            .await?;
        Ok(account["name"]["display_name"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    pub async fn get_metadata(&self, path: &str) -> Result<DropboxMetadata, HttpError> {
        Ok(self
            .rpc("files/get_metadata", &json!({ "path": api_path(path) }))
            .await?
            .json()
            .await?)
    }

    /// Every entry directly inside `path`
    pub async fn list_folder(&self, path: &str) -> Result<Vec<DropboxMetadata>, HttpError> {
        let mut page: ListFolderResult = self
            .rpc(
                "files/list_folder",
                &json!({ "path": api_path(path), "recursive": false }),
            )
            .await?
            .json()
            .await?;
        let mut entries = std::mem::take(&mut page.entries);

        while page.has_more {
            debug!(path, cursor = %page.cursor, "Continuing folder listing");
            page = self
                .rpc(
                    "files/list_folder/continue",
                    &json!({ "cursor": page.cursor }),
                )
                .await?
                .json()
                .await?;
            entries.append(&mut page.entries);
        }

        Ok(entries)
    }

    pub async fn download(&self, path: &str) -> Result<Vec<u8>, HttpError> {
        let request = self
            .http
            .client()
            .post(format!("{}/2/files/download", self.content_base))
            .bearer_auth(&self.token)
            .header(API_ARG_HEADER, header_json(&json!({ "path": api_path(path) })));
        Ok(self.http.execute(request).await?.bytes().await?.to_vec())
    }

    /// Uploads `data` to `path`, overwriting silently
    pub async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        client_modified: Option<DateTime<Utc>>,
    ) -> Result<DropboxMetadata, HttpError> {
        let mut arg = json!({
            "path": api_path(path),
            "mode": "overwrite",
            "mute": true,
        });
        if let Some(modified) = client_modified {
            arg["client_modified"] = json!(modified.format(CLIENT_MODIFIED_FORMAT).to_string());
        }

        let request = self
            .http
            .client()
            .post(format!("{}/2/files/upload", self.content_base))
            .bearer_auth(&self.token)
            .header(API_ARG_HEADER, header_json(&arg))
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(data);
        Ok(self.http.execute(request).await?.json().await?)
    }

    /// Deletes `path`; a missing path is not an error
    pub async fn delete(&self, path: &str) -> Result<(), HttpError> {
        match self
            .rpc("files/delete_v2", &json!({ "path": api_path(path) }))
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!(path, "nothing to delete");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn create_folder(&self, path: &str) -> Result<DropboxMetadata, HttpError> {
        let created: CreateFolderResult = self
            .rpc(
                "files/create_folder_v2",
                &json!({ "path": api_path(path), "autorename": false }),
            )
            .await?
            .json()
            .await?;
        Ok(created.metadata)
    }
}
