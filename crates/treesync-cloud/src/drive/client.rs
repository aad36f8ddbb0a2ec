//! Google Drive v3 REST client
//!
//! Drive addresses everything by id; names are not unique inside a folder.
//! The client exposes the handful of calls the adapter needs to emulate a
//! path-addressed tree on top of that.

use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::http::{HttpClient, HttpError};

/// MIME type Drive uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Fields requested for every file resource
const FILE_FIELDS: &str = "id,name,mimeType,size,modifiedTime";

/// Drive alias for the root folder of the authenticated user
const ROOT_ALIAS: &str = "root";

/// Page size for folder listings
const PAGE_SIZE: &str = "1000";

/// Subset of the Drive file resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    /// Drive serializes int64 values as strings; folders have none
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    pub fn size_bytes(&self) -> u64 {
        self.size
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Escapes a value for use inside a single-quoted Drive query string
pub fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Authenticated Drive API client
#[derive(Debug, Clone)]
pub struct DriveClient {
    http: HttpClient,
    api_base: String,
    upload_base: String,
    token: String,
}

impl DriveClient {
    pub fn new(
        http: HttpClient,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            upload_base: upload_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn files_url(&self) -> String {
        format!("{}/files", self.api_base)
    }

    fn file_url(&self, id: &str) -> String {
        format!("{}/files/{}", self.api_base, id)
    }

    /// The "My Drive" root folder
    pub async fn root(&self) -> Result<DriveFile, HttpError> {
        self.get(ROOT_ALIAS).await
    }

    /// File resource by id
    pub async fn get(&self, id: &str) -> Result<DriveFile, HttpError> {
        let request = self
            .http
            .client()
            .get(self.file_url(id))
            .bearer_auth(&self.token)
            .query(&[("fields", FILE_FIELDS)]);
        Ok(self.http.execute(request).await?.json().await?)
    }

    /// Non-trashed children of `parent_id` named exactly `name`
    pub async fn find(&self, parent_id: &str, name: &str) -> Result<Vec<DriveFile>, HttpError> {
        let query = format!(
            "name = '{}' and '{}' in parents and trashed = false",
            escape_query_value(name),
            escape_query_value(parent_id)
        );
        self.query(&query).await
    }

    /// Every non-trashed child of `parent_id`
    pub async fn list(&self, parent_id: &str) -> Result<Vec<DriveFile>, HttpError> {
        let query = format!(
            "'{}' in parents and trashed = false",
            escape_query_value(parent_id)
        );
        self.query(&query).await
    }

    async fn query(&self, query: &str) -> Result<Vec<DriveFile>, HttpError> {
        let fields = format!("nextPageToken,files({FILE_FIELDS})");
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.to_string()),
                ("fields", fields.clone()),
                ("pageSize", PAGE_SIZE.to_string()),
            ];
            if let Some(token) = page_token.take() {
                params.push(("pageToken", token));
            }

            let request = self
                .http
                .client()
                .get(self.files_url())
                .bearer_auth(&self.token)
                .query(&params);
            let page: FileList = self.http.execute(request).await?.json().await?;
            debug!(query, count = page.files.len(), "Fetched listing page");
            files.extend(page.files);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(files)
    }

    /// Creates a folder named `name` under `parent_id`
    pub async fn create_folder(
        &self,
        parent_id: &str,
        name: &str,
        modified: Option<DateTime<Utc>>,
    ) -> Result<DriveFile, HttpError> {
        let mut body = json!({
            "name": name,
            "parents": [parent_id],
            "mimeType": FOLDER_MIME_TYPE,
        });
        if let Some(modified) = modified {
            body["modifiedTime"] = json!(modified.to_rfc3339());
        }

        let request = self
            .http
            .client()
            .post(self.files_url())
            .bearer_auth(&self.token)
            .query(&[("fields", FILE_FIELDS)])
            .json(&body);
        Ok(self.http.execute(request).await?.json().await?)
    }

    /// Creates a file under `parent_id`, then uploads its content
    pub async fn create_file(
        &self,
        parent_id: &str,
        name: &str,
        mime_type: &str,
        modified: Option<DateTime<Utc>>,
        data: Vec<u8>,
    ) -> Result<DriveFile, HttpError> {
        let mut body = json!({
            "name": name,
            "parents": [parent_id],
        });
        if let Some(modified) = modified {
            body["modifiedTime"] = json!(modified.to_rfc3339());
        }

        let request = self
            .http
            .client()
            .post(self.files_url())
            .bearer_auth(&self.token)
            .query(&[("fields", "id")])
            .json(&body);
        let created: DriveFile = self.http.execute(request).await?.json().await?;

        let request = self
            .http
            .client()
            .patch(format!("{}/files/{}", self.upload_base, created.id))
            .bearer_auth(&self.token)
            .query(&[("uploadType", "media"), ("fields", FILE_FIELDS)])
            .header(CONTENT_TYPE, mime_type)
            .body(data);
        Ok(self.http.execute(request).await?.json().await?)
    }

    /// Permanently deletes `id`
    pub async fn delete(&self, id: &str) -> Result<(), HttpError> {
        let request = self
            .http
            .client()
            .delete(self.file_url(id))
            .bearer_auth(&self.token);
        self.http.execute(request).await?;
        Ok(())
    }

    /// Content of the file `id`
    pub async fn download(&self, id: &str) -> Result<Vec<u8>, HttpError> {
        let request = self
            .http
            .client()
            .get(self.file_url(id))
            .bearer_auth(&self.token)
            .query(&[("alt", "media")]);
        Ok(self.http.execute(request).await?.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> DriveClient {
        DriveClient::new(
            HttpClient::new(0),
            server.uri(),
            format!("{}/upload", server.uri()),
            "test-token",
        )
    }

    #[test]
    fn test_escape_query_value() {
        assert_eq!(escape_query_value("plain"), "plain");
        assert_eq!(escape_query_value("it's"), "it\\'s");
        assert_eq!(escape_query_value("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_size_is_parsed_from_string() {
        let file: DriveFile = serde_json::from_value(json!({
            "id": "1",
            "name": "a.txt",
            "mimeType": "text/plain",
            "size": "42",
            "modifiedTime": "2024-01-02T03:04:05.000Z"
        }))
        .unwrap();
        assert_eq!(file.size_bytes(), 42);
        assert!(!file.is_folder());
        assert_eq!(file.modified_time.unwrap().timestamp(), 1_704_164_645);
    }

    #[tokio::test]
    async fn test_list_follows_page_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": [{"id": "2", "name": "b", "mimeType": "text/plain"}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": [{"id": "1", "name": "a", "mimeType": "text/plain"}],
                "nextPageToken": "p2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let files = client(&server).list("parent").await.unwrap();
        let ids: Vec<_> = files.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_find_builds_escaped_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .and(query_param(
                "q",
                "name = 'it\\'s' and 'p1' in parents and trashed = false",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": []})))
            .expect(1)
            .mount(&server)
            .await;

        let found = client(&server).find("p1", "it's").await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_create_file_uploads_media() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "new"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/upload/files/new"))
            .and(query_param("uploadType", "media"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "new",
                "name": "a.txt",
                "mimeType": "application/octet-stream",
                "size": "5"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let file = client(&server)
            .create_file("p1", "a.txt", "application/octet-stream", None, b"alpha".to_vec())
            .await
            .unwrap();
        assert_eq!(file.id, "new");
        assert_eq!(file.size_bytes(), 5);
    }
}
