//! Google OAuth token handling
//!
//! The adapter consumes an authorized-user token file (the JSON written by
//! Google's client libraries). A still-valid access token is used as is; an
//! expired one is refreshed with its refresh token and the file rewritten.
//! Obtaining the first token interactively is left to external tooling.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use oauth2::basic::BasicClient;
use oauth2::{ClientId, ClientSecret, RefreshToken, TokenResponse, TokenUrl};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use treesync_core::StorageError;

const BACKEND: &str = "gdrive";

/// Google's token endpoint, used when the files do not name one
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens closer than this to expiry are refreshed up front
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Authorized-user token file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizedUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    /// Keys this adapter does not interpret (scopes, account, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AuthorizedUser {
    /// Whether the access token can be used without refreshing
    pub fn is_fresh(&self) -> bool {
        match (&self.token, self.expiry) {
            (Some(_), Some(expiry)) => Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) < expiry,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// OAuth client section of a `client_secrets.json` file
#[derive(Debug, Clone, Deserialize)]
struct ClientSecrets {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

fn no_connection(reason: impl std::fmt::Display) -> StorageError {
    StorageError::no_connection(BACKEND, reason)
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, StorageError> {
    let raw = std::fs::read(path)
        .map_err(|e| no_connection(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_slice(&raw)
        .map_err(|e| no_connection(format!("cannot parse {}: {e}", path.display())))
}

fn load_client_secrets(path: &Path) -> Result<ClientSecrets, StorageError> {
    let file: ClientSecretsFile = read_json(path)?;
    file.installed
        .or(file.web)
        .ok_or_else(|| no_connection(format!("{} has no client section", path.display())))
}

/// Returns a usable access token, refreshing `token_file` when needed
pub async fn access_token(token_file: &Path, credentials_file: &Path) -> Result<String, StorageError> {
    let mut user: AuthorizedUser = read_json(token_file)?;

    if user.is_fresh() {
        debug!("Using stored access token");
        if let Some(token) = user.token {
            return Ok(token);
        }
    }

    let refresh_token = user
        .refresh_token
        .clone()
        .ok_or_else(|| no_connection("access token expired and no refresh token stored"))?;

    let (client_id, client_secret, token_uri) = match (&user.client_id, &user.client_secret) {
        (Some(id), Some(secret)) => (id.clone(), secret.clone(), user.token_uri.clone()),
        _ => {
            let secrets = load_client_secrets(credentials_file)?;
            (secrets.client_id, secrets.client_secret, secrets.token_uri)
        }
    };
    let token_uri = token_uri.unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

    info!("Refreshing access token");
    let client = BasicClient::new(ClientId::new(client_id))
        .set_client_secret(ClientSecret::new(client_secret))
        .set_token_uri(TokenUrl::new(token_uri).map_err(no_connection)?);

    let http_client = reqwest::Client::new();
    let response = client
        .exchange_refresh_token(&RefreshToken::new(refresh_token))
        .request_async(&http_client)
        .await
        .map_err(|e| no_connection(format!("token refresh failed: {e}")))?;

    let access = response.access_token().secret().to_string();
    user.token = Some(access.clone());
    user.expiry = Some(
        response
            .expires_in()
            .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| Utc::now() + Duration::hours(1)),
    );
    if let Some(rotated) = response.refresh_token() {
        user.refresh_token = Some(rotated.secret().to_string());
    }

    let serialized = serde_json::to_vec_pretty(&user).map_err(no_connection)?;
    std::fs::write(token_file, serialized)
        .map_err(|e| no_connection(format!("cannot update {}: {e}", token_file.display())))?;

    info!("Successfully refreshed access token");
    Ok(access)
}
