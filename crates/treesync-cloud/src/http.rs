//! Shared HTTP execution
//!
//! [`HttpClient`] wraps `reqwest::Client` and turns non-success statuses into
//! [`HttpError`]. Retries are opt-in: with `max_retries = 0` every request is
//! sent exactly once. When enabled, `429 Too Many Requests` and `5xx`
//! responses are retried, honouring `Retry-After` when the server sends it.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use thiserror::Error;
use tracing::{info, warn};

use treesync_core::StorageError;

/// Wait used when a throttled response carries no usable `Retry-After`
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Base delay for server errors, doubled per attempt
const BASE_BACKOFF: Duration = Duration::from_secs(1);

/// Failure of a single HTTP exchange
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request never produced a response
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The request body could not be replayed for a retry
    #[error("request cannot be retried")]
    NotCloneable,
}

impl HttpError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Maps a lookup failure: `404` means nothing lives at `path`
    pub fn into_lookup_error(self, path: &str) -> StorageError {
        match self.status() {
            Some(StatusCode::NOT_FOUND) => StorageError::NotFound(path.to_string()),
            _ => StorageError::access(path, self),
        }
    }

    /// Maps a content operation failure, always an access error
    pub fn into_access_error(self, path: &str) -> StorageError {
        StorageError::access(path, self)
    }
}

/// Thin retrying wrapper around `reqwest::Client`
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
}

impl HttpClient {
    pub fn new(max_retries: u32) -> Self {
        Self {
            client: Client::new(),
            max_retries,
        }
    }

    /// The underlying client, for building requests
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Sends `request`, retrying throttled and failed attempts when enabled
    ///
    /// Returns the response only when its status is a success.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response, HttpError> {
        let mut attempt = 0;
        loop {
            let current = if attempt < self.max_retries {
                request.try_clone().ok_or(HttpError::NotCloneable)?
            } else {
                return check_status(request.send().await?).await;
            };

            let response = current.send().await?;
            let status = response.status();

            let wait = if status == StatusCode::TOO_MANY_REQUESTS {
                response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
                    .unwrap_or(DEFAULT_RETRY_AFTER)
            } else if status.is_server_error() {
                BASE_BACKOFF * 2u32.saturating_pow(attempt)
            } else {
                if attempt > 0 {
                    info!(attempt, "Request succeeded after retry");
                }
                return check_status(response).await;
            };

            info!(
                url = %response.url(),
                %status,
                attempt,
                retry_after_ms = wait.as_millis() as u64,
                "Backing off before retry"
            );
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}

async fn check_status(response: Response) -> Result<Response, HttpError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(HttpError::Status { status, body })
}

/// Parses a `Retry-After` value: integer seconds or an HTTP date
///
/// Dates more than an hour away, in the past, or unparseable fall back to
/// `default`.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let now = chrono::Utc::now();
        let target = date.with_timezone(&chrono::Utc);
        if target > now {
            let secs = (target - now).num_seconds();
            if let Ok(secs) = u64::try_from(secs) {
                if secs <= 3600 {
                    return Duration::from_secs(secs);
                }
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}
