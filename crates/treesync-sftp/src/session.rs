//! russh-backed SFTP transport
//!
//! Opens one SSH connection, authenticates with a private key and starts
//! the `sftp` subsystem on a single channel. Host keys are accepted without
//! verification.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use russh::client;
use russh::keys::{load_secret_key, ssh_key, PrivateKeyWithHashAlg};
use russh_sftp::client::error::Error as SftpError;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::{FileAttributes, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use crate::transport::{RemoteEntry, RemoteStat, SftpTransport, TransportError};

/// SSH client callbacks
struct ClientHandler;

impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Live SFTP session over russh
pub struct RusshTransport {
    sftp: SftpSession,
    // dropping the handle tears the connection down
    _session: client::Handle<ClientHandler>,
}

impl RusshTransport {
    /// Connects to `host:port` and authenticates `username` with `key_file`
    #[instrument(skip(key_file), fields(host = %host, port))]
    pub async fn connect(
        host: &str,
        port: u16,
        username: &str,
        key_file: &Path,
    ) -> Result<Self, TransportError> {
        let key = load_secret_key(key_file, None)
            .map_err(|e| TransportError::Failure(format!("cannot load {}: {e}", key_file.display())))?;

        let config = Arc::new(client::Config::default());
        let mut session = client::connect(config, (host, port), ClientHandler)
            .await
            .map_err(failure)?;
        debug!("ssh connection established");

        let hash_alg = session
            .best_supported_rsa_hash()
            .await
            .map_err(failure)?
            .flatten();
        let auth = session
            .authenticate_publickey(username, PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg))
            .await
            .map_err(failure)?;
        if !auth.success() {
            return Err(TransportError::PermissionDenied(format!(
                "public key rejected for {username}"
            )));
        }

        let channel = session.channel_open_session().await.map_err(failure)?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(failure)?;
        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| map_sftp_error(host, e))?;

        info!(username, "sftp session started");
        Ok(Self {
            sftp,
            _session: session,
        })
    }
}

fn failure(err: russh::Error) -> TransportError {
    TransportError::Failure(err.to_string())
}

fn map_sftp_error(path: &str, err: SftpError) -> TransportError {
    match err {
        SftpError::Status(status) => match status.status_code {
            StatusCode::NoSuchFile => TransportError::NotFound(path.to_string()),
            StatusCode::PermissionDenied => TransportError::PermissionDenied(path.to_string()),
            _ => TransportError::Failure(format!("{path}: {}", status.error_message)),
        },
        other => TransportError::Failure(format!("{path}: {other}")),
    }
}

fn to_remote_stat(attrs: &FileAttributes) -> RemoteStat {
    RemoteStat {
        is_dir: attrs.is_dir(),
        size: attrs.size.unwrap_or(0),
        mtime: attrs.mtime.map(i64::from),
    }
}

#[async_trait]
impl SftpTransport for RusshTransport {
    async fn stat(&self, path: &str) -> Result<RemoteStat, TransportError> {
        let attrs = self
            .sftp
            .metadata(path)
            .await
            .map_err(|e| map_sftp_error(path, e))?;
        Ok(to_remote_stat(&attrs))
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, TransportError> {
        self.sftp
            .read(path)
            .await
            .map_err(|e| map_sftp_error(path, e))
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<(), TransportError> {
        let mut file = self
            .sftp
            .create(path)
            .await
            .map_err(|e| map_sftp_error(path, e))?;
        file.write_all(data)
            .await
            .map_err(|e| TransportError::Failure(format!("{path}: {e}")))?;
        file.shutdown()
            .await
            .map_err(|e| TransportError::Failure(format!("{path}: {e}")))?;
        Ok(())
    }

    async fn mkdir(&self, path: &str) -> Result<(), TransportError> {
        self.sftp
            .create_dir(path)
            .await
            .map_err(|e| map_sftp_error(path, e))
    }

    async fn set_mtime(&self, path: &str, mtime: i64) -> Result<(), TransportError> {
        let secs = u32::try_from(mtime)
            .map_err(|_| TransportError::Failure(format!("{path}: mtime {mtime} out of range")))?;
        let mut attrs = FileAttributes::empty();
        attrs.atime = Some(secs);
        attrs.mtime = Some(secs);
        self.sftp
            .set_metadata(path, attrs)
            .await
            .map_err(|e| map_sftp_error(path, e))
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<RemoteEntry>, TransportError> {
        let listing = self
            .sftp
            .read_dir(path)
            .await
            .map_err(|e| map_sftp_error(path, e))?;

        Ok(listing
            .filter(|entry| entry.file_name() != "." && entry.file_name() != "..")
            .map(|entry| RemoteEntry {
                name: entry.file_name(),
                stat: to_remote_stat(&entry.metadata()),
            })
            .collect())
    }
}
