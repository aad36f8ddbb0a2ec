//! treesync SFTP - SSH File Transfer Protocol storage adapter
//!
//! ## Modules
//!
//! - [`transport`] - The narrow SFTP operation set the adapter relies on
//! - [`session`] - russh-backed implementation of that transport
//! - [`adapter`] - [`StorageAdapter`](treesync_core::StorageAdapter) over any transport
//!
//! One SSH session is opened per adapter and reused for every call of a
//! run. There is no reconnect: a dropped session surfaces as access errors.

pub mod adapter;
pub mod session;
pub mod transport;

pub use adapter::SftpAdapter;
pub use session::RusshTransport;
pub use transport::{RemoteEntry, RemoteStat, SftpTransport, TransportError};
