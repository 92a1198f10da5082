//! Protocol-neutral session capabilities.
//!
//! The uploader only ever sees `dyn RemoteSession` obtained from a
//! [`SessionFactory`]; FTP and SFTP specifics stay in their own modules.

use std::io::Read;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use pushwatch_core::{Protocol, RemoteConfig, RemoteTarget};

use crate::error::{connection_err, UploadError};
use crate::ftp::FtpSession;
use crate::sftp::SftpSession;

/// Connect and per-operation timeout applied by both clients.
pub const OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// One authenticated connection, scoped to a single upload.
pub trait RemoteSession {
    fn protocol(&self) -> Protocol;

    /// Make every segment of `directory` exist on the server.
    fn ensure_dir(&mut self, directory: &str) -> Result<(), UploadError>;

    /// Write `reader` to `target`, overwriting any existing file. Returns the
    /// number of bytes stored. Must be preceded by
    /// `ensure_dir(&target.directory)`.
    fn store(&mut self, reader: &mut dyn Read, target: &RemoteTarget) -> Result<u64, UploadError>;

    /// Disconnect. The session is unusable afterwards.
    fn close(&mut self) -> Result<(), UploadError>;
}

/// Opens a fresh session for each upload.
pub trait SessionFactory: Send + Sync {
    fn open(&self, config: &RemoteConfig) -> Result<Box<dyn RemoteSession>, UploadError>;
}

/// Real network sessions, picked by `config.protocol`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProtocolSessionFactory;

impl SessionFactory for ProtocolSessionFactory {
    fn open(&self, config: &RemoteConfig) -> Result<Box<dyn RemoteSession>, UploadError> {
        match config.protocol {
            Protocol::Sftp => Ok(Box::new(SftpSession::connect(config)?)),
            Protocol::Ftp => Ok(Box::new(FtpSession::connect(config)?)),
        }
    }
}

pub(crate) fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr, UploadError> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| connection_err(host, e))?
        .next()
        .ok_or_else(|| connection_err(host, "host resolved to no addresses"))
}
