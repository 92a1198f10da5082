//! SFTP session over `ssh2`.
//!
//! Password authentication only. Host keys are accepted without pinning;
//! the fingerprint is logged at debug level so it can be compared by hand.
//! Directory probing is a `stat` on the accumulated absolute path.

use std::io::Read;
use std::net::TcpStream;
use std::path::Path;

use ssh2::{ErrorCode, FileStat, HashType, Session, Sftp};

use pushwatch_core::{Protocol, RemoteConfig, RemoteTarget};

use crate::ensure::{ensure_remote_dir, DirSegment, DirectoryProbe};
use crate::error::{connection_err, UploadError};
use crate::session::{resolve_addr, RemoteSession, OPERATION_TIMEOUT};

const DIR_MODE: i32 = 0o755;
/// `LIBSSH2_FX_NO_SUCH_FILE`.
const FX_NO_SUCH_FILE: i32 = 2;

pub struct SftpSession {
    host: String,
    session: Session,
    sftp: Option<Sftp>,
}

impl SftpSession {
    pub fn connect(config: &RemoteConfig) -> Result<Self, UploadError> {
        let host = config.host.clone();
        let port = config.effective_port();
        let addr = resolve_addr(&host, port)?;

        let tcp = TcpStream::connect_timeout(&addr, OPERATION_TIMEOUT)
            .map_err(|e| connection_err(&host, e))?;
        let mut session = Session::new().map_err(|e| connection_err(&host, e))?;
        session.set_timeout(OPERATION_TIMEOUT.as_millis() as u32);
        session.set_tcp_stream(tcp);
        session.handshake().map_err(|e| connection_err(&host, e))?;

        if let Some(hash) = session.host_key_hash(HashType::Sha256) {
            tracing::debug!(
                host = %host,
                fingerprint = %hex::encode(hash),
                "accepting host key without verification",
            );
        }

        let auth_failed = |reason: String| UploadError::Authentication {
            host: host.clone(),
            username: config.username.clone(),
            reason,
        };
        session
            .userauth_password(&config.username, &config.password)
            .map_err(|e| auth_failed(e.to_string()))?;
        if !session.authenticated() {
            return Err(auth_failed("server did not accept the password".into()));
        }

        let sftp = session.sftp().map_err(|e| connection_err(&host, e))?;
        tracing::debug!(host = %host, port, "sftp session open");
        Ok(Self {
            host,
            session,
            sftp: Some(sftp),
        })
    }

    fn sftp(&self) -> Result<&Sftp, UploadError> {
        self.sftp
            .as_ref()
            .ok_or_else(|| connection_err(&self.host, "sftp channel already closed"))
    }
}

/// A missing path is absent; any other `stat` failure is passed through.
fn dir_presence(stat: Result<FileStat, ssh2::Error>) -> Result<bool, ssh2::Error> {
    match stat {
        Ok(stat) => Ok(stat.is_dir()),
        Err(err) if matches!(err.code(), ErrorCode::SFTP(FX_NO_SUCH_FILE)) => Ok(false),
        Err(err) => Err(err),
    }
}

/// SFTP has no working directory; every remote path is made absolute.
fn absolute(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

impl DirectoryProbe for SftpSession {
    fn exists(&mut self, segment: &DirSegment<'_>) -> Result<bool, UploadError> {
        let stat = self.sftp()?.stat(Path::new(segment.path));
        dir_presence(stat).map_err(|e| connection_err(&self.host, e))
    }

    fn create(&mut self, segment: &DirSegment<'_>) -> Result<(), UploadError> {
        self.sftp()?
            .mkdir(Path::new(segment.path), DIR_MODE)
            .map_err(|e| UploadError::RemoteDirectory {
                path: segment.path.to_string(),
                reason: e.to_string(),
            })
    }
}

impl RemoteSession for SftpSession {
    fn protocol(&self) -> Protocol {
        Protocol::Sftp
    }

    fn ensure_dir(&mut self, directory: &str) -> Result<(), UploadError> {
        if directory.is_empty() {
            return Ok(());
        }
        ensure_remote_dir(self, &absolute(directory))
    }

    fn store(&mut self, reader: &mut dyn Read, target: &RemoteTarget) -> Result<u64, UploadError> {
        let remote = absolute(&target.remote_path());
        let transfer_failed = |reason: String| UploadError::Transfer {
            remote: remote.clone(),
            reason,
        };
        let mut file = self
            .sftp()?
            .create(Path::new(&remote))
            .map_err(|e| transfer_failed(e.to_string()))?;
        std::io::copy(reader, &mut file).map_err(|e| transfer_failed(e.to_string()))
    }

    fn close(&mut self) -> Result<(), UploadError> {
        drop(self.sftp.take());
        self.session
            .disconnect(None, "upload finished", None)
            .map_err(|e| connection_err(&self.host, e))
    }
}
