//! Plain FTP session over `suppaftp`.
//!
//! Directories are probed with `CWD`: a rejected `CWD` means the segment is
//! absent, so it is created with `MKD` and entered. The walk leaves the
//! leaf directory as the working directory, which is where `STOR` writes.
//!
//! With a non-empty remote base every remote directory is taken from `/`, as
//! SFTP does. Only an empty base works relative to the login directory.

use std::io::Read;

use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};

use pushwatch_core::{Protocol, RemoteConfig, RemoteTarget};

use crate::ensure::{ensure_remote_dir, DirSegment, DirectoryProbe};
use crate::error::{connection_err, UploadError};
use crate::session::{resolve_addr, RemoteSession, OPERATION_TIMEOUT};

pub struct FtpSession {
    host: String,
    stream: FtpStream,
    /// Directory most recently entered by `ensure_dir`.
    cwd: Option<String>,
    /// Set when the config names a remote base; remote paths start at `/`.
    rooted: bool,
}

impl FtpSession {
    /// Connect, log in, and switch to binary mode.
    pub fn connect(config: &RemoteConfig) -> Result<Self, UploadError> {
        let host = config.host.clone();
        let addr = resolve_addr(&host, config.effective_port())?;

        let mut stream = FtpStream::connect_timeout(addr, OPERATION_TIMEOUT)
            .map_err(|e| connection_err(&host, e))?;
        if let Err(err) = stream.get_ref().set_read_timeout(Some(OPERATION_TIMEOUT)) {
            tracing::debug!(host = %host, error = %err, "could not set FTP read timeout");
        }

        stream
            .login(config.username.as_str(), config.password.as_str())
            .map_err(|e| match e {
                FtpError::UnexpectedResponse(_) => UploadError::Authentication {
                    host: host.clone(),
                    username: config.username.clone(),
                    reason: e.to_string(),
                },
                other => connection_err(&host, other),
            })?;
        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| connection_err(&host, e))?;

        tracing::debug!(host = %host, port = config.effective_port(), "ftp session open");
        Ok(Self {
            host,
            stream,
            cwd: None,
            rooted: !config.remote_path.is_empty(),
        })
    }

    fn rooted_path(&self, path: &str) -> String {
        if self.rooted && !path.is_empty() && !path.starts_with('/') {
            format!("/{path}")
        } else {
            path.to_string()
        }
    }

    fn change_dir(&mut self, dir: &str) -> Result<bool, UploadError> {
        match self.stream.cwd(dir) {
            Ok(()) => Ok(true),
            Err(FtpError::UnexpectedResponse(_)) => Ok(false),
            Err(err) => Err(connection_err(&self.host, err)),
        }
    }
}

impl DirectoryProbe for FtpSession {
    fn start(&mut self, absolute: bool) -> Result<(), UploadError> {
        if absolute && !self.change_dir("/")? {
            return Err(UploadError::RemoteDirectory {
                path: "/".into(),
                reason: "server refused CWD /".into(),
            });
        }
        Ok(())
    }

    fn exists(&mut self, segment: &DirSegment<'_>) -> Result<bool, UploadError> {
        self.change_dir(segment.name)
    }

    fn create(&mut self, segment: &DirSegment<'_>) -> Result<(), UploadError> {
        let failed = |reason: String| UploadError::RemoteDirectory {
            path: segment.path.to_string(),
            reason,
        };
        match self.stream.mkdir(segment.name) {
            Ok(()) => {}
            Err(err @ FtpError::UnexpectedResponse(_)) => return Err(failed(err.to_string())),
            Err(err) => return Err(connection_err(&self.host, err)),
        }
        if self.change_dir(segment.name)? {
            Ok(())
        } else {
            Err(failed("created but cannot enter".into()))
        }
    }
}

impl RemoteSession for FtpSession {
    fn protocol(&self) -> Protocol {
        Protocol::Ftp
    }

    fn ensure_dir(&mut self, directory: &str) -> Result<(), UploadError> {
        self.cwd = None;
        let rooted = self.rooted_path(directory);
        ensure_remote_dir(self, &rooted)?;
        self.cwd = Some(directory.to_string());
        Ok(())
    }

    fn store(&mut self, mut reader: &mut dyn Read, target: &RemoteTarget) -> Result<u64, UploadError> {
        let name = if self.cwd.as_deref() == Some(target.directory.as_str()) {
            target.filename.clone()
        } else {
            self.rooted_path(&target.remote_path())
        };
        self.stream
            .put_file(name.as_str(), &mut reader)
            .map_err(|e| UploadError::Transfer {
                remote: target.remote_path(),
                reason: e.to_string(),
            })
    }

    fn close(&mut self) -> Result<(), UploadError> {
        self.cwd = None;
        self.stream
            .quit()
            .map_err(|e| connection_err(&self.host, e))
    }
}
