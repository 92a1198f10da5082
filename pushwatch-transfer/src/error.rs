//! Error types for pushwatch-transfer.

use std::path::PathBuf;

use thiserror::Error;

use pushwatch_core::PathError;

/// Everything that can abort a single upload. None of these are retried and
/// none escape the upload task that produced them.
#[derive(Debug, Error)]
pub enum UploadError {
    /// TCP connect, handshake, or a dropped control connection.
    #[error("connection to {host} failed: {reason}")]
    Connection { host: String, reason: String },

    /// The server rejected the credentials.
    #[error("authentication as {username}@{host} failed: {reason}")]
    Authentication {
        host: String,
        username: String,
        reason: String,
    },

    /// A remote directory segment could not be created.
    #[error("cannot create remote directory {path}: {reason}")]
    RemoteDirectory { path: String, reason: String },

    /// Directories exist but storing the file failed.
    #[error("transfer to {remote} failed: {reason}")]
    Transfer { remote: String, reason: String },

    /// The local file could not be mapped onto a remote path.
    #[error("path error: {0}")]
    Path(#[from] PathError),

    /// Reading the local file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`UploadError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> UploadError {
    UploadError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn connection_err(host: &str, reason: impl ToString) -> UploadError {
    UploadError::Connection {
        host: host.to_string(),
        reason: reason.to_string(),
    }
}
