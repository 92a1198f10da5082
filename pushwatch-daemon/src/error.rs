use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the watcher runtime. Upload failures never appear here;
/// they are contained in their upload task.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] pushwatch_core::ConfigError),

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("cannot watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("{0} task join failure")]
    Join(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
