//! Error types for pushwatch-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading configuration or building watch
/// groups. Every variant is fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration document did not exist at the expected path.
    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    /// JSON parse error on load, including missing required keys.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A field parsed but holds an unusable value.
    #[error("invalid config field '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },

    /// The project root is missing or is not a directory.
    #[error("project root is not a directory: {path}")]
    ProjectRootNotDirectory { path: PathBuf },

    /// A watched file resolves to a location outside the project root.
    #[error("{path} is outside the project root {root}")]
    OutsideProjectRoot { path: PathBuf, root: PathBuf },

    /// Neither the command line nor `transferFiles` named a file.
    #[error("no files to watch; pass paths on the command line or set transferFiles")]
    NothingToWatch,
}

/// Errors from pure local-to-remote path translation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("{path} does not lie under {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("{path} has no file name")]
    NoFileName { path: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
