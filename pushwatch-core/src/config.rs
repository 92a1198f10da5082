//! Loading the remote target configuration.
//!
//! # Storage layout
//!
//! ```text
//! <project_root>/
//!   .vscode/
//!     sftp.json      (host, username, password, remotePath, port?, protocol?, transferFiles?)
//! ```
//!
//! `load_at` reads an explicit file; `load_for_project` derives the default
//! location from the project root.

use std::path::{Path, PathBuf};

use crate::error::{io_err, ConfigError};
use crate::types::RemoteConfig;

pub const CONFIG_DIR: &str = ".vscode";
pub const CONFIG_FILE: &str = "sftp.json";

/// `<project_root>/.vscode/sftp.json`. Pure, no I/O.
pub fn default_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR).join(CONFIG_FILE)
}

/// Load and validate a config document.
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with
/// path) for malformed JSON or a missing required key, and
/// `ConfigError::Invalid` for fields that parse but cannot work.
pub fn load_at(path: &Path) -> Result<RemoteConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let config: RemoteConfig = serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&config)?;
    tracing::debug!(
        path = %path.display(),
        host = %config.host,
        protocol = %config.protocol,
        "loaded remote config",
    );
    Ok(config)
}

/// Load `<project_root>/.vscode/sftp.json`, or `override_path` when given.
pub fn load_for_project(
    project_root: &Path,
    override_path: Option<&Path>,
) -> Result<RemoteConfig, ConfigError> {
    match override_path {
        Some(path) => load_at(path),
        None => load_at(&default_config_path(project_root)),
    }
}

/// Fail fast on a project root that cannot be watched.
pub fn check_project_root(project_root: &Path) -> Result<PathBuf, ConfigError> {
    if !project_root.is_dir() {
        return Err(ConfigError::ProjectRootNotDirectory {
            path: project_root.to_path_buf(),
        });
    }
    let absolute = std::path::absolute(project_root).map_err(|e| io_err(project_root, e))?;
    Ok(crate::paths::normalize_lexically(&absolute))
}

fn validate(config: &RemoteConfig) -> Result<(), ConfigError> {
    if config.host.trim().is_empty() {
        return Err(ConfigError::Invalid {
            field: "host",
            reason: "must not be empty".into(),
        });
    }
    if config.username.is_empty() {
        return Err(ConfigError::Invalid {
            field: "username",
            reason: "must not be empty".into(),
        });
    }
    if config.port == Some(0) {
        return Err(ConfigError::Invalid {
            field: "port",
            reason: "must be between 1 and 65535".into(),
        });
    }
    Ok(())
}
