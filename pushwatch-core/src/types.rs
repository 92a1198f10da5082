//! Domain types shared by every pushwatch crate.
//!
//! Local filesystem paths are `PathBuf`; remote paths are POSIX `String`s,
//! always `/`-separated regardless of the local platform.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::paths::join_remote;

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

/// Transfer protocol for a remote target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Ftp,
    Sftp,
}

impl Protocol {
    /// Map the raw `protocol` config value onto a variant.
    ///
    /// Only `sftp` (any case) selects SFTP. Anything else, including an
    /// absent field, falls back to FTP.
    pub fn from_config_value(value: Option<&str>) -> Self {
        let Some(raw) = value else {
            return Protocol::Ftp;
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "sftp" => Protocol::Sftp,
            "ftp" => Protocol::Ftp,
            other => {
                tracing::warn!(protocol = other, "unrecognized protocol, using ftp");
                Protocol::Ftp
            }
        }
    }

    /// Well-known port used when the config omits `port`.
    pub fn default_port(self) -> u16 {
        match self {
            Protocol::Ftp => 21,
            Protocol::Sftp => 22,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Ftp => write!(f, "ftp"),
            Protocol::Sftp => write!(f, "sftp"),
        }
    }
}

impl<'de> Deserialize<'de> for Protocol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Protocol::from_config_value(raw.as_deref()))
    }
}

// ---------------------------------------------------------------------------
// RemoteConfig
// ---------------------------------------------------------------------------

/// One remote target, as read from `.vscode/sftp.json`.
///
/// Never mutated after load. Watch groups receive derived copies from
/// [`RemoteConfig::for_subdirectory`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    pub host: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default)]
    pub protocol: Protocol,
    /// POSIX base path on the server for every upload.
    pub remote_path: String,
    /// Project-root-relative files watched in addition to CLI arguments.
    #[serde(default)]
    pub transfer_files: Vec<String>,
}

impl RemoteConfig {
    /// `port`, or the protocol's well-known port.
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.protocol.default_port())
    }

    /// Copy of this config rebased onto a subdirectory of the project root.
    ///
    /// `rel_posix` is the subdirectory relative to the project root in POSIX
    /// form. An empty value returns an unchanged copy.
    pub fn for_subdirectory(&self, rel_posix: &str) -> Self {
        let rel = rel_posix.trim_matches('/');
        if rel.is_empty() || rel == "." {
            return self.clone();
        }
        Self {
            remote_path: join_remote(&self.remote_path, rel),
            ..self.clone()
        }
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("remote_path", &self.remote_path)
            .field("transfer_files", &self.transfer_files)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// RemoteTarget
// ---------------------------------------------------------------------------

/// Where a local file lands on the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RemoteTarget {
    /// Remote directory, never ending in `/`. Empty means the session's
    /// starting directory.
    pub directory: String,
    pub filename: String,
}

impl RemoteTarget {
    pub fn remote_path(&self) -> String {
        if self.directory.is_empty() {
            self.filename.clone()
        } else {
            format!("{}/{}", self.directory, self.filename)
        }
    }
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.remote_path())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
