//! pushwatch core library: remote config, path translation, watch groups.
//!
//! - [`types`]: [`RemoteConfig`], [`Protocol`], [`RemoteTarget`]
//! - [`config`]: load / validate `.vscode/sftp.json`
//! - [`paths`]: pure local-to-remote path translation
//! - [`groups`]: partition watched files into [`WatchGroup`]s
//! - [`error`]: [`ConfigError`], [`PathError`]

pub mod config;
pub mod error;
pub mod groups;
pub mod paths;
pub mod types;

pub use error::{ConfigError, PathError};
pub use groups::{build_watch_groups, collect_watch_paths, WatchGroup};
pub use paths::translate;
pub use types::{Protocol, RemoteConfig, RemoteTarget};
