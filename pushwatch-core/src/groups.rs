//! Watch groups: target files partitioned by their parent directory.
//!
//! Each group is watched non-recursively and carries its own copy of the
//! remote config, rebased so that `translate(group.directory, file, ..)`
//! lands files under the right nested remote directory.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ConfigError;
use crate::paths::{resolve_under, to_posix};
use crate::types::RemoteConfig;

/// Sibling files watched and uploaded together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchGroup {
    /// Absolute local directory; the exact parent of every target.
    pub directory: PathBuf,
    pub target_files: BTreeSet<PathBuf>,
    /// Base config with `remote_path` rebased onto `directory`.
    pub config: RemoteConfig,
}

impl WatchGroup {
    pub fn contains(&self, path: &Path) -> bool {
        self.target_files.contains(path)
    }
}

/// Union of CLI-supplied paths and the config's `transferFiles`, resolved
/// against the project root and deduplicated.
pub fn collect_watch_paths(
    project_root: &Path,
    cli_files: &[PathBuf],
    config: &RemoteConfig,
) -> Result<BTreeSet<PathBuf>, ConfigError> {
    let paths: BTreeSet<PathBuf> = cli_files
        .iter()
        .map(PathBuf::as_path)
        .chain(config.transfer_files.iter().map(Path::new))
        .map(|p| resolve_under(project_root, p))
        .collect();
    if paths.is_empty() {
        return Err(ConfigError::NothingToWatch);
    }
    Ok(paths)
}

/// Partition `files` by parent directory and derive each group's config.
///
/// Relative inputs are resolved against `project_root`. Output is sorted by
/// directory.
pub fn build_watch_groups<I, P>(
    project_root: &Path,
    files: I,
    base: &RemoteConfig,
) -> Result<Vec<WatchGroup>, ConfigError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut by_dir: BTreeMap<PathBuf, BTreeSet<PathBuf>> = BTreeMap::new();
    for file in files {
        let path = resolve_under(project_root, file.as_ref());
        let parent = match path.parent() {
            Some(parent) if path.starts_with(project_root) && path != project_root => {
                parent.to_path_buf()
            }
            _ => {
                return Err(ConfigError::OutsideProjectRoot {
                    path,
                    root: project_root.to_path_buf(),
                })
            }
        };
        by_dir.entry(parent).or_default().insert(path);
    }

    let groups = by_dir
        .into_iter()
        .map(|(directory, target_files)| {
            let rel = directory
                .strip_prefix(project_root)
                .map(to_posix)
                .unwrap_or_default();
            let config = base.for_subdirectory(&rel);
            tracing::debug!(
                directory = %directory.display(),
                remote = %config.remote_path,
                files = target_files.len(),
                "built watch group",
            );
            WatchGroup {
                directory,
                target_files,
                config,
            }
        })
        .collect();
    Ok(groups)
}
