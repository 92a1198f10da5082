//! Local-to-remote path translation.
//!
//! Everything here is pure: no filesystem access, so watched files are free
//! to not exist yet.

use std::path::{Component, Path, PathBuf};

use crate::error::PathError;
use crate::types::RemoteTarget;

/// Map a local file onto its remote directory and filename.
///
/// `rebase_root` is the directory the relative position is measured from
/// (the project root, or a watch group's directory). `remote_base` may be
/// empty.
pub fn translate(
    rebase_root: &Path,
    local: &Path,
    remote_base: &str,
) -> Result<RemoteTarget, PathError> {
    let rel = local
        .strip_prefix(rebase_root)
        .map_err(|_| PathError::OutsideRoot {
            path: local.to_path_buf(),
            root: rebase_root.to_path_buf(),
        })?;
    let rel_posix = to_posix(rel);

    let (rel_dir, filename) = match rel_posix.rsplit_once('/') {
        Some((dir, name)) => (dir, name),
        None => ("", rel_posix.as_str()),
    };
    if filename.is_empty() {
        return Err(PathError::NoFileName {
            path: local.to_path_buf(),
        });
    }

    let base = remote_base.trim_end_matches('/');
    let directory = if base.is_empty() {
        rel_dir.trim_end_matches('/').to_string()
    } else {
        format!("{base}/{rel_dir}").trim_end_matches('/').to_string()
    };

    Ok(RemoteTarget {
        directory,
        filename: filename.to_string(),
    })
}

/// Render a relative path with `/` separators.
pub fn to_posix(rel: &Path) -> String {
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect();
    parts.join("/").replace('\\', "/")
}

/// POSIX join of a remote base and a relative remote path.
///
/// ```
/// use pushwatch_core::paths::join_remote;
/// assert_eq!(join_remote("/www", "sub"), "/www/sub");
/// assert_eq!(join_remote("/www/", "sub"), "/www/sub");
/// assert_eq!(join_remote("/", "sub"), "/sub");
/// assert_eq!(join_remote("", "sub"), "sub");
/// ```
pub fn join_remote(base: &str, rel: &str) -> String {
    let rel = rel.trim_start_matches('/');
    if base.is_empty() {
        rel.to_string()
    } else if base.ends_with('/') {
        format!("{base}{rel}")
    } else {
        format!("{base}/{rel}")
    }
}

/// Resolve `.` and `..` components without consulting the filesystem.
///
/// `..` at the root is dropped, matching how the OS resolves `/..`.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve `path` against `root` (absolute paths pass through) and normalize.
pub fn resolve_under(root: &Path, path: &Path) -> PathBuf {
    normalize_lexically(&root.join(path))
}
