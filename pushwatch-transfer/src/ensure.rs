//! Idempotent creation of remote directory chains.
//!
//! The walk is shared; only the existence test and creation differ per
//! protocol, expressed through [`DirectoryProbe`]. Creation is not atomic:
//! when `create` fails the segment is probed once more, and a segment that
//! now exists (another upload created it first) counts as success.

use crate::error::UploadError;

/// One step of the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirSegment<'a> {
    /// The bare segment name, e.g. `src`.
    pub name: &'a str,
    /// Accumulated path up to and including this segment, e.g. `/www/src`.
    pub path: &'a str,
}

/// Protocol-specific existence test and creation.
pub trait DirectoryProbe {
    /// Called once before the first segment. `absolute` is true when the
    /// target path starts with `/`.
    fn start(&mut self, _absolute: bool) -> Result<(), UploadError> {
        Ok(())
    }

    /// `Ok(false)` means absent. Errors are reserved for a broken session.
    fn exists(&mut self, segment: &DirSegment<'_>) -> Result<bool, UploadError>;

    /// Create the segment. Failure to create is reported as
    /// [`UploadError::RemoteDirectory`].
    fn create(&mut self, segment: &DirSegment<'_>) -> Result<(), UploadError>;
}

/// Ensure every segment of `directory` exists. Empty and `/` are no-ops.
pub fn ensure_remote_dir<P>(probe: &mut P, directory: &str) -> Result<(), UploadError>
where
    P: DirectoryProbe + ?Sized,
{
    let segments: Vec<&str> = directory.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Ok(());
    }

    let absolute = directory.starts_with('/');
    probe.start(absolute)?;

    let mut accumulated = String::with_capacity(directory.len() + 1);
    for name in segments {
        if absolute || !accumulated.is_empty() {
            accumulated.push('/');
        }
        accumulated.push_str(name);

        let segment = DirSegment {
            name,
            path: &accumulated,
        };
        if probe.exists(&segment)? {
            continue;
        }

        match probe.create(&segment) {
            Ok(()) => tracing::debug!(path = %accumulated, "created remote directory"),
            Err(UploadError::RemoteDirectory { reason, .. }) => {
                if !probe.exists(&segment)? {
                    return Err(UploadError::RemoteDirectory {
                        path: accumulated.clone(),
                        reason,
                    });
                }
                tracing::debug!(path = %accumulated, "remote directory created concurrently");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
