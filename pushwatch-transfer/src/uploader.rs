//! Single-file upload pipeline.
//!
//! ## `Uploader::upload` steps
//!
//! 1. Skip (with a warning) if the local file is gone.
//! 2. Translate the local path into a [`RemoteTarget`].
//! 3. Open a fresh session from the factory.
//! 4. Ensure the remote directory chain.
//! 5. Stream the file bytes.
//! 6. Close the session, whatever happened in 4 and 5.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pushwatch_core::{translate, RemoteConfig, RemoteTarget};

use crate::error::{io_err, UploadError};
use crate::session::{ProtocolSessionFactory, RemoteSession, SessionFactory};

/// Outcome of one upload attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded {
        local: PathBuf,
        remote: RemoteTarget,
        bytes: u64,
    },
    /// The file vanished between the event and the upload.
    SkippedMissing { local: PathBuf },
}

/// Stateless upload orchestrator; cheap to share across tasks.
#[derive(Clone)]
pub struct Uploader {
    factory: Arc<dyn SessionFactory>,
}

impl Default for Uploader {
    fn default() -> Self {
        Self::new(Arc::new(ProtocolSessionFactory))
    }
}

impl Uploader {
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self { factory }
    }

    /// Upload `local` to the location mirroring its position under
    /// `rebase_root`, below `config.remote_path`.
    ///
    /// Every call logs exactly one success, skip, or failure line naming the
    /// local and remote paths.
    pub fn upload(
        &self,
        rebase_root: &Path,
        local: &Path,
        config: &RemoteConfig,
    ) -> Result<UploadOutcome, UploadError> {
        if !local.is_file() {
            tracing::warn!(local = %local.display(), "local file does not exist, skipping upload");
            return Ok(UploadOutcome::SkippedMissing {
                local: local.to_path_buf(),
            });
        }

        let target = match translate(rebase_root, local, &config.remote_path) {
            Ok(target) => target,
            Err(err) => {
                tracing::error!(local = %local.display(), error = %err, "cannot map file to remote path");
                return Err(err.into());
            }
        };

        tracing::info!(
            protocol = %config.protocol,
            local = %local.display(),
            remote = %target,
            "uploading",
        );
        match self.upload_to(local, &target, config) {
            Ok(bytes) => {
                tracing::info!(
                    local = %local.display(),
                    remote = %target,
                    bytes,
                    "upload complete",
                );
                Ok(UploadOutcome::Uploaded {
                    local: local.to_path_buf(),
                    remote: target,
                    bytes,
                })
            }
            Err(err) => {
                tracing::error!(
                    local = %local.display(),
                    remote = %target,
                    error = %err,
                    "upload failed",
                );
                Err(err)
            }
        }
    }

    /// Upload each file in turn. A failure does not stop the batch.
    pub fn upload_many<'a, I>(
        &self,
        rebase_root: &Path,
        files: I,
        config: &RemoteConfig,
    ) -> Vec<(PathBuf, Result<UploadOutcome, UploadError>)>
    where
        I: IntoIterator<Item = &'a Path>,
    {
        files
            .into_iter()
            .map(|file| (file.to_path_buf(), self.upload(rebase_root, file, config)))
            .collect()
    }

    fn upload_to(
        &self,
        local: &Path,
        target: &RemoteTarget,
        config: &RemoteConfig,
    ) -> Result<u64, UploadError> {
        let mut session = self.factory.open(config)?;
        let result = transfer(session.as_mut(), local, target);
        if let Err(err) = session.close() {
            tracing::warn!(host = %config.host, error = %err, "session close failed");
        }
        result
    }
}

fn transfer(
    session: &mut dyn RemoteSession,
    local: &Path,
    target: &RemoteTarget,
) -> Result<u64, UploadError> {
    session.ensure_dir(&target.directory)?;
    let mut file = File::open(local).map_err(|e| io_err(local, e))?;
    session.store(&mut file, target)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::fs;
    use std::time::Duration;

    use pushwatch_core::Protocol;
    use tempfile::TempDir;

    use super::*;
    use crate::memory::MemoryServer;

    fn config(protocol: Protocol, remote_path: &str) -> RemoteConfig {
        RemoteConfig {
            host: "files.example.com".into(),
            username: "deploy".into(),
            password: "pw".into(),
            port: None,
            protocol,
            remote_path: remote_path.into(),
            transfer_files: vec![],
        }
    }

    fn project_with(rel: &str, body: &str) -> (TempDir, PathBuf) {
        let root = TempDir::new().expect("project root");
        let path = root.path().join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, body).expect("write");
        (root, path)
    }

    #[test]
    fn uploads_into_mirrored_directory_creating_parents() {
        let server = MemoryServer::new();
        server.state().dirs.insert("/www".into());
        let uploader = Uploader::new(Arc::new(server.clone()));
        let (root, file) = project_with("src/a.css", "body { }");

        let outcome = uploader
            .upload(root.path(), &file, &config(Protocol::Ftp, "/www"))
            .expect("upload");

        match outcome {
            UploadOutcome::Uploaded { remote, bytes, .. } => {
                assert_eq!(remote.remote_path(), "/www/src/a.css");
                assert_eq!(bytes, 8);
            }
            other => panic!("expected upload, got {other:?}"),
        }
        assert_eq!(server.file("/www/src/a.css").as_deref(), Some(&b"body { }"[..]));
        let state = server.state();
        assert_eq!(state.mkdirs, vec!["/www/src"]);
        assert_eq!((state.opened, state.closed), (1, 1));
    }

    #[test]
    fn missing_local_file_is_skipped_without_connecting() {
        let server = MemoryServer::new();
        let uploader = Uploader::new(Arc::new(server.clone()));
        let root = TempDir::new().expect("root");
        let ghost = root.path().join("gone.js");

        let outcome = uploader
            .upload(root.path(), &ghost, &config(Protocol::Sftp, "/www"))
            .expect("skip is not an error");

        assert_eq!(outcome, UploadOutcome::SkippedMissing { local: ghost });
        assert_eq!(server.state().opened, 0);
    }

    #[test]
    fn session_protocol_follows_config() {
        let server = MemoryServer::new();
        let uploader = Uploader::new(Arc::new(server.clone()));
        let (root, file) = project_with("index.php", "<?php");

        uploader
            .upload(root.path(), &file, &config(Protocol::Sftp, "/www"))
            .expect("sftp upload");
        uploader
            .upload(root.path(), &file, &config(Protocol::Ftp, "/www"))
            .expect("ftp upload");

        assert_eq!(server.state().protocols, vec![Protocol::Sftp, Protocol::Ftp]);
    }

    #[test]
    fn connection_failure_is_reported() {
        let server = MemoryServer::new();
        server.state().refuse_connections = true;
        let uploader = Uploader::new(Arc::new(server.clone()));
        let (root, file) = project_with("a.js", "x");

        let err = uploader
            .upload(root.path(), &file, &config(Protocol::Ftp, "/www"))
            .unwrap_err();
        assert!(matches!(err, UploadError::Connection { .. }), "got: {err}");
    }

    #[test]
    fn directory_failure_aborts_before_transfer_and_closes_session() {
        let server = MemoryServer::new();
        server.state().denied_dirs.insert("/www".into());
        let uploader = Uploader::new(Arc::new(server.clone()));
        let (root, file) = project_with("a.js", "x");

        let err = uploader
            .upload(root.path(), &file, &config(Protocol::Sftp, "/www"))
            .unwrap_err();
        assert!(matches!(err, UploadError::RemoteDirectory { .. }), "got: {err}");

        let state = server.state();
        assert!(state.files.is_empty());
        assert_eq!(state.closed, 1, "session closed on ensurer failure");
    }

    #[test]
    fn transfer_failure_closes_session() {
        let server = MemoryServer::new();
        server.state().fail_stores = true;
        let uploader = Uploader::new(Arc::new(server.clone()));
        let (root, file) = project_with("a.js", "x");

        let err = uploader
            .upload(root.path(), &file, &config(Protocol::Ftp, "/www"))
            .unwrap_err();
        assert!(matches!(err, UploadError::Transfer { .. }), "got: {err}");
        assert_eq!(server.state().closed, 1);
    }

    #[test]
    fn empty_remote_base_uploads_relative_to_root() {
        let server = MemoryServer::new();
        let uploader = Uploader::new(Arc::new(server.clone()));
        let (root, file) = project_with("top.txt", "hi");

        uploader
            .upload(root.path(), &file, &config(Protocol::Ftp, ""))
            .expect("upload");
        assert!(server.file("/top.txt").is_some());
        assert!(server.state().mkdirs.is_empty());
    }

    #[test]
    fn upload_many_continues_after_a_failure() {
        let server = MemoryServer::new();
        let uploader = Uploader::new(Arc::new(server.clone()));
        let (root, file) = project_with("ok.txt", "ok");
        let ghost = root.path().join("missing.txt");
        let outside = PathBuf::from("/definitely/not/under/root.txt");

        let results = uploader.upload_many(
            root.path(),
            [file.as_path(), ghost.as_path(), outside.as_path()],
            &config(Protocol::Ftp, "/www"),
        );
        assert_eq!(results.len(), 3);
        assert!(matches!(results[0].1, Ok(UploadOutcome::Uploaded { .. })));
        assert!(matches!(results[1].1, Ok(UploadOutcome::SkippedMissing { .. })));
        // Nonexistent paths are skipped before translation is attempted.
        assert!(matches!(results[2].1, Ok(UploadOutcome::SkippedMissing { .. })));
    }

    #[test]
    fn concurrent_uploads_of_same_file_both_complete() {
        let server = MemoryServer::new();
        server.state().store_delay = Some(Duration::from_millis(20));
        let uploader = Uploader::new(Arc::new(server.clone()));
        let (root, file) = project_with("deep/er/a.css", "v1");
        let cfg = config(Protocol::Sftp, "/www");

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| scope.spawn(|| uploader.upload(root.path(), &file, &cfg)))
                .collect();
            for handle in handles {
                let outcome = handle.join().expect("thread").expect("upload");
                assert!(matches!(outcome, UploadOutcome::Uploaded { .. }));
            }
        });

        let state = server.state();
        assert_eq!((state.opened, state.closed), (2, 2));
        assert_eq!(state.files.get("/www/deep/er/a.css").map(Vec::as_slice), Some(&b"v1"[..]));
        let unique: BTreeSet<_> = state.mkdirs.iter().collect();
        assert_eq!(unique.len(), state.mkdirs.len(), "no directory created twice");
        assert_eq!(cfg.remote_path, "/www");
    }
}
