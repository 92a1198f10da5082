//! In-memory remote server for tests.
//!
//! Implements [`SessionFactory`] with stat-style directory semantics so the
//! real uploader and ensurer run unchanged against it. Enabled for this
//! crate's tests and for dependants via the `test-support` feature.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use pushwatch_core::{Protocol, RemoteConfig, RemoteTarget};

use crate::ensure::{ensure_remote_dir, DirSegment, DirectoryProbe};
use crate::error::{connection_err, UploadError};
use crate::session::{RemoteSession, SessionFactory};

#[derive(Debug, Default)]
pub struct ServerState {
    pub dirs: BTreeSet<String>,
    pub files: BTreeMap<String, Vec<u8>>,
    /// Every successful `mkdir`, in order.
    pub mkdirs: Vec<String>,
    pub opened: usize,
    pub closed: usize,
    /// Protocols sessions were opened with, in order.
    pub protocols: Vec<Protocol>,
    pub refuse_connections: bool,
    pub denied_dirs: HashSet<String>,
    pub fail_stores: bool,
    /// Pause inside `store` so concurrent uploads overlap.
    pub store_delay: Option<Duration>,
}

/// Shared handle; clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryServer {
    state: Arc<Mutex<ServerState>>,
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state().files.get(path).cloned()
    }
}

impl SessionFactory for MemoryServer {
    fn open(&self, config: &RemoteConfig) -> Result<Box<dyn RemoteSession>, UploadError> {
        let mut state = self.state();
        if state.refuse_connections {
            return Err(connection_err(&config.host, "connection refused"));
        }
        state.opened += 1;
        state.protocols.push(config.protocol);
        Ok(Box::new(MemorySession {
            server: self.clone(),
            protocol: config.protocol,
            open: true,
        }))
    }
}

struct MemorySession {
    server: MemoryServer,
    protocol: Protocol,
    open: bool,
}

fn absolute(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

impl DirectoryProbe for MemorySession {
    fn exists(&mut self, segment: &DirSegment<'_>) -> Result<bool, UploadError> {
        Ok(self.server.state().dirs.contains(segment.path))
    }

    fn create(&mut self, segment: &DirSegment<'_>) -> Result<(), UploadError> {
        let mut state = self.server.state();
        let path = segment.path.to_string();
        if state.denied_dirs.contains(&path) {
            return Err(UploadError::RemoteDirectory {
                path,
                reason: "permission denied".into(),
            });
        }
        if !state.dirs.insert(path.clone()) {
            return Err(UploadError::RemoteDirectory {
                path,
                reason: "file exists".into(),
            });
        }
        state.mkdirs.push(path);
        Ok(())
    }
}

impl RemoteSession for MemorySession {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    fn ensure_dir(&mut self, directory: &str) -> Result<(), UploadError> {
        if directory.is_empty() {
            return Ok(());
        }
        ensure_remote_dir(self, &absolute(directory))
    }

    fn store(&mut self, reader: &mut dyn Read, target: &RemoteTarget) -> Result<u64, UploadError> {
        let remote = absolute(&target.remote_path());
        let (delay, fail) = {
            let state = self.server.state();
            (state.store_delay, state.fail_stores)
        };
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if fail {
            return Err(UploadError::Transfer {
                remote,
                reason: "disk full".into(),
            });
        }
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| UploadError::Transfer {
                remote: remote.clone(),
                reason: e.to_string(),
            })?;
        let len = bytes.len() as u64;
        self.server.state().files.insert(remote, bytes);
        Ok(len)
    }

    fn close(&mut self) -> Result<(), UploadError> {
        if std::mem::replace(&mut self.open, false) {
            self.server.state().closed += 1;
        }
        Ok(())
    }
}
