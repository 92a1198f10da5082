//! Per-group filesystem event handling.
//!
//! A dispatcher is idle until a matching event arrives, spawns one blocking
//! upload task for it, and is idle again without waiting for that task.
//! Uploads of the same file are neither debounced nor serialized: two quick
//! saves produce two uploads, and whichever finishes last wins remotely.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;

use notify::event::{CreateKind, ModifyKind};
use notify::{Event, EventKind};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use pushwatch_core::WatchGroup;
use pushwatch_transfer::{UploadError, UploadOutcome, Uploader};

pub type UploadTask = JoinHandle<Result<UploadOutcome, UploadError>>;

pub struct FileChangeDispatcher {
    group: WatchGroup,
    /// Event path → target path. Targets map to themselves; when the watched
    /// directory canonicalizes elsewhere (e.g. `/var` → `/private/var` on
    /// macOS) the real-path spelling maps back to the target too.
    aliases: HashMap<PathBuf, PathBuf>,
    uploader: Uploader,
}

impl FileChangeDispatcher {
    pub fn new(group: WatchGroup, uploader: Uploader) -> Self {
        let mut aliases: HashMap<PathBuf, PathBuf> = group
            .target_files
            .iter()
            .map(|t| (t.clone(), t.clone()))
            .collect();

        if let Ok(real_dir) = fs::canonicalize(&group.directory) {
            if real_dir != group.directory {
                for target in &group.target_files {
                    if let Some(name) = target.file_name() {
                        aliases.insert(real_dir.join(name), target.clone());
                    }
                }
            }
        }

        Self {
            group,
            aliases,
            uploader,
        }
    }

    pub fn group(&self) -> &WatchGroup {
        &self.group
    }

    /// Targets named by `event`, if its kind should trigger an upload.
    pub fn matching_targets(&self, event: &Event) -> Vec<PathBuf> {
        if !is_upload_trigger(&event.kind) {
            return Vec::new();
        }
        let targets: BTreeSet<PathBuf> = event
            .paths
            .iter()
            .filter(|path| !path.is_dir())
            .filter_map(|path| self.aliases.get(path.as_path()).cloned())
            .collect();
        targets.into_iter().collect()
    }

    /// Spawn one upload per matching target. Returns immediately.
    pub fn handle_event(&self, event: &Event) -> Vec<UploadTask> {
        self.matching_targets(event)
            .into_iter()
            .map(|target| {
                tracing::debug!(path = %target.display(), kind = ?event.kind, "change detected");
                self.dispatch(target)
            })
            .collect()
    }

    /// Fire-and-forget upload of one target on the blocking pool. The task
    /// owns its own copy of the group config.
    pub fn dispatch(&self, target: PathBuf) -> UploadTask {
        let uploader = self.uploader.clone();
        let directory = self.group.directory.clone();
        let config = self.group.config.clone();
        tokio::task::spawn_blocking(move || uploader.upload(&directory, &target, &config))
    }

    /// Consume events until shutdown or until the watcher hangs up.
    pub async fn run(
        self,
        mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                event = events.recv() => {
                    let Some(event) = event else { break };
                    match event {
                        Ok(event) => {
                            // Upload results are logged by the uploader itself.
                            drop(self.handle_event(&event));
                        }
                        Err(err) => {
                            tracing::warn!(
                                directory = %self.group.directory.display(),
                                error = %err,
                                "watcher event error",
                            );
                        }
                    }
                }
            }
        }
        tracing::debug!(directory = %self.group.directory.display(), "dispatcher stopped");
    }
}

/// Creations and content/metadata modifications qualify; folder creation,
/// renames, deletions and access events do not.
pub fn is_upload_trigger(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(CreateKind::Folder) => false,
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Name(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use notify::event::{DataChange, MetadataKind, RemoveKind, RenameMode};
    use pushwatch_core::{build_watch_groups, Protocol, RemoteConfig};
    use pushwatch_transfer::memory::MemoryServer;
    use tempfile::TempDir;

    use super::*;

    fn config() -> RemoteConfig {
        RemoteConfig {
            host: "files.example.com".into(),
            username: "deploy".into(),
            password: "pw".into(),
            port: None,
            protocol: Protocol::Ftp,
            remote_path: "/www".into(),
            transfer_files: vec![],
        }
    }

    struct Fixture {
        _root: TempDir,
        server: MemoryServer,
        dispatcher: FileChangeDispatcher,
    }

    fn fixture() -> Fixture {
        let root = TempDir::new().expect("root");
        let src = root.path().join("src");
        fs::create_dir_all(src.join("nested")).expect("mkdir");
        fs::write(src.join("a.css"), "a").expect("write a");
        fs::write(src.join("b.css"), "b").expect("write b");

        let groups =
            build_watch_groups(root.path(), ["src/a.css"], &config()).expect("groups");
        let server = MemoryServer::new();
        let uploader = Uploader::new(Arc::new(server.clone()));
        let dispatcher =
            FileChangeDispatcher::new(groups.into_iter().next().expect("group"), uploader);
        Fixture {
            _root: root,
            server,
            dispatcher,
        }
    }

    fn target_in(group: &WatchGroup, name: &str) -> PathBuf {
        group.directory.join(name)
    }

    fn event(kind: EventKind, path: PathBuf) -> Event {
        Event::new(kind).add_path(path)
    }

    #[test]
    fn trigger_kinds() {
        assert!(is_upload_trigger(&EventKind::Create(CreateKind::File)));
        assert!(is_upload_trigger(&EventKind::Create(CreateKind::Any)));
        assert!(is_upload_trigger(&EventKind::Modify(ModifyKind::Data(DataChange::Content))));
        assert!(is_upload_trigger(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::WriteTime
        ))));
        assert!(!is_upload_trigger(&EventKind::Create(CreateKind::Folder)));
        assert!(!is_upload_trigger(&EventKind::Modify(ModifyKind::Name(RenameMode::To))));
        assert!(!is_upload_trigger(&EventKind::Remove(RemoveKind::File)));
        assert!(!is_upload_trigger(&EventKind::Any));
    }

    #[tokio::test]
    async fn modification_of_target_uploads_to_mirrored_path() {
        let fx = fixture();
        let target = target_in(fx.dispatcher.group(), "a.css");

        let tasks = fx.dispatcher.handle_event(&event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            target,
        ));
        assert_eq!(tasks.len(), 1);
        for task in tasks {
            task.await.expect("join").expect("upload");
        }
        assert_eq!(fx.server.file("/www/src/a.css").as_deref(), Some(&b"a"[..]));
        assert_eq!(fx.server.state().mkdirs, vec!["/www", "/www/src"]);
    }

    #[tokio::test]
    async fn non_qualifying_events_are_ignored() {
        let fx = fixture();
        let group = fx.dispatcher.group().clone();
        let ignored = [
            event(EventKind::Remove(RemoveKind::File), target_in(&group, "a.css")),
            event(
                EventKind::Modify(ModifyKind::Name(RenameMode::To)),
                target_in(&group, "a.css"),
            ),
            event(EventKind::Modify(ModifyKind::Any), target_in(&group, "b.css")),
            event(EventKind::Create(CreateKind::Any), target_in(&group, "nested")),
        ];
        for ev in &ignored {
            assert!(fx.dispatcher.handle_event(ev).is_empty(), "should ignore {ev:?}");
        }
        assert_eq!(fx.server.state().opened, 0);
    }

    #[tokio::test]
    async fn repeated_paths_in_one_event_upload_once_each() {
        let root = TempDir::new().expect("root");
        let src = root.path().join("src");
        fs::create_dir_all(&src).expect("mkdir");
        fs::write(src.join("a.css"), "a").expect("write a");
        fs::write(src.join("b.css"), "b").expect("write b");
        let groups = build_watch_groups(root.path(), ["src/a.css", "src/b.css"], &config())
            .expect("groups");
        let server = MemoryServer::new();
        let dispatcher = FileChangeDispatcher::new(
            groups.into_iter().next().expect("group"),
            Uploader::new(Arc::new(server.clone())),
        );

        let a = src.join("a.css");
        let b = src.join("b.css");
        let ev = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(a.clone())
            .add_path(b.clone())
            .add_path(a.clone());
        assert_eq!(dispatcher.matching_targets(&ev), vec![a, b]);

        let tasks = dispatcher.handle_event(&ev);
        assert_eq!(tasks.len(), 2);
        for task in tasks {
            task.await.expect("join").expect("upload");
        }
        assert_eq!(server.state().opened, 2);
    }

    #[tokio::test]
    async fn rapid_saves_of_same_file_both_upload() {
        let fx = fixture();
        fx.server.state().store_delay = Some(Duration::from_millis(25));
        let target = target_in(fx.dispatcher.group(), "a.css");
        let modify = event(EventKind::Modify(ModifyKind::Any), target);

        let mut tasks = fx.dispatcher.handle_event(&modify);
        tasks.extend(fx.dispatcher.handle_event(&modify));
        assert_eq!(tasks.len(), 2);

        for task in tasks {
            let outcome = task.await.expect("join").expect("upload");
            assert!(matches!(outcome, UploadOutcome::Uploaded { .. }));
        }
        let state = fx.server.state();
        assert_eq!((state.opened, state.closed), (2, 2));
        drop(state);
        assert_eq!(fx.dispatcher.group().config.remote_path, "/www/src");
    }

    #[tokio::test]
    async fn failed_upload_leaves_dispatcher_usable() {
        let fx = fixture();
        fx.server.state().refuse_connections = true;
        let target = target_in(fx.dispatcher.group(), "a.css");
        let modify = event(EventKind::Modify(ModifyKind::Any), target);

        for task in fx.dispatcher.handle_event(&modify) {
            let err = task.await.expect("join").unwrap_err();
            assert!(matches!(err, UploadError::Connection { .. }));
        }

        fx.server.state().refuse_connections = false;
        for task in fx.dispatcher.handle_event(&modify) {
            task.await.expect("join").expect("second attempt uploads");
        }
    }

    #[tokio::test]
    async fn run_loop_stops_on_shutdown() {
        let fx = fixture();
        let (_event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(fx.dispatcher.run(event_rx, shutdown_rx));
        shutdown_tx.send(()).expect("send shutdown");
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("dispatcher exits")
            .expect("join");
    }
}
