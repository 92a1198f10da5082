use std::future::Future;
use std::path::{Path, PathBuf};

use notify::{recommended_watcher, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use pushwatch_core::{build_watch_groups, collect_watch_paths, config, WatchGroup};
use pushwatch_transfer::Uploader;

use crate::dispatcher::FileChangeDispatcher;
use crate::error::{io_err, DaemonError};

/// Knobs the CLI passes through to the runtime.
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// Config document to use instead of `<root>/.vscode/sftp.json`.
    pub config_path: Option<PathBuf>,
}

/// Running watchers and their dispatcher loops.
///
/// Built by [`WatchSet::start`]; must be torn down with [`WatchSet::stop`].
pub struct WatchSet {
    shutdown_tx: broadcast::Sender<()>,
    watchers: Vec<RecommendedWatcher>,
    dispatchers: Vec<JoinHandle<()>>,
    directories: Vec<PathBuf>,
}

impl WatchSet {
    /// Register one non-recursive watch per group and spawn its dispatcher.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn start(groups: Vec<WatchGroup>, uploader: Uploader) -> Result<Self, DaemonError> {
        let (shutdown_tx, _) = broadcast::channel::<()>(16);
        let mut set = Self {
            shutdown_tx,
            watchers: Vec::with_capacity(groups.len()),
            dispatchers: Vec::with_capacity(groups.len()),
            directories: Vec::with_capacity(groups.len()),
        };

        for group in groups {
            let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
            let mut watcher = recommended_watcher(move |event| {
                let _ = event_tx.send(event);
            })?;
            watcher
                .watch(&group.directory, RecursiveMode::NonRecursive)
                .map_err(|source| DaemonError::Watch {
                    path: group.directory.clone(),
                    source,
                })?;

            tracing::info!(
                directory = %group.directory.display(),
                remote = %group.config.remote_path,
                files = group.target_files.len(),
                "watching directory",
            );

            set.directories.push(group.directory.clone());
            let dispatcher = FileChangeDispatcher::new(group, uploader.clone());
            let shutdown_rx = set.shutdown_tx.subscribe();
            set.dispatchers
                .push(tokio::spawn(dispatcher.run(event_rx, shutdown_rx)));
            set.watchers.push(watcher);
        }

        Ok(set)
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// Stop event delivery, then wait for every dispatcher loop to exit.
    /// Uploads already in flight run to completion on the blocking pool.
    pub async fn stop(self) -> Result<(), DaemonError> {
        let Self {
            shutdown_tx,
            watchers,
            dispatchers,
            ..
        } = self;

        drop(watchers);
        let _ = shutdown_tx.send(());
        for handle in dispatchers {
            handle
                .await
                .map_err(|err| DaemonError::Join(format!("dispatcher: {err}")))?;
        }
        Ok(())
    }
}

/// Load config, build groups, and watch until ctrl-c.
pub async fn run(
    project_root: PathBuf,
    files: Vec<PathBuf>,
    options: WatchOptions,
) -> Result<(), DaemonError> {
    run_until(
        &project_root,
        &files,
        &options,
        Uploader::default(),
        wait_for_ctrl_c(),
    )
    .await
}

/// [`run`] with an injectable uploader and shutdown signal.
pub async fn run_until<F>(
    project_root: &Path,
    files: &[PathBuf],
    options: &WatchOptions,
    uploader: Uploader,
    shutdown: F,
) -> Result<(), DaemonError>
where
    F: Future<Output = Result<(), DaemonError>>,
{
    let groups = plan(project_root, files, options)?;
    let protocol = groups
        .first()
        .map(|g| g.config.protocol.to_string())
        .unwrap_or_default();

    let watch_set = WatchSet::start(groups, uploader)?;
    tracing::info!(
        directories = watch_set.directories().len(),
        protocol = %protocol,
        "watching for changes",
    );

    let signal = shutdown.await;
    tracing::info!("stopping watchers");
    watch_set.stop().await?;
    signal
}

/// Resolve config and watch groups without starting anything.
pub fn plan(
    project_root: &Path,
    files: &[PathBuf],
    options: &WatchOptions,
) -> Result<Vec<WatchGroup>, DaemonError> {
    let root = config::check_project_root(project_root)?;
    let cfg = config::load_for_project(&root, options.config_path.as_deref())?;
    let paths = collect_watch_paths(&root, files, &cfg)?;
    Ok(build_watch_groups(&root, &paths, &cfg)?)
}

async fn wait_for_ctrl_c() -> Result<(), DaemonError> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| io_err("ctrl-c handler", e))?;
    tracing::info!("received ctrl-c, shutting down");
    Ok(())
}

/// Start the watcher runtime and block the current thread until it exits.
pub fn start_blocking(
    project_root: &Path,
    files: Vec<PathBuf>,
    options: WatchOptions,
) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(project_root.to_path_buf(), files, options))
}

/// Human-readable log lines on stderr; `RUST_LOG` overrides the `info`
/// default. Safe to call more than once.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
