//! `pushwatch watch`: foreground watcher.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::ProjectArgs;

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Files to watch, relative to the project root. Merged with the
    /// config's `transferFiles`.
    pub files: Vec<PathBuf>,
}

impl WatchArgs {
    pub fn run(self) -> Result<()> {
        let options = self.project.watch_options();
        pushwatch_daemon::start_blocking(&self.project.project_root, self.files, options)
            .with_context(|| {
                format!(
                    "watcher for '{}' exited with error",
                    self.project.project_root.display()
                )
            })
    }
}
