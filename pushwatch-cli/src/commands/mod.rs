pub mod plan;
pub mod push;
pub mod watch;

use std::path::PathBuf;

use clap::Args;

/// Arguments shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project root; remote paths mirror file positions below it.
    pub project_root: PathBuf,

    /// Config document to use instead of `<project_root>/.vscode/sftp.json`.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl ProjectArgs {
    pub fn watch_options(&self) -> pushwatch_daemon::WatchOptions {
        pushwatch_daemon::WatchOptions {
            config_path: self.config.clone(),
        }
    }
}
