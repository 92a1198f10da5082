//! pushwatch: upload files to an FTP/SFTP server whenever they are saved.
//!
//! # Usage
//!
//! ```text
//! pushwatch watch <project_root> [files...] [--config PATH]
//! pushwatch push  <project_root> <files...> [--config PATH]
//! pushwatch plan  <project_root> [files...] [--config PATH] [--json]
//! ```
//!
//! Connection settings come from `<project_root>/.vscode/sftp.json` unless
//! `--config` names another document.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{plan::PlanArgs, push::PushArgs, watch::WatchArgs};

#[derive(Parser, Debug)]
#[command(
    name = "pushwatch",
    version,
    about = "Mirror saved files onto an FTP or SFTP server",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch files and upload each one whenever it changes (until ctrl-c).
    Watch(WatchArgs),

    /// Upload the given files once and exit.
    Push(PushArgs),

    /// Show watch groups and remote destinations without connecting.
    Plan(PlanArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Watch(args) => args.run(),
        Commands::Push(args) => args.run(),
        Commands::Plan(args) => args.run(),
    }
}
