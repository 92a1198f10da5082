//! `pushwatch push`: one-shot upload through the watch pipeline.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use pushwatch_core::{build_watch_groups, config};
use pushwatch_transfer::{UploadOutcome, Uploader};

use super::ProjectArgs;

#[derive(Args, Debug)]
pub struct PushArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Files to upload, relative to the project root.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

impl PushArgs {
    pub fn run(self) -> Result<()> {
        pushwatch_daemon::init_tracing();

        let root = config::check_project_root(&self.project.project_root)
            .context("invalid project root")?;
        let cfg = config::load_for_project(&root, self.project.config.as_deref())
            .context("failed to load remote config")?;
        let groups = build_watch_groups(&root, &self.files, &cfg)
            .context("failed to resolve files to upload")?;

        let uploader = Uploader::default();
        let mut uploaded = 0usize;
        let mut failed = 0usize;
        for group in &groups {
            let results = uploader.upload_many(
                &group.directory,
                group.target_files.iter().map(PathBuf::as_path),
                &group.config,
            );
            for (local, result) in results {
                let shown = local.strip_prefix(&root).unwrap_or(&local).display();
                match result {
                    Ok(UploadOutcome::Uploaded { remote, bytes, .. }) => {
                        uploaded += 1;
                        println!("  {}  {shown} -> {remote} ({bytes} bytes)", "✓".green());
                    }
                    Ok(UploadOutcome::SkippedMissing { .. }) => {
                        failed += 1;
                        println!("  {}  {shown} (missing, skipped)", "·".yellow());
                    }
                    Err(err) => {
                        failed += 1;
                        println!("  {}  {shown}: {err}", "✗".red());
                    }
                }
            }
        }

        println!(
            "{} uploaded, {} not uploaded ({} via {})",
            uploaded,
            failed,
            cfg.host,
            cfg.protocol
        );
        if failed > 0 {
            bail!("{failed} file(s) were not uploaded");
        }
        Ok(())
    }
}
