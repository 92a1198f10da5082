//! `pushwatch plan`: dry run of group building and path translation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use pushwatch_core::{config, translate, WatchGroup};

use super::ProjectArgs;

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Files to watch, relative to the project root. Merged with the
    /// config's `transferFiles`.
    pub files: Vec<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct PlanJson {
    host: String,
    protocol: String,
    port: u16,
    groups: Vec<GroupJson>,
}

#[derive(Serialize)]
struct GroupJson {
    directory: PathBuf,
    remote_path: String,
    files: Vec<FileJson>,
}

#[derive(Serialize)]
struct FileJson {
    local: PathBuf,
    remote: String,
}

#[derive(Tabled)]
struct PlanTableRow {
    #[tabled(rename = "local")]
    local: String,
    #[tabled(rename = "remote")]
    remote: String,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let root = config::check_project_root(&self.project.project_root)
            .context("invalid project root")?;
        let groups = pushwatch_daemon::plan(
            &root,
            &self.files,
            &self.project.watch_options(),
        )
        .context("failed to build watch plan")?;

        let plan = build_plan(&groups)?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&plan).context("failed to serialize plan JSON")?
            );
            return Ok(());
        }

        print_table(&root, plan);
        Ok(())
    }
}

fn build_plan(groups: &[WatchGroup]) -> Result<PlanJson> {
    let Some(first) = groups.first() else {
        anyhow::bail!("no watch groups");
    };
    let mut out = PlanJson {
        host: first.config.host.clone(),
        protocol: first.config.protocol.to_string(),
        port: first.config.effective_port(),
        groups: Vec::with_capacity(groups.len()),
    };
    for group in groups {
        let files = group
            .target_files
            .iter()
            .map(|local| {
                let target = translate(&group.directory, local, &group.config.remote_path)
                    .with_context(|| format!("cannot map '{}'", local.display()))?;
                Ok(FileJson {
                    local: local.clone(),
                    remote: target.remote_path(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        out.groups.push(GroupJson {
            directory: group.directory.clone(),
            remote_path: group.config.remote_path.clone(),
            files,
        });
    }
    Ok(out)
}

fn print_table(project_root: &Path, plan: PlanJson) {
    println!(
        "pushwatch v{} | {}://{}:{} | {} directories",
        env!("CARGO_PKG_VERSION"),
        plan.protocol,
        plan.host,
        plan.port,
        plan.groups.len(),
    );
    for group in plan.groups {
        let shown = group
            .directory
            .strip_prefix(project_root)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| group.directory.display().to_string());
        let shown = if shown.is_empty() { ".".to_string() } else { shown };
        println!("{} {}", shown.bold(), format!("-> {}", group.remote_path).bright_black());

        let rows: Vec<PlanTableRow> = group
            .files
            .into_iter()
            .map(|f| PlanTableRow {
                local: f
                    .local
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                remote: f.remote,
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }
}
