use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use walkdir::WalkDir;
use zge_assist::app::commands::Dispatcher;
use zge_assist::domain::model::Effect;
use zge_assist::infra::config::Config;
use zge_assist::infra::document::FileDocument;

#[derive(Parser)]
#[command(author, version, about = "Project automation commands", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run cargo nextest with default configuration
    Nextest {
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        release: bool,
    },
    /// Run rustfmt and clippy the way CI does
    Lint,
    /// Fail if any project file under DIR has code blocks that need normalizing
    CheckProjects { dir: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Nextest { profile, release } => run_nextest(profile, release)?,
        Commands::Lint => run_lint()?,
        Commands::CheckProjects { dir } => check_projects(&dir)?,
    }
    Ok(())
}

fn run_nextest(profile: Option<String>, release: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("nextest").arg("run").arg("--workspace");
    if let Some(profile) = profile {
        cmd.arg("--profile").arg(profile);
    }
    if release {
        cmd.arg("--release");
    }
    run(cmd, "cargo nextest run")
}

fn run_lint() -> Result<()> {
    let mut fmt = Command::new("cargo");
    fmt.args(["fmt", "--all", "--check"]);
    run(fmt, "cargo fmt --check")?;

    let mut clippy = Command::new("cargo");
    clippy.args([
        "clippy",
        "--workspace",
        "--all-targets",
        "--",
        "-D",
        "warnings",
    ]);
    run(clippy, "cargo clippy")
}

fn run(mut cmd: Command, label: &str) -> Result<()> {
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("{label} failed");
    }
    Ok(())
}

fn check_projects(dir: &Path) -> Result<()> {
    let dispatcher = Dispatcher::new(Config::load()?)?;
    let dirty = dirty_projects(&dispatcher, dir)?;
    for (path, message) in &dirty {
        println!("{}: {message}", path.display());
    }
    if !dirty.is_empty() {
        anyhow::bail!("{} project file(s) need normalizing", dirty.len());
    }
    Ok(())
}

/// Project files under `dir` that `zge-assist normalize` would rewrite.
fn dirty_projects(dispatcher: &Dispatcher, dir: &Path) -> Result<Vec<(PathBuf, String)>> {
    let mut dirty = Vec::new();
    let entries = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != "target");
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || !dispatcher.config().project.is_project(path) {
            continue;
        }
        let document = FileDocument::open(path)?;
        let effects = dispatcher
            .normalize_spacing(&document)
            .with_context(|| format!("failed to check {}", path.display()))?;
        if effects
            .iter()
            .any(|effect| matches!(effect, Effect::ReplaceText(_)))
        {
            let message = effects
                .into_iter()
                .find_map(|effect| match effect {
                    Effect::Status(message) => Some(message),
                    _ => None,
                })
                .unwrap_or_else(|| "needs normalizing".to_owned());
            dirty.push((path.to_path_buf(), message));
        }
    }
    Ok(dirty)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn crlf_projects_written_by_normalize_are_clean() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let project = dir.path().join("game.zgeproj");
        fs::write(
            &project,
            "<ZApplication>\r\n<Expression><![CDATA[//\r\n\r\nx=1;\r\n\r\n//]]></Expression>\r\n</ZApplication>\r\n",
        )?;
        fs::write(
            dir.path().join("other.zgeproj"),
            "<Expression><![CDATA[x=1;]]></Expression>\r\n",
        )?;
        fs::write(dir.path().join("notes.txt"), "<Expression><![CDATA[x]]></Expression>")?;

        let dispatcher = Dispatcher::new(Config::default())?;
        let dirty = dirty_projects(&dispatcher, dir.path())?;

        let names: Vec<_> = dirty
            .iter()
            .filter_map(|(path, _)| path.file_name()?.to_str())
            .collect();
        assert_eq!(names, vec!["other.zgeproj"]);
        assert_eq!(dirty[0].1, "Normalized 1 of 1 code block(s)");
        Ok(())
    }
}
