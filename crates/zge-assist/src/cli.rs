//! Command-line front end.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::app::commands::{Adapter, Dispatcher};
use crate::app::host::{Presentation, Reporter};
use crate::domain::errors::CommandError;
use crate::domain::model::{Effect, FoldPlan, line_col};
use crate::infra::config::Config;
use crate::infra::document::FileDocument;
use crate::infra::folds::FoldStore;
use crate::infra::reporter::TerminalReporter;
use crate::infra::zge::ZgeEditor;

#[derive(Debug, Parser)]
#[command(
    name = "zge-assist",
    author,
    version,
    about = "Build, run, fold and tidy ZGameEditor project files"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress status messages.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to ZGameEditor, overriding configuration and ZGE_EDITOR_PATH.
    #[arg(long, global = true, value_name = "PATH")]
    pub editor: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build the project into an executable next to it and start it
    Run { project: PathBuf },
    /// Open the project in ZGameEditor
    Edit { project: PathBuf },
    /// Toggle folding of embedded data blocks
    Fold {
        project: PathBuf,
        /// Only print the regions and what a toggle would do
        #[arg(long)]
        list: bool,
    },
    /// Normalize comment framing of CDATA code blocks
    Normalize {
        project: PathBuf,
        /// Do not write; fail if any block needs normalizing
        #[arg(long, conflicts_with = "stdout")]
        check: bool,
        /// Print the normalized document instead of writing it
        #[arg(long)]
        stdout: bool,
    },
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Execute a parsed command line.
pub fn run(cli: Cli) -> Result<ExitCode> {
    let editor = cli.editor.as_deref();
    match cli.command {
        Commands::Run { project } => {
            let dispatcher = load_dispatcher(editor)?;
            let reporter = TerminalReporter::new(cli.quiet);
            let mut document = FileDocument::open(&project)?;
            let result = dispatcher.run_project(&mut document, &ZgeEditor::new());
            Ok(finish(&mut document, None, &reporter, result))
        }
        Commands::Edit { project } => {
            let dispatcher = load_dispatcher(editor)?;
            let reporter = TerminalReporter::new(cli.quiet);
            let mut document = FileDocument::open(&project)?;
            let result = dispatcher.edit_project(&document, &ZgeEditor::new());
            Ok(finish(&mut document, None, &reporter, result))
        }
        Commands::Fold { project, list } => {
            let dispatcher = load_dispatcher(editor)?;
            let reporter = TerminalReporter::new(cli.quiet);
            let mut document = FileDocument::open(&project)?;
            let mut store = FoldStore::open(&project, document.contents().len())?;
            let result = dispatcher.toggle_folds(&document, &store);
            if list {
                return Ok(match result {
                    Ok(effects) => {
                        print_fold_listing(document.contents(), &store, &effects)?;
                        ExitCode::SUCCESS
                    }
                    Err(err) => fail(&reporter, &err),
                });
            }
            Ok(finish(&mut document, Some(&mut store), &reporter, result))
        }
        Commands::Normalize {
            project,
            check,
            stdout,
        } => {
            let dispatcher = load_dispatcher(editor)?;
            let reporter = TerminalReporter::new(cli.quiet || stdout);
            let mut document = FileDocument::open(&project)?;
            let result = dispatcher.normalize_spacing(&document);
            if check {
                return Ok(check_normalized(&project, &reporter, result));
            }
            if stdout {
                return Ok(match result {
                    Ok(effects) => {
                        print_normalized(&document, &effects)?;
                        ExitCode::SUCCESS
                    }
                    Err(err) => fail(&reporter, &err),
                });
            }
            Ok(finish(&mut document, None, &reporter, result))
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "zge-assist", &mut io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_dispatcher(editor: Option<&Path>) -> Result<Dispatcher> {
    let mut config = Config::load()?;
    if let Some(editor) = editor {
        config.editor.set_path(editor.display().to_string());
    }
    Dispatcher::new(config)
}

fn finish<'a>(
    document: &'a mut FileDocument,
    presentation: Option<&'a mut dyn Presentation>,
    reporter: &'a dyn Reporter,
    result: Result<Vec<Effect>, CommandError>,
) -> ExitCode {
    let mut adapter = Adapter {
        document,
        presentation,
        reporter,
    };
    match adapter.finish(result) {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

fn fail(reporter: &dyn Reporter, err: &CommandError) -> ExitCode {
    tracing::warn!(error = %err, "command failed");
    reporter.error(&err.to_string());
    ExitCode::FAILURE
}

fn check_normalized(
    project: &Path,
    reporter: &dyn Reporter,
    result: Result<Vec<Effect>, CommandError>,
) -> ExitCode {
    let effects = match result {
        Ok(effects) => effects,
        Err(err) => return fail(reporter, &err),
    };
    if effects
        .iter()
        .any(|effect| matches!(effect, Effect::ReplaceText(_)))
    {
        reporter.error(&format!(
            "{} has code blocks that need normalizing",
            project.display()
        ));
        return ExitCode::FAILURE;
    }
    for effect in effects {
        if let Effect::Status(message) = effect {
            reporter.status(&message);
        }
    }
    ExitCode::SUCCESS
}

fn print_normalized(document: &FileDocument, effects: &[Effect]) -> Result<()> {
    let text = effects
        .iter()
        .find_map(|effect| match effect {
            Effect::ReplaceText(text) => Some(text.as_str()),
            _ => None,
        })
        .unwrap_or(document.contents());
    let bytes = document.encode(text)?;
    let mut out = io::stdout().lock();
    out.write_all(&bytes).context("failed to write normalized document")?;
    Ok(())
}

fn print_fold_listing(text: &str, store: &FoldStore, effects: &[Effect]) -> Result<()> {
    let mut out = io::stdout().lock();
    for effect in effects {
        match effect {
            Effect::Fold(plan) => write_plan(&mut out, text, store, plan)?,
            Effect::Status(message) if !matches!(effects.first(), Some(Effect::Fold(_))) => {
                writeln!(out, "{message}")?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn write_plan(out: &mut impl Write, text: &str, store: &FoldStore, plan: &FoldPlan) -> Result<()> {
    for region in &plan.regions {
        let (start_line, start_col) = line_col(text, region.start());
        let (end_line, end_col) = line_col(text, region.end());
        let state = if store.is_collapsed(region.span) {
            "folded"
        } else {
            "open"
        };
        writeln!(
            out,
            "{start_line}:{start_col}-{end_line}:{end_col}\t{} bytes\t{state}",
            region.span.len()
        )?;
    }
    writeln!(
        out,
        "toggle would {} {} region(s)",
        plan.directive.as_str(),
        plan.regions.len()
    )?;
    Ok(())
}
