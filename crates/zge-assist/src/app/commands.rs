//! Project commands and the adapter that applies their effects.
//!
//! Commands compute [`Effect`]s from the active document and configuration. An [`Adapter`]
//! then applies them to the host's document, fold state, and message sink. Only the build and
//! edit commands touch the outside world while computing, since they have to drive the editor
//! process.

use std::path::PathBuf;

use anyhow::{Result, anyhow};

use crate::app::folding::{LocateOutcome, TagBlockLocator, plan_toggle};
use crate::app::host::{ActiveDocument, BuildTool, Presentation, Reporter};
use crate::app::spacing::{NormalizeOutcome, SpacingNormalizer};
use crate::domain::errors::{CommandError, ConfigError};
use crate::domain::model::{Effect, FoldDirective, Span};
use crate::infra::config::Config;

/// Commands offered on project files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Build the project with ZGameEditor and start the result.
    RunProject,
    /// Open the project in ZGameEditor.
    EditProject,
    /// Collapse or expand embedded data blocks.
    ToggleFolds,
    /// Reframe CDATA code blocks with the canonical comment markers.
    NormalizeSpacing,
}

impl Command {
    pub const ALL: [Command; 4] = [
        Command::RunProject,
        Command::EditProject,
        Command::ToggleFolds,
        Command::NormalizeSpacing,
    ];
}

/// Routes commands for the active document.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: Config,
    locator: TagBlockLocator,
    normalizer: SpacingNormalizer,
}

impl Dispatcher {
    /// Compile the configured tag sets.
    pub fn new(config: Config) -> Result<Self> {
        let locator = TagBlockLocator::new(&config.folding.tags)?;
        let normalizer = SpacingNormalizer::new(&config.spacing.tags)?;
        Ok(Self {
            config,
            locator,
            normalizer,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Every command requires a saved project file.
    pub fn is_enabled(&self, _command: Command, document: &dyn ActiveDocument) -> bool {
        document
            .path()
            .is_some_and(|path| self.config.project.is_project(path))
    }

    /// Commands available for `document`, in menu order.
    pub fn enabled_commands(&self, document: &dyn ActiveDocument) -> Vec<Command> {
        Command::ALL
            .into_iter()
            .filter(|command| self.is_enabled(*command, document))
            .collect()
    }

    /// Build the project, wait for the editor to exit, then start the artifact.
    pub fn run_project(
        &self,
        document: &mut dyn ActiveDocument,
        tool: &dyn BuildTool,
    ) -> Result<Vec<Effect>, CommandError> {
        let project = self.project_path(Command::RunProject, document)?;
        let editor = self.editor_path()?;
        let artifact = self.config.project.artifact_for(&project);

        document.save().map_err(CommandError::Document)?;

        tracing::info!(
            editor = %editor.display(),
            project = %project.display(),
            artifact = %artifact.display(),
            "building project"
        );
        let status = tool
            .build(&editor, &project, &artifact)
            .map_err(|err| CommandError::BuildFailed {
                reason: format!("could not start {}: {err:#}", editor.display()),
            })?;

        if !status.success() {
            let code = status
                .code
                .map_or_else(|| "a signal".to_owned(), |code| format!("code {code}"));
            return Err(CommandError::BuildFailed {
                reason: format!("ZGameEditor exited with {code}"),
            });
        }
        if !artifact.is_file() {
            return Err(CommandError::BuildFailed {
                reason: format!("{} was not created", artifact.display()),
            });
        }

        tool.launch(&artifact)
            .map_err(|source| CommandError::LaunchFailed {
                path: artifact.clone(),
                source,
            })?;

        Ok(vec![Effect::Status(format!("Running {}", artifact.display()))])
    }

    /// Open the project in the editor without waiting for it.
    pub fn edit_project(
        &self,
        document: &dyn ActiveDocument,
        tool: &dyn BuildTool,
    ) -> Result<Vec<Effect>, CommandError> {
        let project = self.project_path(Command::EditProject, document)?;
        let editor = self.editor_path()?;

        tracing::info!(editor = %editor.display(), project = %project.display(), "opening project");
        tool.open(&editor, &project)
            .map_err(|source| CommandError::LaunchFailed {
                path: editor.clone(),
                source,
            })?;

        Ok(vec![Effect::Status(format!(
            "Opened {} in ZGameEditor",
            project.display()
        ))])
    }

    /// Fold everything when the first data block is expanded, unfold everything otherwise.
    pub fn toggle_folds(
        &self,
        document: &dyn ActiveDocument,
        presentation: &dyn Presentation,
    ) -> Result<Vec<Effect>, CommandError> {
        self.project_path(Command::ToggleFolds, document)?;
        let text = document.text().map_err(CommandError::Document)?;
        Ok(self.fold_effects(&text, |span| presentation.is_collapsed(span)))
    }

    /// Reframe every code block; leaves the document alone when nothing changes.
    pub fn normalize_spacing(
        &self,
        document: &dyn ActiveDocument,
    ) -> Result<Vec<Effect>, CommandError> {
        self.project_path(Command::NormalizeSpacing, document)?;
        let text = document.text().map_err(CommandError::Document)?;
        Ok(self.normalize_effects(&text))
    }

    /// Effects of toggling folds on `text`.
    pub fn fold_effects<F>(&self, text: &str, is_collapsed: F) -> Vec<Effect>
    where
        F: Fn(Span) -> bool,
    {
        let regions = match self.locator.locate(text) {
            LocateOutcome::NoMatches => {
                return vec![Effect::Status("No foldable regions found".into())];
            }
            LocateOutcome::AllEmpty { matched } => {
                return vec![Effect::Status(format!(
                    "No foldable regions found ({matched} data block(s), all empty)"
                ))];
            }
            LocateOutcome::Regions(regions) => regions,
        };

        let Some(plan) = plan_toggle(regions, is_collapsed) else {
            return vec![Effect::Status("No foldable regions found".into())];
        };
        let verb = match plan.directive {
            FoldDirective::Fold => "Folded",
            FoldDirective::Unfold => "Unfolded",
        };
        let message = format!("{verb} {} region(s)", plan.regions.len());
        vec![Effect::Fold(plan), Effect::Status(message)]
    }

    /// Effects of normalizing code spacing in `text`.
    pub fn normalize_effects(&self, text: &str) -> Vec<Effect> {
        match self.normalizer.normalize(text) {
            NormalizeOutcome::NoCodeBlocks => vec![Effect::Status("No code blocks found".into())],
            NormalizeOutcome::Normalized { blocks, changed, .. } if changed == 0 => {
                vec![Effect::Status(format!(
                    "Code spacing already normalized ({blocks} block(s))"
                ))]
            }
            NormalizeOutcome::Normalized {
                text,
                blocks,
                changed,
            } => vec![
                Effect::ReplaceText(text),
                Effect::Status(format!("Normalized {changed} of {blocks} code block(s)")),
            ],
        }
    }

    fn project_path(
        &self,
        command: Command,
        document: &dyn ActiveDocument,
    ) -> Result<PathBuf, CommandError> {
        if !self.is_enabled(command, document) {
            return Err(CommandError::NotAProject(
                document.path().map(|path| path.to_path_buf()),
            ));
        }
        document
            .path()
            .map(|path| path.to_path_buf())
            .ok_or(CommandError::NotAProject(None))
    }

    fn editor_path(&self) -> Result<PathBuf, ConfigError> {
        let path = self
            .config
            .editor
            .path()
            .ok_or(ConfigError::EditorPathUnset)?;
        if !path.is_file() {
            return Err(ConfigError::EditorNotFound(path));
        }
        Ok(path)
    }
}

/// Applies command effects to a host.
pub struct Adapter<'a> {
    pub document: &'a mut dyn ActiveDocument,
    pub presentation: Option<&'a mut dyn Presentation>,
    pub reporter: &'a dyn Reporter,
}

impl Adapter<'_> {
    /// Apply `result` or report its error; errors are returned after reporting.
    pub fn finish(&mut self, result: Result<Vec<Effect>, CommandError>) -> Result<(), CommandError> {
        let outcome = result.and_then(|effects| self.apply(effects));
        if let Err(err) = &outcome {
            tracing::warn!(error = %err, "command failed");
            self.reporter.error(&err.to_string());
        }
        outcome
    }

    /// Apply effects in order.
    pub fn apply(&mut self, effects: Vec<Effect>) -> Result<(), CommandError> {
        for effect in effects {
            match effect {
                Effect::ReplaceText(text) => {
                    self.document
                        .replace(&text)
                        .map_err(CommandError::Document)?;
                }
                Effect::Fold(plan) => {
                    let presentation = self.presentation.as_deref_mut().ok_or_else(|| {
                        CommandError::Presentation(anyhow!("no presentation layer to fold in"))
                    })?;
                    presentation
                        .apply(&plan)
                        .map_err(CommandError::Presentation)?;
                }
                Effect::Status(message) => self.reporter.status(&message),
            }
        }
        Ok(())
    }
}
