//! Domain-specific errors.

use std::path::PathBuf;

use thiserror::Error;

/// Problems with the external editor configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ZGameEditor path is not configured (set [editor] path or ZGE_EDITOR_PATH)")]
    EditorPathUnset,
    #[error("ZGameEditor not found: {}", .0.display())]
    EditorNotFound(PathBuf),
}

/// Failures surfaced to the user by a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("not a project file: {}", display_optional(.0))]
    NotAProject(Option<PathBuf>),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("build failed: {reason}")]
    BuildFailed { reason: String },
    #[error("failed to launch {}: {source}", .path.display())]
    LaunchFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("document error: {0}")]
    Document(#[source] anyhow::Error),
    #[error("presentation error: {0}")]
    Presentation(#[source] anyhow::Error),
}

fn display_optional(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "<unsaved document>".into(),
    }
}
