//! Interfaces to whatever hosts the commands: an editor plugin, or the CLI adapters in
//! [`crate::infra`].

use std::path::Path;

use anyhow::Result;

use crate::domain::model::{FoldPlan, Span};

/// The document the user is working on.
pub trait ActiveDocument {
    /// Path on disk, if the document has been saved at least once.
    fn path(&self) -> Option<&Path>;

    /// Full text content as currently held by the host.
    fn text(&self) -> Result<String>;

    /// Replace the full text in one step.
    fn replace(&mut self, text: &str) -> Result<()>;

    /// Persist the document before an external tool reads it.
    fn save(&mut self) -> Result<()>;
}

/// Fold state owned by the presentation layer.
pub trait Presentation {
    fn is_collapsed(&self, span: Span) -> bool;

    fn apply(&mut self, plan: &FoldPlan) -> Result<()>;
}

/// Exit status of a finished build-mode invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStatus {
    /// Exit code, or `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl BuildStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for BuildStatus {
    fn from(value: std::process::ExitStatus) -> Self {
        Self { code: value.code() }
    }
}

/// The external ZGameEditor binary.
pub trait BuildTool {
    /// Build `project` into `artifact`, blocking until the editor exits.
    fn build(&self, editor: &Path, project: &Path, artifact: &Path) -> Result<BuildStatus>;

    /// Start the built artifact without waiting for it.
    fn launch(&self, artifact: &Path) -> Result<()>;

    /// Open `project` in the editor without waiting for it.
    fn open(&self, editor: &Path, project: &Path) -> Result<()>;
}

/// Where user-facing messages go.
pub trait Reporter {
    /// Transient, informational notice.
    fn status(&self, message: &str);

    /// Blocking error the user has to acknowledge.
    fn error(&self, message: &str);
}
