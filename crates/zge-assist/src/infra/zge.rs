//! ZGameEditor process invocation.

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

use crate::app::host::{BuildStatus, BuildTool};

/// Command-line switch that makes ZGameEditor build a standalone executable and exit.
const BUILD_FLAG: &str = "/b";

/// Drives the real ZGameEditor binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZgeEditor;

impl ZgeEditor {
    pub fn new() -> Self {
        Self
    }
}

impl BuildTool for ZgeEditor {
    fn build(&self, editor: &Path, project: &Path, artifact: &Path) -> Result<BuildStatus> {
        let status = Command::new(editor)
            .arg(BUILD_FLAG)
            .arg(project)
            .arg(artifact)
            .stdin(Stdio::null())
            .status()
            .with_context(|| format!("failed to spawn {}", editor.display()))?;
        tracing::debug!(?status, "build finished");
        Ok(status.into())
    }

    fn launch(&self, artifact: &Path) -> Result<()> {
        let mut command = Command::new(artifact);
        if let Some(dir) = artifact.parent()
            && !dir.as_os_str().is_empty()
        {
            command.current_dir(dir);
        }
        let child = command
            .spawn()
            .with_context(|| format!("failed to spawn {}", artifact.display()))?;
        tracing::debug!(pid = child.id(), "artifact started");
        Ok(())
    }

    fn open(&self, editor: &Path, project: &Path) -> Result<()> {
        let child = Command::new(editor)
            .arg(project)
            .spawn()
            .with_context(|| format!("failed to spawn {}", editor.display()))?;
        tracing::debug!(pid = child.id(), "editor started");
        Ok(())
    }
}
