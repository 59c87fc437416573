//! Configuration management utilities.

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::app::folding::DEFAULT_FOLD_TAGS;
use crate::app::spacing::DEFAULT_CODE_TAGS;

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".zge-assist/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub editor: Editor,
    #[serde(default)]
    pub project: Project,
    #[serde(default)]
    pub folding: TagSet,
    #[serde(default = "TagSet::default_spacing")]
    pub spacing: TagSet,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            editor: Editor::default(),
            project: Project::default(),
            folding: TagSet::default(),
            spacing: TagSet::default_spacing(),
        }
    }
}

/// Location of the ZGameEditor binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Editor {
    #[serde(default)]
    path: Option<String>,
}

impl Editor {
    /// Configured editor path; blank values count as unset.
    pub fn path(&self) -> Option<PathBuf> {
        self.path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = Some(path.into());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default = "Project::default_extension")]
    pub extension: String,
    #[serde(default = "Project::default_artifact_extension")]
    pub artifact_extension: String,
}

impl Project {
    fn default_extension() -> String {
        "zgeproj".into()
    }

    fn default_artifact_extension() -> String {
        "exe".into()
    }

    /// Whether `path` carries the project extension.
    pub fn is_project(&self, path: &Path) -> bool {
        let wanted = self.extension.trim_start_matches('.');
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == wanted)
    }

    /// Build output next to the project: `game.zgeproj` becomes `game.exe`.
    pub fn artifact_for(&self, project: &Path) -> PathBuf {
        project.with_extension(self.artifact_extension.trim_start_matches('.'))
    }
}

impl Default for Project {
    fn default() -> Self {
        Self {
            extension: Self::default_extension(),
            artifact_extension: Self::default_artifact_extension(),
        }
    }
}

/// A set of tag names fed to one of the text passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet {
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TagSet {
    fn from_names(names: &[&str]) -> Self {
        Self {
            tags: names.iter().map(|name| (*name).to_owned()).collect(),
        }
    }

    fn default_spacing() -> Self {
        Self::from_names(DEFAULT_CODE_TAGS)
    }
}

impl Default for TagSet {
    fn default() -> Self {
        Self::from_names(DEFAULT_FOLD_TAGS)
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    editor_path: Option<String>,
    project_extension: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            editor_path: env::var("ZGE_EDITOR_PATH").ok(),
            project_extension: env::var("ZGE_PROJECT_EXTENSION").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(editor_path: &str, project_extension: &str) -> Self {
        Self {
            editor_path: Some(editor_path.to_owned()),
            project_extension: Some(project_extension.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, and env overrides.
    pub fn load() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            tracing::debug!(path = %global_path.display(), "loading user config");
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            tracing::debug!(path = %workspace_path.display(), "loading workspace config");
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            editor: Editor {
                path: other.editor.path.or(self.editor.path),
            },
            project: merge_project(self.project, other.project),
            folding: merge_tags(self.folding, other.folding),
            spacing: merge_tags(self.spacing, other.spacing),
        }
    }
}

fn merge_project(base: Project, overlay: Project) -> Project {
    Project {
        extension: if overlay.extension != Project::default_extension() {
            overlay.extension
        } else {
            base.extension
        },
        artifact_extension: if overlay.artifact_extension != Project::default_artifact_extension()
        {
            overlay.artifact_extension
        } else {
            base.artifact_extension
        },
    }
}

fn merge_tags(base: TagSet, overlay: TagSet) -> TagSet {
    let mut tags: BTreeSet<String> = base.tags.into_iter().collect();
    tags.extend(overlay.tags);
    TagSet {
        tags: tags.into_iter().collect(),
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("zge-assist/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    let root = find_repo_root(&cwd).unwrap_or(cwd);
    Ok(Some(root.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(path) = env.editor_path {
        config.editor.path = Some(path);
    }
    if let Some(extension) = env.project_extension {
        config.project.extension = extension;
    }
    config
}
