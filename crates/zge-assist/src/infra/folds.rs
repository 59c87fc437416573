//! Fold state persistence for the command line.
//!
//! Outside an editor nothing remembers which regions are collapsed, so the CLI keeps that
//! state in a JSON file next to the project. Entries recorded against a different document
//! length are stale and read as "nothing collapsed".

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::app::host::Presentation;
use crate::domain::model::{FoldDirective, FoldPlan, Span};

const STATE_DIR: &str = ".zge-assist";
const STATE_FILE: &str = "folds.json";

/// Collapsed spans of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldRecord {
    /// Byte length of the document when the spans were recorded.
    pub text_len: usize,
    pub collapsed: BTreeSet<Span>,
}

/// On-disk layout: file name to record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldSnapshot {
    pub documents: BTreeMap<String, FoldRecord>,
}

/// Presentation layer that remembers folds between invocations.
#[derive(Debug, Clone)]
pub struct FoldStore {
    path: PathBuf,
    key: String,
    text_len: usize,
    snapshot: FoldSnapshot,
}

impl FoldStore {
    /// Open the fold state for `document`, whose current text is `text_len` bytes long.
    pub fn open(document: &Path, text_len: usize) -> Result<Self> {
        let root = match document.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let key = document
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .context("document path has no file name")?;
        let path = root.join(STATE_DIR).join(STATE_FILE);

        let snapshot = if path.exists() {
            let data = fs::read_to_string(&path)
                .with_context(|| format!("failed to read fold state at {}", path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("invalid fold state in {}", path.display()))?
        } else {
            FoldSnapshot::default()
        };

        Ok(Self {
            path,
            key,
            text_len,
            snapshot,
        })
    }

    /// Location of the persisted state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Spans currently collapsed for this document.
    pub fn collapsed(&self) -> Vec<Span> {
        self.record()
            .map(|record| record.collapsed.iter().copied().collect())
            .unwrap_or_default()
    }

    fn record(&self) -> Option<&FoldRecord> {
        self.snapshot
            .documents
            .get(&self.key)
            .filter(|record| record.text_len == self.text_len)
    }

    fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create state directory {}", dir.display()))?;
        }
        let data = serde_json::to_string_pretty(&self.snapshot)
            .context("failed to serialize fold state")?;
        fs::write(&self.path, data)
            .with_context(|| format!("failed to write fold state to {}", self.path.display()))?;
        Ok(())
    }
}

impl Presentation for FoldStore {
    fn is_collapsed(&self, span: Span) -> bool {
        self.record()
            .is_some_and(|record| record.collapsed.contains(&span))
    }

    fn apply(&mut self, plan: &FoldPlan) -> Result<()> {
        let text_len = self.text_len;
        let record = self.snapshot.documents.entry(self.key.clone()).or_default();
        if record.text_len != text_len {
            *record = FoldRecord {
                text_len,
                collapsed: BTreeSet::new(),
            };
        }

        for region in &plan.regions {
            match plan.directive {
                FoldDirective::Fold => {
                    record.collapsed.insert(region.span);
                }
                FoldDirective::Unfold => {
                    record.collapsed.remove(&region.span);
                }
            }
        }
        self.save()
    }
}
