//! Project files on disk as the active document.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tempfile::NamedTempFile;

use crate::app::host::ActiveDocument;
use crate::infra::line_endings;

/// Character encoding detected when a document is opened.
///
/// Project files declare `iso-8859-1`, but most are plain ASCII or were saved as UTF-8. Bytes
/// that do not form valid UTF-8 are read as Latin-1, one byte per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Latin1,
}

impl Encoding {
    fn decode(bytes: Vec<u8>) -> (String, Self) {
        match String::from_utf8(bytes) {
            Ok(text) => (text, Encoding::Utf8),
            Err(err) => {
                let text = err.into_bytes().into_iter().map(char::from).collect();
                (text, Encoding::Latin1)
            }
        }
    }

    fn encode(self, text: &str) -> Result<Vec<u8>> {
        match self {
            Encoding::Utf8 => Ok(text.as_bytes().to_vec()),
            Encoding::Latin1 => text
                .chars()
                .map(|ch| {
                    u8::try_from(ch)
                        .map_err(|_| anyhow!("{ch:?} cannot be written to an ISO-8859-1 file"))
                })
                .collect(),
        }
    }
}

/// A document backed by a file. Text is handed out with `\n` line endings; on write every
/// line the edit left alone keeps its original terminator and the file keeps its encoding.
#[derive(Debug, Clone)]
pub struct FileDocument {
    path: PathBuf,
    /// Decoded contents with the terminators found on disk.
    raw: String,
    text: String,
    encoding: Encoding,
}

impl FileDocument {
    /// Read `path` into memory. Relative paths are resolved against the working directory.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let path = std::path::absolute(&path)
            .with_context(|| format!("failed to resolve {}", path.display()))?;
        let bytes = fs::read(&path)
            .with_context(|| format!("failed to read project file {}", path.display()))?;
        let (raw, encoding) = Encoding::decode(bytes);
        if encoding == Encoding::Latin1 {
            tracing::debug!(path = %path.display(), "not UTF-8, reading as ISO-8859-1");
        }
        let text = line_endings::to_lf(&raw);
        Ok(Self {
            path,
            raw,
            text,
            encoding,
        })
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Current text with `\n` line endings.
    pub fn contents(&self) -> &str {
        &self.text
    }

    /// Bytes to store for `text`, an edit of [`contents`](Self::contents).
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        self.encoding.encode(&line_endings::restore(&self.raw, text))
    }

    fn write_atomically(&self, bytes: &[u8]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut temp = NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
        temp.write_all(bytes).context("failed to write temporary file")?;
        temp.persist(&self.path)
            .map_err(|err| err.error)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

impl ActiveDocument for FileDocument {
    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn text(&self) -> Result<String> {
        Ok(self.text.clone())
    }

    fn replace(&mut self, text: &str) -> Result<()> {
        let raw = line_endings::restore(&self.raw, text);
        self.write_atomically(&self.encoding.encode(&raw)?)?;
        self.raw = raw;
        self.text = text.to_owned();
        tracing::debug!(path = %self.path.display(), bytes = text.len(), "document replaced");
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        // Contents only ever change through `replace`, which writes through.
        Ok(())
    }
}
