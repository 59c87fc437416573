//! Domain models for located tags, fold regions, code blocks, and effects.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Half-open byte span `[start, end)` into a document's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {start} exceeds end {end}");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Borrow the spanned slice of `text`.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.range()]
    }
}

impl From<Range<usize>> for Span {
    fn from(value: Range<usize>) -> Self {
        Self::new(value.start, value.end)
    }
}

/// One located container tag: `<Name ...>inner</Name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatch {
    pub name: String,
    pub open: Span,
    pub inner: Span,
    pub close: Span,
}

/// Inner content of a container tag that can be collapsed by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldRegion {
    pub span: Span,
}

impl FoldRegion {
    pub fn start(&self) -> usize {
        self.span.start
    }

    pub fn end(&self) -> usize {
        self.span.end
    }
}

impl From<&TagMatch> for FoldRegion {
    fn from(value: &TagMatch) -> Self {
        Self { span: value.inner }
    }
}

/// A code tag wrapping a CDATA section.
///
/// ```text
/// <Expression>  <![CDATA[payload]]>  </Expression>
/// ^open        ^ws_before ^payload   ^ws_after ^close
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub name: String,
    pub open: Span,
    pub ws_before: Span,
    pub payload: Span,
    pub ws_after: Span,
    pub close: Span,
}

/// Whether regions should be collapsed or expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FoldDirective {
    Fold,
    Unfold,
}

impl FoldDirective {
    pub fn as_str(&self) -> &'static str {
        match self {
            FoldDirective::Fold => "fold",
            FoldDirective::Unfold => "unfold",
        }
    }
}

/// Regions paired with the directive to apply to every one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldPlan {
    pub regions: Vec<FoldRegion>,
    pub directive: FoldDirective,
}

/// Effect computed by a command and applied by an editor adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Replace the whole document text atomically.
    ReplaceText(String),
    /// Fold or unfold the listed regions.
    Fold(FoldPlan),
    /// Informational message; nothing else to apply.
    Status(String),
}

/// 1-based line/column of a byte offset, for display.
pub fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset.min(text.len())];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => before[newline + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}
