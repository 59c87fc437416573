//! Canonical comment framing for CDATA code blocks.
//!
//! Every `<Name ...> <![CDATA[payload]]> </Name>` block for a configured set of code tags is
//! rewritten so the payload reads `//\n\n<code>\n\n//`. A previously applied frame is stripped
//! once from each end before the canonical one is applied again, which makes the pass
//! idempotent. Whitespace between the tags and the CDATA delimiters is left as found.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::model::{CodeBlock, Span};

/// Tags holding script source wrapped in CDATA.
pub const DEFAULT_CODE_TAGS: &[&str] = &[
    "BeforeInitExp",
    "Expression",
    "OnEmitExpression",
    "Source",
    "WhileExp",
];

pub const MARKER_PREFIX: &str = "//\n\n";
pub const MARKER_SUFFIX: &str = "\n\n//";

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

static APPLIED_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*//[ \t]*\n\n").expect("prefix pattern"));
static APPLIED_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\n[ \t]*//\s*$").expect("suffix pattern"));
static LEADING_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[ \t]*\n)+").expect("leading blank pattern"));
static TRAILING_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\n[ \t]*)+$").expect("trailing blank pattern"));

/// Result of normalizing a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeOutcome {
    /// No code block was found; the document is left as is.
    NoCodeBlocks,
    Normalized {
        text: String,
        /// Code blocks found.
        blocks: usize,
        /// Code blocks whose payload differs from the input.
        changed: usize,
    },
}

impl NormalizeOutcome {
    /// The resulting text, falling back to `original` when there was nothing to rewrite.
    pub fn into_text(self, original: &str) -> String {
        match self {
            NormalizeOutcome::NoCodeBlocks => original.to_owned(),
            NormalizeOutcome::Normalized { text, .. } => text,
        }
    }
}

/// Rewrites CDATA payloads of recognized code tags.
#[derive(Debug, Clone)]
pub struct SpacingNormalizer {
    block_head: Regex,
}

impl SpacingNormalizer {
    /// Compile a normalizer for the given tag names.
    pub fn new<I, S>(tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternation = tags
            .into_iter()
            .map(|tag| regex::escape(tag.as_ref()))
            .collect::<Vec<_>>()
            .join("|");
        if alternation.is_empty() {
            anyhow::bail!("code tag list is empty");
        }
        let block_head = Regex::new(&format!(
            r"<({alternation})\b([^>]*)>(\s*){}",
            regex::escape(CDATA_OPEN)
        ))
        .context("failed to compile code tag matcher")?;
        Ok(Self { block_head })
    }

    /// Normalizer for [`DEFAULT_CODE_TAGS`].
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CODE_TAGS).expect("default code tags compile")
    }

    /// Every code block in document order, all relative to the original text.
    pub fn blocks(&self, text: &str) -> Vec<CodeBlock> {
        let mut blocks = Vec::new();
        let mut cursor = 0;

        for caps in self.block_head.captures_iter(text) {
            let (Some(head), Some(name), Some(attrs), Some(ws_before)) =
                (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
            else {
                continue;
            };
            if head.start() < cursor || attrs.as_str().ends_with('/') {
                continue;
            }

            let payload_start = head.end();
            let Some(payload_len) = text[payload_start..].find(CDATA_CLOSE) else {
                continue;
            };
            let payload_end = payload_start + payload_len;
            let after_cdata = payload_end + CDATA_CLOSE.len();

            let rest = &text[after_cdata..];
            let ws_len = rest.len() - rest.trim_start().len();
            let close_start = after_cdata + ws_len;
            let closing = format!("</{}>", name.as_str());
            if !text[close_start..].starts_with(&closing) {
                tracing::debug!(
                    tag = name.as_str(),
                    at = head.start(),
                    "code block not closed by its tag"
                );
                continue;
            }
            let close_end = close_start + closing.len();

            blocks.push(CodeBlock {
                name: name.as_str().to_owned(),
                open: Span::new(head.start(), attrs.end() + 1),
                ws_before: Span::new(ws_before.start(), ws_before.end()),
                payload: Span::new(payload_start, payload_end),
                ws_after: Span::new(after_cdata, close_start),
                close: Span::new(close_start, close_end),
            });
            cursor = close_end;
        }

        blocks
    }

    /// Normalize every code block, computing all rewrites against the original text.
    pub fn normalize(&self, text: &str) -> NormalizeOutcome {
        let blocks = self.blocks(text);
        if blocks.is_empty() {
            return NormalizeOutcome::NoCodeBlocks;
        }

        let mut out = String::with_capacity(text.len() + blocks.len() * 8);
        let mut last = 0;
        let mut changed = 0;

        for block in &blocks {
            let payload = block.payload.slice(text);
            let framed = frame_payload(payload);
            if framed != payload {
                changed += 1;
            }
            out.push_str(&text[last..block.payload.start]);
            out.push_str(&framed);
            last = block.payload.end;
        }
        out.push_str(&text[last..]);

        tracing::debug!(blocks = blocks.len(), changed, "normalized code blocks");
        NormalizeOutcome::Normalized {
            text: out,
            blocks: blocks.len(),
            changed,
        }
    }
}

impl Default for SpacingNormalizer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Strip a previously applied frame from each end of `payload`, once.
///
/// Blank lines left between the stripped marker and the code are dropped with it, so the
/// canonical frame is always followed and preceded by exactly two newlines.
pub fn strip_frame(payload: &str) -> &str {
    let mut inner = match APPLIED_PREFIX.find(payload) {
        Some(found) => &payload[found.end()..],
        None => payload,
    };
    if let Some(found) = APPLIED_SUFFIX.find(inner) {
        inner = &inner[..found.start()];
    }
    if let Some(found) = LEADING_BLANK_LINES.find(inner) {
        inner = &inner[found.end()..];
    }
    if let Some(found) = TRAILING_BLANK_LINES.find(inner) {
        inner = &inner[..found.start()];
    }
    inner
}

/// Apply the canonical frame to `payload` after stripping any previous one.
pub fn frame_payload(payload: &str) -> String {
    let inner = strip_frame(payload);
    let mut framed = String::with_capacity(inner.len() + MARKER_PREFIX.len() + MARKER_SUFFIX.len());
    framed.push_str(MARKER_PREFIX);
    framed.push_str(inner);
    framed.push_str(MARKER_SUFFIX);
    framed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(tag: &str, payload: &str) -> String {
        format!("<ZExpression>\n  <{tag}>\n    <![CDATA[{payload}]]>\n  </{tag}>\n</ZExpression>\n")
    }

    fn payloads(text: &str) -> Vec<String> {
        SpacingNormalizer::with_defaults()
            .blocks(text)
            .iter()
            .map(|block| block.payload.slice(text).to_owned())
            .collect()
    }

    fn normalize(text: &str) -> String {
        SpacingNormalizer::with_defaults()
            .normalize(text)
            .into_text(text)
    }

    #[test]
    fn bare_payload_gets_framed() {
        let out = normalize(&wrap("Expression", "foo();"));
        assert_eq!(payloads(&out), vec!["//\n\nfoo();\n\n//"]);
    }

    #[test]
    fn framed_payload_is_unchanged() {
        let input = wrap("Expression", "//\n\nfoo();\n\n//");
        let outcome = SpacingNormalizer::with_defaults().normalize(&input);
        assert_eq!(
            outcome,
            NormalizeOutcome::Normalized {
                text: input.clone(),
                blocks: 1,
                changed: 0,
            }
        );
    }

    #[test]
    fn loose_markers_are_tightened() {
        let out = normalize(&wrap("Source", "// \n\n  bar();  \n\n //"));
        assert_eq!(payloads(&out), vec!["//\n\n  bar();  \n\n//"]);
        assert_eq!(strip_frame("// \n\n  bar();  \n\n //"), "  bar();  ");
    }

    #[test]
    fn user_comments_are_kept() {
        let out = normalize(&wrap("WhileExp", "// my custom note\ncode"));
        assert_eq!(payloads(&out), vec!["//\n\n// my custom note\ncode\n\n//"]);

        let out = normalize(&wrap("WhileExp", "code\n// trailing note"));
        assert_eq!(payloads(&out), vec!["//\n\ncode\n// trailing note\n\n//"]);
    }

    #[test]
    fn markers_are_stripped_only_once() {
        let out = normalize(&wrap("Expression", "//\n\n//\n\nx\n\n//\n\n//"));
        assert_eq!(payloads(&out), vec!["//\n\n//\n\nx\n\n//\n\n//"]);
    }

    #[test]
    fn frame_is_followed_by_exactly_two_newlines() {
        let out = normalize(&wrap("Expression", "\n\n\nfoo();\n\n\n"));
        assert_eq!(payloads(&out), vec!["//\n\nfoo();\n\n//"]);

        let out = normalize(&wrap("Expression", "//\n\n\n\n  foo();\n  \n\n//"));
        assert_eq!(payloads(&out), vec!["//\n\n  foo();\n\n//"]);
    }

    #[test]
    fn surrounding_whitespace_is_preserved() {
        let input = "<OnEmitExpression>\t \n<![CDATA[a=1;]]>\n\n\t</OnEmitExpression>";
        let out = normalize(input);
        assert_eq!(
            out,
            "<OnEmitExpression>\t \n<![CDATA[//\n\na=1;\n\n//]]>\n\n\t</OnEmitExpression>"
        );

        let blocks = SpacingNormalizer::with_defaults().blocks(&out);
        assert_eq!(blocks[0].ws_before.slice(&out), "\t \n");
        assert_eq!(blocks[0].ws_after.slice(&out), "\n\n\t");
        assert_eq!(blocks[0].open.slice(&out), "<OnEmitExpression>");
        assert_eq!(blocks[0].close.slice(&out), "</OnEmitExpression>");
    }

    #[test]
    fn every_block_is_rewritten_against_the_original() {
        let input = format!(
            "{}{}{}",
            wrap("BeforeInitExp", "a();"),
            wrap("Expression", "//\n\nb();\n\n//"),
            wrap("Source", "c();")
        );
        let outcome = SpacingNormalizer::with_defaults().normalize(&input);
        let NormalizeOutcome::Normalized {
            text,
            blocks,
            changed,
        } = outcome
        else {
            panic!("expected blocks");
        };
        assert_eq!(blocks, 3);
        assert_eq!(changed, 2);
        assert_eq!(
            payloads(&text),
            vec!["//\n\na();\n\n//", "//\n\nb();\n\n//", "//\n\nc();\n\n//"]
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "",
            "  ",
            "foo();",
            "//",
            "//\n\n//",
            "\n\nfoo\n\n",
            "// \n\n  bar();  \n\n //",
            "// note\n\nx\n// end",
            "\t//\t\n\nx\n\n\t//\t\n",
            "//\n\n\n\n//",
        ];
        for payload in samples {
            let once = normalize(&wrap("Expression", payload));
            let twice = normalize(&once);
            assert_eq!(once, twice, "payload {payload:?}");
            for framed in payloads(&once) {
                assert!(framed.starts_with(MARKER_PREFIX), "{framed:?}");
                assert!(framed.ends_with(MARKER_SUFFIX), "{framed:?}");
            }
        }
    }

    #[test]
    fn documents_without_code_blocks_are_untouched() {
        let input = "<Project><Icon>abc</Icon><Expression>no cdata</Expression></Project>";
        let outcome = SpacingNormalizer::with_defaults().normalize(input);
        assert_eq!(outcome, NormalizeOutcome::NoCodeBlocks);
        assert_eq!(outcome.into_text(input), input);
    }

    #[test]
    fn mismatched_closing_tag_is_not_a_block() {
        let input = "<Expression><![CDATA[x]]></Source><Source><![CDATA[y]]></Source>";
        assert_eq!(payloads(input), vec!["y"]);
    }

    #[test]
    fn tags_with_attributes_and_custom_sets() {
        let input = "<Source Lang=\"zc\"><![CDATA[x]]></Source>";
        assert_eq!(payloads(input), vec!["x"]);

        let normalizer = SpacingNormalizer::new(["Script"]).expect("normalizer");
        let outcome = normalizer.normalize(input);
        assert_eq!(outcome, NormalizeOutcome::NoCodeBlocks);
        let outcome = normalizer.normalize("<Script><![CDATA[z]]></Script>");
        assert_eq!(
            outcome.into_text(""),
            "<Script><![CDATA[//\n\nz\n\n//]]></Script>"
        );
    }
}
