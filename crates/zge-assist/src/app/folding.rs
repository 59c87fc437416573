//! Locating collapsible embedded-data sections.
//!
//! The locator is not an XML parser. It finds `<Name ...>` for a configured set of names and
//! pairs it with the nearest following `</Name>`; whatever lies between is opaque text. Nested
//! tags of the same name therefore pair the outer opening tag with the inner closing tag.

use anyhow::{Context, Result};
use regex::Regex;

use crate::domain::model::{FoldDirective, FoldPlan, FoldRegion, Span, TagMatch};

/// Container tags whose contents are large embedded data blobs.
pub const DEFAULT_FOLD_TAGS: &[&str] = &[
    "BitmapFile",
    "FileEmbedded",
    "Icon",
    "MeshData",
    "MusicFile",
    "SampleData",
    "SpriteData",
    "Values",
];

/// Result of scanning a document for fold regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocateOutcome {
    /// No recognized container tag occurs in the document.
    NoMatches,
    /// Tags were found but every one of them was empty.
    AllEmpty { matched: usize },
    /// Non-empty regions in document order.
    Regions(Vec<FoldRegion>),
}

impl LocateOutcome {
    pub fn regions(&self) -> &[FoldRegion] {
        match self {
            LocateOutcome::Regions(regions) => regions,
            _ => &[],
        }
    }
}

/// Finds the inner content of recognized container tags.
#[derive(Debug, Clone)]
pub struct TagBlockLocator {
    open_tag: Regex,
}

impl TagBlockLocator {
    /// Compile a locator for the given tag names.
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
            anyhow::bail!("fold tag list is empty");
        }
        let open_tag = Regex::new(&format!(r"<({alternation})\b([^>]*)>"))
            .context("failed to compile fold tag matcher")?;
        Ok(Self { open_tag })
    }

    /// Locator for [`DEFAULT_FOLD_TAGS`].
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_FOLD_TAGS).expect("default fold tags compile")
    }

    /// Every outermost tag occurrence in document order, including empty ones.
    pub fn tags(&self, text: &str) -> Vec<TagMatch> {
        let mut matches = Vec::new();
        let mut cursor = 0;

        for caps in self.open_tag.captures_iter(text) {
            let (Some(whole), Some(name), Some(attrs)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            if whole.start() < cursor || attrs.as_str().ends_with('/') {
                continue;
            }

            let closing = format!("</{}>", name.as_str());
            let Some(offset) = text[whole.end()..].find(&closing) else {
                tracing::debug!(tag = name.as_str(), at = whole.start(), "unclosed tag");
                continue;
            };
            let close_start = whole.end() + offset;
            let close_end = close_start + closing.len();

            matches.push(TagMatch {
                name: name.as_str().to_owned(),
                open: Span::new(whole.start(), whole.end()),
                inner: Span::new(whole.end(), close_start),
                close: Span::new(close_start, close_end),
            });
            cursor = close_end;
        }

        matches
    }

    /// Fold regions for every non-empty tag occurrence.
    pub fn locate(&self, text: &str) -> LocateOutcome {
        let tags = self.tags(text);
        if tags.is_empty() {
            return LocateOutcome::NoMatches;
        }

        let regions: Vec<FoldRegion> = tags
            .iter()
            .filter(|tag| !tag.inner.is_empty())
            .map(FoldRegion::from)
            .collect();

        if regions.is_empty() {
            LocateOutcome::AllEmpty {
                matched: tags.len(),
            }
        } else {
            LocateOutcome::Regions(regions)
        }
    }
}

impl Default for TagBlockLocator {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Decide one directive for all regions from the state of the first.
///
/// A collapsed first region means everything gets unfolded; otherwise everything gets folded.
/// Mixed states are not tracked per region.
pub fn plan_toggle<F>(regions: Vec<FoldRegion>, is_collapsed: F) -> Option<FoldPlan>
where
    F: Fn(Span) -> bool,
{
    let first = regions.first()?;
    let directive = if is_collapsed(first.span) {
        FoldDirective::Unfold
    } else {
        FoldDirective::Fold
    };
    Some(FoldPlan { regions, directive })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inner<'a>(text: &'a str, region: &FoldRegion) -> &'a str {
        region.span.slice(text)
    }

    #[test]
    fn single_icon_block_yields_one_region() {
        let text = "<Project>\n  <Icon>\n    ABCDEF\n  </Icon>\n</Project>\n";
        let locator = TagBlockLocator::with_defaults();
        let outcome = locator.locate(text);

        let regions = outcome.regions();
        assert_eq!(regions.len(), 1);
        assert_eq!(inner(text, &regions[0]), "\n    ABCDEF\n  ");

        let plan = plan_toggle(regions.to_vec(), |_| false).expect("plan");
        assert_eq!(plan.directive, FoldDirective::Fold);
        assert_eq!(plan.regions.len(), 1);
    }

    #[test]
    fn regions_follow_document_order_and_exclude_delimiters() {
        let text = concat!(
            "<Bitmap><BitmapFile Width=\"2\">0011</BitmapFile></Bitmap>\n",
            "<Sound><SampleData>ff00</SampleData></Sound>\n",
            "<Mesh><MeshData Compressed=\"1\">xyz</MeshData></Mesh>\n",
        );
        let outcome = TagBlockLocator::with_defaults().locate(text);
        let slices: Vec<&str> = outcome
            .regions()
            .iter()
            .map(|region| inner(text, region))
            .collect();
        assert_eq!(slices, vec!["0011", "ff00", "xyz"]);

        let starts: Vec<usize> = outcome.regions().iter().map(FoldRegion::start).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
    }

    #[test]
    fn no_tags_is_distinct_from_all_empty() {
        let locator = TagBlockLocator::with_defaults();
        assert_eq!(
            locator.locate("<Project><Name>x</Name></Project>"),
            LocateOutcome::NoMatches
        );
        assert_eq!(
            locator.locate("<Icon></Icon><Values></Values>"),
            LocateOutcome::AllEmpty { matched: 2 }
        );
    }

    #[test]
    fn empty_blocks_are_skipped_among_populated_ones() {
        let text = "<Icon></Icon><Values>1 2 3</Values>";
        let outcome = TagBlockLocator::with_defaults().locate(text);
        assert_eq!(outcome.regions().len(), 1);
        assert_eq!(inner(text, &outcome.regions()[0]), "1 2 3");
    }

    #[test]
    fn tag_names_must_match_exactly() {
        let text = "<Icons>data</Icons><IconX>data</IconX>";
        assert_eq!(
            TagBlockLocator::with_defaults().locate(text),
            LocateOutcome::NoMatches
        );
    }

    #[test]
    fn closing_tag_must_share_the_name() {
        let text = "<Icon>abc</Values> tail </Icon>";
        let outcome = TagBlockLocator::with_defaults().locate(text);
        assert_eq!(outcome.regions().len(), 1);
        assert_eq!(inner(text, &outcome.regions()[0]), "abc</Values> tail ");
    }

    #[test]
    fn self_closing_and_unclosed_tags_are_ignored() {
        let locator = TagBlockLocator::with_defaults();
        assert_eq!(locator.locate("<Icon/><Values />"), LocateOutcome::NoMatches);
        assert_eq!(locator.locate("<Icon>never closed"), LocateOutcome::NoMatches);
    }

    #[test]
    fn nested_same_name_pairs_with_nearest_close() {
        let text = "<Values>a<Values>b</Values>c</Values>";
        let tags = TagBlockLocator::with_defaults().tags(text);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].inner.slice(text), "a<Values>b");
    }

    #[test]
    fn custom_tag_sets_are_honored() {
        let locator = TagBlockLocator::new(["Blob"]).expect("locator");
        let text = "<Icon>x</Icon><Blob>y</Blob>";
        let outcome = locator.locate(text);
        assert_eq!(outcome.regions().len(), 1);
        assert_eq!(inner(text, &outcome.regions()[0]), "y");
        assert!(TagBlockLocator::new(Vec::<String>::new()).is_err());
    }

    #[test]
    fn toggle_uses_first_region_state_for_all() {
        let regions = vec![
            FoldRegion {
                span: Span::new(1, 4),
            },
            FoldRegion {
                span: Span::new(10, 14),
            },
        ];
        let plan = plan_toggle(regions.clone(), |span| span.start == 1).expect("plan");
        assert_eq!(plan.directive, FoldDirective::Unfold);
        assert_eq!(plan.regions, regions);

        let plan = plan_toggle(regions, |span| span.start == 10).expect("plan");
        assert_eq!(plan.directive, FoldDirective::Fold);

        assert!(plan_toggle(Vec::new(), |_| true).is_none());
    }
}
