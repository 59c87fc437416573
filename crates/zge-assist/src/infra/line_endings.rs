//! Per-line terminator bookkeeping for documents edited as `\n`-only text.
//!
//! The text passes only ever see `\n`. When an edited text goes back to disk, lines that
//! survived the edit keep the terminator they had, and lines the edit introduced take the
//! terminator of the line they replaced (or the file's dominant one). Old and new lines are
//! aligned on lines that occur exactly once on both sides, after trimming common prefixes and
//! suffixes.

use std::collections::HashMap;
use std::ops::Range;

const LF: &str = "\n";
const CRLF: &str = "\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Line<'a> {
    text: &'a str,
    ending: &'static str,
}

impl Line<'_> {
    fn same(&self, other: &Line<'_>) -> bool {
        self.text == other.text && self.ending.is_empty() == other.ending.is_empty()
    }

    fn key(&self) -> (&str, bool) {
        (self.text, self.ending.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Chunk {
    Same(usize),
    Changed { old: Range<usize>, new: Range<usize> },
}

/// `raw` with every `\r\n` turned into `\n`.
pub fn to_lf(raw: &str) -> String {
    raw.replace(CRLF, LF)
}

/// Render `text` (an edit of `to_lf(original)`) with the terminators of `original`.
pub fn restore(original: &str, text: &str) -> String {
    if !original.contains(CRLF) {
        return text.to_owned();
    }

    let old = split(original);
    let new = split(text);
    let fallback = dominant(&old);

    let mut chunks = Vec::new();
    diff_into(&old, &new, 0, 0, &mut chunks);

    let mut out = String::with_capacity(original.len().max(text.len()));
    for chunk in chunks {
        match chunk {
            Chunk::Same(index) => {
                out.push_str(old[index].text);
                out.push_str(old[index].ending);
            }
            Chunk::Changed { old: replaced, new: inserted } => {
                let ending = replaced
                    .last()
                    .map(|index| old[index].ending)
                    .filter(|ending| !ending.is_empty())
                    .unwrap_or(fallback);
                for line in &new[inserted] {
                    out.push_str(line.text);
                    if !line.ending.is_empty() {
                        out.push_str(ending);
                    }
                }
            }
        }
    }
    out
}

fn split(text: &str) -> Vec<Line<'_>> {
    text.split_inclusive('\n')
        .map(|piece| {
            if let Some(body) = piece.strip_suffix(CRLF) {
                Line {
                    text: body,
                    ending: CRLF,
                }
            } else if let Some(body) = piece.strip_suffix(LF) {
                Line {
                    text: body,
                    ending: LF,
                }
            } else {
                Line {
                    text: piece,
                    ending: "",
                }
            }
        })
        .collect()
}

fn dominant(lines: &[Line<'_>]) -> &'static str {
    let crlf = lines.iter().filter(|line| line.ending == CRLF).count();
    let lf = lines.iter().filter(|line| line.ending == LF).count();
    if crlf > lf { CRLF } else { LF }
}

/// Emits chunks covering every line of `new` in order. Indices in `Same` point into the
/// outermost `old`; `old_at`/`new_at` are the offsets of these slices within it.
fn diff_into(
    old: &[Line<'_>],
    new: &[Line<'_>],
    old_at: usize,
    new_at: usize,
    chunks: &mut Vec<Chunk>,
) {
    let prefix = old
        .iter()
        .zip(new)
        .take_while(|(a, b)| a.same(b))
        .count();
    chunks.extend((0..prefix).map(|i| Chunk::Same(old_at + i)));

    let (old, new) = (&old[prefix..], &new[prefix..]);
    let (old_at, new_at) = (old_at + prefix, new_at + prefix);
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take_while(|(a, b)| a.same(b))
        .count();
    let (old_mid, new_mid) = (&old[..old.len() - suffix], &new[..new.len() - suffix]);

    let anchors = unique_anchors(old_mid, new_mid);
    if anchors.is_empty() {
        if !old_mid.is_empty() || !new_mid.is_empty() {
            chunks.push(Chunk::Changed {
                old: old_at..old_at + old_mid.len(),
                new: new_at..new_at + new_mid.len(),
            });
        }
    } else {
        let (mut old_from, mut new_from) = (0, 0);
        for (i, j) in anchors {
            diff_into(
                &old_mid[old_from..i],
                &new_mid[new_from..j],
                old_at + old_from,
                new_at + new_from,
                chunks,
            );
            chunks.push(Chunk::Same(old_at + i));
            (old_from, new_from) = (i + 1, j + 1);
        }
        diff_into(
            &old_mid[old_from..],
            &new_mid[new_from..],
            old_at + old_from,
            new_at + new_from,
            chunks,
        );
    }

    let tail = old_at + old_mid.len();
    chunks.extend((0..suffix).map(|i| Chunk::Same(tail + i)));
}

/// Pairs of lines unique on both sides, reduced to the longest run increasing in both.
fn unique_anchors(old: &[Line<'_>], new: &[Line<'_>]) -> Vec<(usize, usize)> {
    #[derive(Default)]
    struct Seen {
        old: (usize, usize),
        new: (usize, usize),
    }

    let mut seen: HashMap<(&str, bool), Seen> = HashMap::new();
    for (index, line) in old.iter().enumerate() {
        let entry = seen.entry(line.key()).or_default();
        entry.old = (entry.old.0 + 1, index);
    }
    for (index, line) in new.iter().enumerate() {
        let entry = seen.entry(line.key()).or_default();
        entry.new = (entry.new.0 + 1, index);
    }

    let mut pairs: Vec<(usize, usize)> = seen
        .into_values()
        .filter(|entry| entry.old.0 == 1 && entry.new.0 == 1)
        .map(|entry| (entry.old.1, entry.new.1))
        .collect();
    pairs.sort_unstable();
    longest_increasing(&pairs)
}

/// Longest subsequence of `pairs` (sorted by old index) whose new indices increase.
fn longest_increasing(pairs: &[(usize, usize)]) -> Vec<(usize, usize)> {
    // tails[k]: index into `pairs` ending the best run of length k + 1.
    let mut tails: Vec<usize> = Vec::new();
    let mut previous: Vec<Option<usize>> = vec![None; pairs.len()];
    for (index, &(_, new)) in pairs.iter().enumerate() {
        let slot = tails.partition_point(|&tail| pairs[tail].1 < new);
        previous[index] = slot.checked_sub(1).map(|before| tails[before]);
        if slot == tails.len() {
            tails.push(index);
        } else {
            tails[slot] = index;
        }
    }

    let mut run = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(index) = cursor {
        run.push(pairs[index]);
        cursor = previous[index];
    }
    run.reverse();
    run
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lf_only_documents_pass_through() {
        assert_eq!(restore("a\nb\n", "a\nc\nb\n"), "a\nc\nb\n");
    }

    #[test]
    fn crlf_documents_stay_crlf() {
        let original = "<A>\r\n<E><![CDATA[x]]></E>\r\n</A>\r\n";
        let edited = "<A>\n<E><![CDATA[//\n\nx\n\n//]]></E>\n</A>\n";
        assert_eq!(
            restore(original, edited),
            "<A>\r\n<E><![CDATA[//\r\n\r\nx\r\n\r\n//]]></E>\r\n</A>\r\n"
        );
    }

    #[test]
    fn mixed_endings_only_change_edited_lines() {
        let original = "<A>\r\n<Expression><![CDATA[x]]></Expression>\n<B>\nkeep\n</B>\r\n";
        let edited = "<A>\n<Expression><![CDATA[//\n\nx\n\n//]]></Expression>\n<B>\nkeep\n</B>\n";
        assert_eq!(
            restore(original, edited),
            "<A>\r\n<Expression><![CDATA[//\n\nx\n\n//]]></Expression>\n<B>\nkeep\n</B>\r\n"
        );
    }

    #[test]
    fn untouched_lines_between_edits_keep_their_endings() {
        let original = "<E>a</E>\r\nmid\nmore\r\n<E>b</E>\r\nend";
        let edited = "<E>\na\n</E>\nmid\nmore\n<E>\nb\n</E>\nend";
        assert_eq!(
            restore(original, edited),
            "<E>\r\na\r\n</E>\r\nmid\nmore\r\n<E>\r\nb\r\n</E>\r\nend"
        );
    }

    #[test]
    fn inserted_lines_use_the_dominant_ending() {
        let original = "a\r\nb\r\nc\n";
        assert_eq!(restore(original, "new\na\nb\nc\n"), "new\r\na\r\nb\r\nc\n");
    }

    #[test]
    fn restored_text_converts_back_to_the_edit() {
        let original = "x\r\n\r\n\r\ny\n\r\n";
        let edited = "x\n\n\nz\n\ny\n\n";
        assert_eq!(to_lf(&restore(original, edited)), edited);
    }
}
