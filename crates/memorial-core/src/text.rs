//! Search-side text normalization: case folding, diacritic stripping and
//! whitespace collapsing, with a mapping back to the source text so matches
//! can be highlighted on the original characters.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize text for comparison.
pub fn normalize(text: &str) -> String {
    NormalizedText::new(text).text
}

/// Normalized text plus, for each normalized byte, the byte range of the
/// source character it came from.
#[derive(Debug, Clone)]
pub struct NormalizedText {
    pub text: String,
    origins: Vec<Range<usize>>,
}

impl NormalizedText {
    pub fn new(source: &str) -> Self {
        let mut text = String::with_capacity(source.len());
        let mut origins = Vec::with_capacity(source.len());
        let mut pending_space: Option<Range<usize>> = None;

        for (start, ch) in source.char_indices() {
            let span = start..start + ch.len_utf8();

            if ch.is_whitespace() {
                if !text.is_empty() && pending_space.is_none() {
                    pending_space = Some(span);
                }
                continue;
            }

            let folded: String = std::iter::once(ch)
                .nfd()
                .filter(|c| !is_combining_mark(*c))
                .flat_map(char::to_lowercase)
                .collect();
            if folded.is_empty() {
                continue;
            }

            if let Some(space) = pending_space.take() {
                text.push(' ');
                origins.push(space);
            }
            for _ in 0..folded.len() {
                origins.push(span.clone());
            }
            text.push_str(&folded);
        }

        Self { text, origins }
    }

    /// Map a byte range of the normalized text back onto the source.
    pub fn source_range(&self, range: Range<usize>) -> Option<Range<usize>> {
        if range.is_empty() || range.end > self.origins.len() {
            return None;
        }
        let start = self.origins[range.start].start;
        let end = self.origins[range.end - 1].end;
        Some(start..end)
    }
}

/// A run of display text, flagged when it matched the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub matched: bool,
}

/// Split `text` into plain and matched segments for every occurrence of
/// `query` (compared in normalized form).
pub fn highlight(text: &str, query: &str) -> Vec<Segment> {
    let needle = normalize(query);
    if needle.is_empty() {
        return plain(text);
    }

    let haystack = NormalizedText::new(text);
    let mut segments = Vec::new();
    let mut cursor = 0;

    for (idx, _) in haystack.text.match_indices(needle.as_str()) {
        let Some(range) = haystack.source_range(idx..idx + needle.len()) else {
            continue;
        };
        if range.start < cursor {
            continue;
        }
        if range.start > cursor {
            segments.push(Segment {
                text: text[cursor..range.start].to_string(),
                matched: false,
            });
        }
        segments.push(Segment {
            text: text[range.clone()].to_string(),
            matched: true,
        });
        cursor = range.end;
    }

    if cursor < text.len() {
        segments.push(Segment {
            text: text[cursor..].to_string(),
            matched: false,
        });
    }
    segments
}

fn plain(text: &str) -> Vec<Segment> {
    if text.is_empty() {
        return Vec::new();
    }
    vec![Segment {
        text: text.to_string(),
        matched: false,
    }]
}
