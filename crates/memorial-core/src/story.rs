use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Boilerplate that scraped stories carry after the story proper.
pub const DEFAULT_CUTOFF_PHRASES: &[&str] = &[
    "Share this story",
    "Share this:",
    "Related stories",
    "Click here to read more",
    "For more stories",
    "Sign up for our newsletter",
    "Copyright ©",
];

/// A story split into paragraphs; each paragraph is a list of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub paragraphs: Vec<Vec<String>>,
}

impl Story {
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    /// The lead paragraph, shown before the fold.
    pub fn lead(&self) -> Option<&[String]> {
        self.paragraphs.first().map(Vec::as_slice)
    }

    pub fn remaining(&self) -> &[Vec<String>] {
        self.paragraphs.get(1..).unwrap_or(&[])
    }
}

#[derive(Debug, Clone)]
pub struct StoryFormatter {
    cutoff_phrases: Vec<String>,
}

impl Default for StoryFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_CUTOFF_PHRASES.iter().map(|p| p.to_string()))
    }
}

impl StoryFormatter {
    pub fn new(cutoff_phrases: impl IntoIterator<Item = String>) -> Self {
        let cutoff_phrases = cutoff_phrases
            .into_iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { cutoff_phrases }
    }

    pub fn format(&self, raw: &str) -> Story {
        let text = normalize_newlines(raw);
        let text = self.truncate_at_cutoff(&text);

        let paragraphs = paragraph_break_re()
            .split(text)
            .filter_map(|block| {
                let block = strip_read_more(block.trim());
                let lines: Vec<String> = block
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect();
                (!lines.is_empty()).then_some(lines)
            })
            .collect();

        Story { paragraphs }
    }

    /// Cut at the earliest cutoff phrase, case-insensitively.
    fn truncate_at_cutoff<'a>(&self, text: &'a str) -> &'a str {
        if self.cutoff_phrases.is_empty() {
            return text;
        }

        // Lowercasing can change byte lengths, so keep the source offset of
        // every lowered byte.
        let mut lowered = String::with_capacity(text.len());
        let mut origins = Vec::with_capacity(text.len());
        for (pos, ch) in text.char_indices() {
            for lower in ch.to_lowercase() {
                lowered.push(lower);
                origins.resize(lowered.len(), pos);
            }
        }

        self.cutoff_phrases
            .iter()
            .filter_map(|phrase| lowered.find(phrase.as_str()))
            .min()
            .map_or(text, |pos| &text[..origins[pos]])
    }
}

fn paragraph_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n(?:[ \t]*\n)+").expect("valid regex"))
}

fn read_more_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:^|[\s(\[]+)read\s+more[\s.…:>»→)\]]*$").expect("valid regex")
    })
}

/// Turn literal `\r\n` / `\n` escapes and CRLF/CR endings into `\n`.
fn normalize_newlines(raw: &str) -> String {
    raw.replace("\\r\\n", "\n")
        .replace("\\n", "\n")
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

fn strip_read_more(paragraph: &str) -> &str {
    match read_more_re().find(paragraph) {
        Some(m) => paragraph[..m.start()].trim_end(),
        None => paragraph,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(story: &Story) -> Vec<Vec<&str>> {
        story
            .paragraphs
            .iter()
            .map(|p| p.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn splits_on_blank_lines_after_unescaping() {
        let story = StoryFormatter::default()
            .format("First line\\nsecond line\\n\\nNext paragraph\r\n\r\n  \r\nLast");
        assert_eq!(
            lines(&story),
            vec![
                vec!["First line", "second line"],
                vec!["Next paragraph"],
                vec!["Last"],
            ]
        );
        assert_eq!(story.lead().map(|l| l.len()), Some(2));
        assert_eq!(story.remaining().len(), 2);
    }

    #[test]
    fn truncates_at_first_cutoff_phrase() {
        let formatter = StoryFormatter::new(["Share this story".to_string(), "Related".to_string()]);
        let story = formatter.format("He loved the sea.\n\nRELATED links\n\nshare this story now");
        assert_eq!(lines(&story), vec![vec!["He loved the sea."]]);
    }

    #[test]
    fn cutoff_with_multibyte_lowercasing() {
        let formatter = StoryFormatter::new(["share this".to_string()]);
        let story = formatter.format("İlana lived in Be'eri. Share this");
        assert_eq!(lines(&story), vec![vec!["İlana lived in Be'eri."]]);
    }

    #[test]
    fn strips_trailing_read_more() {
        let story = StoryFormatter::default()
            .format("She taught music. Read more...\n\nA second part [read more →]\n\nRead More");
        assert_eq!(
            lines(&story),
            vec![vec!["She taught music."], vec!["A second part"]]
        );
    }

    #[test]
    fn read_more_inside_text_is_kept() {
        let story = StoryFormatter::default().format("He wanted to read more books.");
        assert_eq!(lines(&story), vec![vec!["He wanted to read more books."]]);
    }

    #[test]
    fn words_ending_in_read_are_kept() {
        let story = StoryFormatter::default()
            .format("He always wanted to spread more\n\nShe loved to thread more. Read more");
        assert_eq!(
            lines(&story),
            vec![
                vec!["He always wanted to spread more"],
                vec!["She loved to thread more."],
            ]
        );
    }

    #[test]
    fn empty_story() {
        assert!(StoryFormatter::default().format("  \\n\\n ").is_empty());
        assert_eq!(StoryFormatter::default().format("").lead(), None);
    }
}
