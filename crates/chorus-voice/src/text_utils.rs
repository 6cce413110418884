//! Text cleanup between what an agent says and what the transcript shows.
//!
//! Agent lines may carry bracketed voice-expression tags such as
//! `[excited]` or `[whispers]`. The synthesizer gets them untouched; the
//! transcript shows the line without them.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// A bracketed tag, plus the character after it so markdown links
/// (`[text](url)`) can be told apart and kept.
static VOICE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([A-Za-z][A-Za-z '\-]{0,39})\](\()?").expect("voice tag pattern is valid")
});

/// Whitespace left behind before punctuation once a tag is removed.
static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([,.!?;:])").expect("punctuation pattern is valid"));

/// Remove voice-expression tags and tidy the spacing they leave behind.
#[must_use]
pub fn strip_voice_tags(text: &str) -> String {
    let stripped = VOICE_TAG.replace_all(text, |caps: &Captures<'_>| {
        if caps.get(2).is_some() {
            caps[0].to_string()
        } else {
            String::new()
        }
    });
    let tidied = SPACE_BEFORE_PUNCT.replace_all(&stripped, "$1");
    collapse_whitespace(&tidied)
}

/// Text to show in the transcript for an agent line.
///
/// Falls back to the raw text when the line consisted only of tags.
#[must_use]
pub fn display_text(raw: &str) -> String {
    let stripped = strip_voice_tags(raw);
    if stripped.is_empty() {
        raw.trim().to_string()
    } else {
        stripped
    }
}

/// Collapse runs of whitespace into single spaces and trim.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
