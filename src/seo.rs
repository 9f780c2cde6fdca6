//! Heuristic SEO text built from a caption. All functions are pure; an empty or
//! odd caption degrades to empty/short output instead of failing.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::DerivedText;

// ── Constants ────────────────────────────────────────────────────────────────

const SHORT_KEYWORD_MIN_CHARS: usize = 5;
const SHORT_KEYWORD_LIMIT: usize = 5;
const LONG_KEYWORD_MIN_CHARS: usize = 5;
const LONG_KEYWORD_LIMIT: usize = 2;
const META_TITLE_WORDS: usize = 6;
const META_TITLE_SUFFIX: &str = " | AI Generated";

// 5..=80 non-terminators followed by one terminator.
static SENTENCE_FRAGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.?!]{5,80}[.?!]").unwrap());

// ── Public API ───────────────────────────────────────────────────────────────

pub fn derive_all(caption: &str) -> DerivedText {
    DerivedText {
        short_keywords: short_keywords(caption),
        long_keywords: long_keywords(caption),
        meta_title: meta_title(caption),
    }
}

/// First five whitespace tokens longer than four characters, comma separated.
pub fn short_keywords(caption: &str) -> String {
    caption
        .split_whitespace()
        .filter(|word| word.chars().count() >= SHORT_KEYWORD_MIN_CHARS)
        .take(SHORT_KEYWORD_LIMIT)
        .collect::<Vec<_>>()
        .join(", ")
}

/// First two terminator-bounded fragments, trimmed and joined by one space.
pub fn long_keywords(caption: &str) -> String {
    SENTENCE_FRAGMENT_RE
        .find_iter(caption)
        .map(|m| m.as_str().trim())
        // Trimmed fragments end in the terminator, which does not count.
        .filter(|fragment| fragment.chars().count() > LONG_KEYWORD_MIN_CHARS)
        .take(LONG_KEYWORD_LIMIT)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn meta_title(caption: &str) -> String {
    let mut title = caption
        .split_whitespace()
        .take(META_TITLE_WORDS)
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");
    title.push_str(META_TITLE_SUFFIX);
    title
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
