//! Query predicates and term cleanup.
//!
//! The vague and natural-language checks are deliberately independent: the
//! command classifier runs them on the text after a search trigger, and the
//! locator runs them again on whatever term it is handed.

use regex::Regex;
use std::sync::LazyLock;

// =============================================================================
// Pattern tables
// =============================================================================

/// Phrases that mean the user does not actually know the file name.
pub const VAGUE_PHRASES: &[&str] = &[
    "something about",
    "related to",
    "that pdf",
    "that file",
    "the one with",
    "i think it was",
    "not sure",
    "similar to",
    "something like",
];

/// Words dropped from the front of a search remainder by the classifier.
pub const SEARCH_FILLER_WORDS: &[&str] = &[
    "my", "the", "a", "an", "this", "that", "some", "any", "of", "mine",
];

/// Words dropped from the front of a term by the locator.
pub const LOCATOR_FILLER_WORDS: &[&str] = &[
    "my", "the", "a", "an", "this", "that", "some", "any", "of", "mine", "please", "can", "you",
];

/// A question about files rather than a file name.
static NATURAL_LANGUAGE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"where is .+ installed",
        r"where (is|are) .+ (located|saved|stored|kept)",
        r"how (do|can) i find",
        r"what (is|are) .+ (file|folder)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid natural language regex"))
    .collect()
});

static TRAILING_PUNCT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[?!.]+$").unwrap());

static FILLER_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s+(or something.*|on (desktop|computer|laptop|pc|my computer)|file|folder|document|of mine|please)$",
    )
    .unwrap()
});

/// Longer than this with no dotted token reads as a sentence, not a name.
const MAX_NAME_WORDS: usize = 5;

// =============================================================================
// Predicates
// =============================================================================

/// True when the query contains one of [`VAGUE_PHRASES`].
pub fn is_vague(query: &str) -> bool {
    let q = query.to_lowercase();
    VAGUE_PHRASES.iter().any(|phrase| q.contains(phrase))
}

/// True when the query reads as a question or a sentence.
pub fn is_natural_language(query: &str) -> bool {
    let q = query.to_lowercase();
    if NATURAL_LANGUAGE_PATTERNS.iter().any(|re| re.is_match(&q)) {
        return true;
    }

    let words: Vec<&str> = q.split_whitespace().collect();
    let has_extension = words.iter().any(|w| w.contains('.'));
    words.len() > MAX_NAME_WORDS && !has_extension
}

// =============================================================================
// Cleanup
// =============================================================================

/// Remove trailing `?`, `!` and `.` characters.
pub fn strip_trailing_punctuation(text: &str) -> &str {
    match TRAILING_PUNCT_RE.find(text) {
        Some(m) => &text[..m.start()],
        None => text,
    }
}

/// Drop leading words found in `fillers` (case-insensitive), keeping the
/// casing of what remains.
pub fn strip_leading_filler(text: &str, fillers: &[&str]) -> String {
    let mut words = text.split_whitespace().peekable();
    while let Some(word) = words.peek() {
        let lower = word.to_lowercase();
        if fillers.contains(&lower.as_str()) {
            words.next();
        } else {
            break;
        }
    }
    words.collect::<Vec<_>>().join(" ")
}

/// Reduce a raw request to the bare name to search for.
///
/// "the budget file on desktop?" becomes "budget file".
pub fn clean_search_term(raw: &str) -> String {
    let trimmed = strip_trailing_punctuation(raw.trim()).trim();
    let without_suffix = FILLER_SUFFIX_RE.replace(trimmed, "");
    strip_leading_filler(without_suffix.trim(), LOCATOR_FILLER_WORDS)
}
