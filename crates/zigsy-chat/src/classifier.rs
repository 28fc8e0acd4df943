//! Command classifier.
//!
//! Decides whether an utterance is a built-in directive, a file-search
//! request, or plain conversation. Directives always win.

use regex::Regex;
use std::sync::LazyLock;

use zigsy_core::commands::{match_reserved_phrase, ReservedCommand, REMEMBER_PREFIX};
use zigsy_locate::query::{
    is_natural_language, is_vague, strip_leading_filler, strip_trailing_punctuation,
    SEARCH_FILLER_WORDS,
};

/// File-search triggers, in priority order.
pub const FIND_TRIGGERS: &[&str] = &["find me", "search for", "locate", "find"];

/// A trigger at the start of the input, followed by whitespace or the end.
/// Alternation is leftmost-first, so "find me" wins over "find".
static TRIGGER_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives = FIND_TRIGGERS
        .iter()
        .map(|t| regex::escape(t).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)^(?:{})(?:\s+|$)", alternatives)).expect("Invalid trigger regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Reserved(ReservedCommand),
    /// "remember that <note>"; the note may be empty.
    Remember(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Command(CommandKind),
    /// Search term with leading filler removed, original casing kept.
    FileSearch(String),
    Conversational,
}

/// Classify one utterance. Pure.
pub fn classify(text: &str) -> Classification {
    let trimmed = text.trim();

    if let Some(command) = match_reserved_phrase(trimmed) {
        return Classification::Command(CommandKind::Reserved(command));
    }
    if let Some(note) = remember_note(trimmed) {
        return Classification::Command(CommandKind::Remember(note));
    }
    if let Some(term) = file_search_term(trimmed) {
        return Classification::FileSearch(term);
    }
    Classification::Conversational
}

fn remember_note(text: &str) -> Option<String> {
    let prefix = text.get(..REMEMBER_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(REMEMBER_PREFIX) {
        return None;
    }
    let rest = &text[REMEMBER_PREFIX.len()..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim().to_string())
}

fn file_search_term(text: &str) -> Option<String> {
    let text = strip_trailing_punctuation(text);
    let trigger = TRIGGER_RE.find(text)?;
    let remainder = text[trigger.end()..].trim();

    if is_vague(remainder) || is_natural_language(remainder) {
        return None;
    }

    let term = strip_leading_filler(remainder, SEARCH_FILLER_WORDS);
    (!term.is_empty()).then_some(term)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search(term: &str) -> Classification {
        Classification::FileSearch(term.to_string())
    }

    #[test]
    fn test_reserved_directives() {
        assert_eq!(
            classify("Ghost Mode"),
            Classification::Command(CommandKind::Reserved(ReservedCommand::Ghost))
        );
        assert_eq!(
            classify("  vitals "),
            Classification::Command(CommandKind::Reserved(ReservedCommand::Status))
        );
        assert_eq!(
            classify("yes"),
            Classification::Command(CommandKind::Reserved(ReservedCommand::Explain))
        );
    }

    #[test]
    fn test_remember_directive() {
        assert_eq!(
            classify("Remember that my grandson is Leo"),
            Classification::Command(CommandKind::Remember("my grandson is Leo".to_string()))
        );
        assert_eq!(
            classify("remember that"),
            Classification::Command(CommandKind::Remember(String::new()))
        );
        assert_eq!(classify("remember thatcher"), Classification::Conversational);
    }

    #[test]
    fn test_directive_beats_file_search() {
        // "remember that" wins even when the note mentions a search trigger.
        assert!(matches!(
            classify("remember that find me is a trigger"),
            Classification::Command(CommandKind::Remember(_))
        ));
    }

    #[test]
    fn test_file_search_triggers() {
        assert_eq!(classify("find my budget.xlsx"), search("budget.xlsx"));
        assert_eq!(classify("Find me the Tax Return?"), search("Tax Return"));
        assert_eq!(classify("search for holiday photos"), search("holiday photos"));
        assert_eq!(classify("locate resume.pdf!"), search("resume.pdf"));
    }

    #[test]
    fn test_find_me_checked_before_find() {
        // With "find" first the term would be "me notes".
        assert_eq!(classify("find me notes"), search("notes"));
    }

    #[test]
    fn test_trigger_needs_word_boundary() {
        assert_eq!(classify("findings from the study"), Classification::Conversational);
        assert_eq!(classify("locates"), Classification::Conversational);
    }

    #[test]
    fn test_vague_and_natural_language_remainders() {
        assert_eq!(
            classify("find that pdf from work"),
            Classification::Conversational
        );
        assert_eq!(
            classify("find something about taxes"),
            Classification::Conversational
        );
        assert_eq!(
            classify("find where is python installed"),
            Classification::Conversational
        );
        assert_eq!(
            classify("search for the letter i wrote to my landlord"),
            Classification::Conversational
        );
    }

    #[test]
    fn test_empty_remainder_is_conversational() {
        assert_eq!(classify("find"), Classification::Conversational);
        assert_eq!(classify("find my the"), Classification::Conversational);
        assert_eq!(classify("locate?"), Classification::Conversational);
    }

    #[test]
    fn test_conversational_fallback() {
        assert_eq!(
            classify("How do I connect to WiFi?"),
            Classification::Conversational
        );
        assert_eq!(classify(""), Classification::Conversational);
    }
}
