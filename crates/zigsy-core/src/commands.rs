//! Reserved command vocabulary shared by the command classifier and the
//! clipboard watcher.

use serde::{Deserialize, Serialize};

/// Built-in directives matched by full-string equality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservedCommand {
    /// Toggle the semi-transparent window mode.
    Ghost,
    /// Report CPU and RAM usage.
    Status,
    /// Append the clipboard to the stash log.
    Stash,
    /// Explain the pending clipboard phrase.
    Explain,
}

/// Prefix that turns the rest of the utterance into a remembered note.
pub const REMEMBER_PREFIX: &str = "remember that";

const RESERVED_PHRASES: &[(&str, ReservedCommand)] = &[
    ("ghost", ReservedCommand::Ghost),
    ("ghost mode", ReservedCommand::Ghost),
    ("status", ReservedCommand::Status),
    ("vitals", ReservedCommand::Status),
    ("system status", ReservedCommand::Status),
    ("stash", ReservedCommand::Stash),
    ("stash this", ReservedCommand::Stash),
    ("explain", ReservedCommand::Explain),
    ("yes", ReservedCommand::Explain),
    ("yes explain", ReservedCommand::Explain),
];

/// Look up a reserved phrase, case-insensitively, after trimming.
pub fn match_reserved_phrase(text: &str) -> Option<ReservedCommand> {
    let lower = text.trim().to_lowercase();
    RESERVED_PHRASES
        .iter()
        .find(|(phrase, _)| *phrase == lower)
        .map(|(_, command)| *command)
}
