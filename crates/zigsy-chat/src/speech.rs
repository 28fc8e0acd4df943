//! Text-to-speech output. Fire-and-forget: the pipeline never waits on it.

use std::process::Stdio;

use tracing::{debug, warn};

use zigsy_core::config::SpeechConfig;

pub trait Speaker: Send + Sync {
    fn speak(&self, text: &str);
}

/// Speaks nothing. Used when speech is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSpeaker;

impl Speaker for NullSpeaker {
    fn speak(&self, text: &str) {
        debug!(len = text.len(), "Speech disabled; reply not spoken");
    }
}

/// Environment variable carrying the text for commands that read it there.
pub const SPEECH_TEXT_ENV: &str = "ZIGSY_SPEECH_TEXT";

/// Runs a TTS program with the text as its last argument, or in
/// [`SPEECH_TEXT_ENV`] for the PowerShell default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
    text_in_env: bool,
}

impl CommandSpeaker {
    /// Parse a whitespace separated command line such as `espeak -s 140`.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            text_in_env: false,
        })
    }

    pub fn platform_default() -> Self {
        #[cfg(target_os = "windows")]
        let (program, args, text_in_env) = (
            "powershell",
            vec![
                "-NoProfile",
                "-Command",
                "Add-Type -AssemblyName System.Speech; \
                 (New-Object System.Speech.Synthesis.SpeechSynthesizer).Speak($env:ZIGSY_SPEECH_TEXT)",
            ],
            true,
        );
        #[cfg(target_os = "macos")]
        let (program, args, text_in_env) = ("say", Vec::<&str>::new(), false);
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        let (program, args, text_in_env) = ("espeak", Vec::<&str>::new(), false);

        Self {
            program: program.to_string(),
            args: args.into_iter().map(str::to_string).collect(),
            text_in_env,
        }
    }

    pub fn from_config(config: &SpeechConfig) -> Self {
        config
            .command
            .as_deref()
            .and_then(Self::from_command_line)
            .unwrap_or_else(Self::platform_default)
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let mut command = tokio::process::Command::new(&self.program);
        command.args(&self.args);
        if self.text_in_env {
            command.env(SPEECH_TEXT_ENV, text);
        } else {
            command.arg(text);
        }

        let spawned = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(mut child) => {
                // Reap the child in the background.
                tokio::spawn(async move {
                    if let Err(e) = child.wait().await {
                        debug!(error = %e, "Speech process wait failed");
                    }
                });
            }
            Err(e) => warn!(program = %self.program, error = %e, "Failed to start speech command"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_parsing() {
        let speaker = CommandSpeaker::from_command_line("espeak -s 140").unwrap();
        assert_eq!(speaker.program(), "espeak");
        assert_eq!(speaker.args, vec!["-s", "140"]);
        assert!(CommandSpeaker::from_command_line("   ").is_none());
    }

    #[test]
    fn test_from_config_falls_back_to_platform_default() {
        let config = SpeechConfig {
            enabled: true,
            command: Some(String::new()),
        };
        assert_eq!(
            CommandSpeaker::from_config(&config),
            CommandSpeaker::platform_default()
        );
    }

    #[tokio::test]
    async fn test_missing_program_does_not_panic() {
        let speaker = CommandSpeaker::from_command_line("zigsy-no-such-tts-binary").unwrap();
        speaker.speak("hello");
        NullSpeaker.speak("hello");
    }
}
