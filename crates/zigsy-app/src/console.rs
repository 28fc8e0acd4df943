//! Line-oriented console front end.
//!
//! Stdin lines become typed utterances; `/1`..`/6` submit a quick action,
//! `/talk` toggles push-to-talk, `/open` opens the folder from the last file
//! search and `/quit` exits.
//!
//! Stdin is read on a plain OS thread rather than Tokio's blocking pool. A
//! read in flight cannot be cancelled, and the runtime waits for its pool on
//! shutdown, so a pool read would keep the process alive after Ctrl-C.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use zigsy_chat::PushToTalk;
use zigsy_core::events::{AssistantEvent, EventSink};
use zigsy_core::types::{Inbound, Utterance, UtteranceSource, QUICK_ACTIONS};

const USER_PREFIX: &str = "// USER >";
const ZIGSY_PREFIX: &str = "// ZIGSY >";

/// Folder offered by the most recent successful file search.
#[derive(Clone, Default)]
pub struct LastFolder(Arc<Mutex<Option<PathBuf>>>);

impl LastFolder {
    pub fn set(&self, path: PathBuf) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(path);
        }
    }

    pub fn get(&self) -> Option<PathBuf> {
        self.0.lock().ok().and_then(|slot| slot.clone())
    }
}

/// Text for one event, or `None` for events the console does not show.
pub fn render(event: &AssistantEvent) -> Option<String> {
    match event {
        AssistantEvent::UserMessage { text, .. } => Some(format!("{} {}", USER_PREFIX, text)),
        AssistantEvent::Notice { text } => Some(format!("{} {}", ZIGSY_PREFIX, text)),
        AssistantEvent::Pending { .. } => Some(format!("{} ...", ZIGSY_PREFIX)),
        AssistantEvent::Finalized { reply, .. } => Some(format!("{} {}", ZIGSY_PREFIX, reply)),
        AssistantEvent::TurnFailed { reason, .. } => Some(format!(
            "{} Sorry, I couldn't answer that right now. ({})",
            ZIGSY_PREFIX, reason
        )),
        AssistantEvent::FolderAvailable { path } => {
            Some(format!("   Type /open to open {}", path.display()))
        }
        AssistantEvent::WakeWordDetected => Some(format!("{} Yes? I'm listening.", ZIGSY_PREFIX)),
        _ => None,
    }
}

/// Event sink that prints to stdout and remembers the last offered folder.
pub struct ConsoleSink {
    last_folder: LastFolder,
}

impl ConsoleSink {
    pub fn new(last_folder: LastFolder) -> Self {
        Self { last_folder }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: AssistantEvent) {
        if let AssistantEvent::FolderAvailable { path } = &event {
            self.last_folder.set(path.clone());
        }
        if let Some(line) = render(&event) {
            println!("{}", line);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Utterance(Utterance),
    Talk,
    OpenFolder,
    Quit,
    Help,
    Empty,
    Unknown(String),
}

pub fn parse_line(line: &str) -> ConsoleInput {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleInput::Empty;
    }

    let Some(command) = line.strip_prefix('/') else {
        return ConsoleInput::Utterance(Utterance::typed(line));
    };

    match command.trim().to_lowercase().as_str() {
        "open" => ConsoleInput::OpenFolder,
        "talk" => ConsoleInput::Talk,
        "quit" | "exit" => ConsoleInput::Quit,
        "help" | "?" => ConsoleInput::Help,
        other => match other.parse::<usize>() {
            Ok(n) if (1..=QUICK_ACTIONS.len()).contains(&n) => ConsoleInput::Utterance(
                Utterance::new(QUICK_ACTIONS[n - 1].message, UtteranceSource::QuickAction),
            ),
            _ => ConsoleInput::Unknown(line.to_string()),
        },
    }
}

pub fn help_text() -> String {
    let mut out = String::from("Quick actions:\n");
    for (i, action) in QUICK_ACTIONS.iter().enumerate() {
        out.push_str(&format!("  /{}  {}\n", i + 1, action.label));
    }
    out.push_str("  /talk  start or stop a voice recording\n");
    out.push_str("  /open  open the folder from the last search\n");
    out.push_str("  /quit  exit");
    out
}

/// Forward stdin lines from a detached thread. The channel closes at end
/// of input; the thread itself dies with the process.
pub fn spawn_stdin_reader() -> UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("zigsy-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read stdin");
                        break;
                    }
                }
            }
            debug!("Stdin closed");
        });
    if let Err(e) = spawned {
        warn!(error = %e, "Could not start stdin reader");
    }
    rx
}

/// Handle console lines until `/quit` or until `lines` closes.
pub async fn run_console(
    mut lines: UnboundedReceiver<String>,
    mailbox: UnboundedSender<Inbound>,
    last_folder: LastFolder,
    push_to_talk: Option<Arc<PushToTalk>>,
) {
    println!("{}", help_text());

    while let Some(line) = lines.recv().await {
        match parse_line(&line) {
            ConsoleInput::Utterance(utterance) => {
                if mailbox.send(Inbound::Utterance(utterance)).is_err() {
                    warn!("Pipeline stopped; console exiting");
                    break;
                }
            }
            ConsoleInput::Talk => match &push_to_talk {
                Some(ptt) => {
                    if let Err(e) = ptt.toggle() {
                        println!("{} Voice input failed: {}", ZIGSY_PREFIX, e);
                    }
                }
                None => println!("{} Voice input is not available.", ZIGSY_PREFIX),
            },
            ConsoleInput::OpenFolder => match last_folder.get() {
                Some(path) => match zigsy_locate::open_folder(&path) {
                    Ok(opened) => println!("{} Opened {}", ZIGSY_PREFIX, opened.display()),
                    Err(e) => println!("{} Could not open folder: {}", ZIGSY_PREFIX, e),
                },
                None => println!("{} No folder to open yet. Try \"find <name>\" first.", ZIGSY_PREFIX),
            },
            ConsoleInput::Help => println!("{}", help_text()),
            ConsoleInput::Quit => break,
            ConsoleInput::Empty => {}
            ConsoleInput::Unknown(input) => {
                println!("{} Unknown command {}. Type /help for the list.", ZIGSY_PREFIX, input)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_text() {
        match parse_line("  how do I zoom in?  ") {
            ConsoleInput::Utterance(u) => {
                assert_eq!(u.text, "how do I zoom in?");
                assert_eq!(u.source, UtteranceSource::Typed);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(parse_line("   "), ConsoleInput::Empty);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_line("/open"), ConsoleInput::OpenFolder);
        assert_eq!(parse_line("/Talk"), ConsoleInput::Talk);
        assert_eq!(parse_line("/QUIT"), ConsoleInput::Quit);
        assert_eq!(parse_line("/help"), ConsoleInput::Help);
        assert_eq!(parse_line("/7"), ConsoleInput::Unknown("/7".to_string()));
        assert_eq!(parse_line("/zap"), ConsoleInput::Unknown("/zap".to_string()));
    }

    #[test]
    fn test_parse_quick_actions() {
        match parse_line("/2") {
            ConsoleInput::Utterance(u) => {
                assert_eq!(u.text, "How do I connect to WiFi?");
                assert_eq!(u.source, UtteranceSource::QuickAction);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_render_prefixes() {
        assert_eq!(
            render(&AssistantEvent::Notice {
                text: "hi".to_string()
            })
            .unwrap(),
            "// ZIGSY > hi"
        );
        assert_eq!(
            render(&AssistantEvent::UserMessage {
                text: "hello".to_string(),
                source: UtteranceSource::Voice,
            })
            .unwrap(),
            "// USER > hello"
        );
        assert!(render(&AssistantEvent::InputLocked).is_none());
    }

    #[test]
    fn test_sink_remembers_folder() {
        let last = LastFolder::default();
        let sink = ConsoleSink::new(last.clone());
        sink.emit(AssistantEvent::FolderAvailable {
            path: PathBuf::from("/tmp/reports"),
        });
        assert_eq!(last.get(), Some(PathBuf::from("/tmp/reports")));
    }

    #[tokio::test]
    async fn test_console_forwards_lines_and_stops_on_quit() {
        let (line_tx, line_rx) = mpsc::unbounded_channel();
        let (mailbox, mut inbox) = mpsc::unbounded_channel();

        line_tx.send("where is my budget".to_string()).unwrap();
        line_tx.send("/talk".to_string()).unwrap();
        line_tx.send("/quit".to_string()).unwrap();
        line_tx.send("never read".to_string()).unwrap();

        run_console(line_rx, mailbox, LastFolder::default(), None).await;

        match inbox.try_recv().unwrap() {
            Inbound::Utterance(u) => assert_eq!(u.text, "where is my budget"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(inbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_console_returns_when_input_closes() {
        let (line_tx, line_rx) = mpsc::unbounded_channel::<String>();
        let (mailbox, _inbox) = mpsc::unbounded_channel();
        drop(line_tx);

        tokio::time::timeout(
            std::time::Duration::from_secs(2),
            run_console(line_rx, mailbox, LastFolder::default(), None),
        )
        .await
        .unwrap();
    }
}
