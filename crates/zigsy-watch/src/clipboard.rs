//! Clipboard watcher.
//!
//! Polls the clipboard, drops repeats and reserved command echoes, and turns
//! short captures into define requests and medium ones into a pending
//! "explain" offer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use zigsy_core::commands::match_reserved_phrase;
use zigsy_core::error::{Result, ZigsyError};
use zigsy_core::types::{ClipboardClass, ClipboardSample, Inbound, Utterance, UtteranceSource};

use crate::controller::WatcherHandle;

/// Captures longer than this are ignored.
pub const MAX_PHRASE_WORDS: usize = 50;

const TRAILING_PUNCT: &[char] = &['?', '!', '.', ',', ';', ':'];

/// Read access to the system clipboard.
pub trait ClipboardSource: Send + Sync {
    fn read_text(&self) -> Result<String>;
}

/// Trim whitespace and trailing punctuation.
pub fn normalize_clipboard(raw: &str) -> String {
    raw.trim().trim_end_matches(TRAILING_PUNCT).to_string()
}

/// Decide what to do with a normalized capture.
pub fn classify_clipboard(text: &str) -> ClipboardClass {
    if text.is_empty() || match_reserved_phrase(text).is_some() {
        return ClipboardClass::Ignore;
    }

    let word_count = text.split_whitespace().count();
    if word_count <= 2 && text.chars().count() > 1 {
        ClipboardClass::AutoDefine
    } else if (3..=MAX_PHRASE_WORDS).contains(&word_count) {
        ClipboardClass::PromptExplain
    } else {
        ClipboardClass::Ignore
    }
}

/// Single slot holding the last phrase offered for explanation.
#[derive(Clone, Debug, Default)]
pub struct PendingClipboard {
    slot: Arc<Mutex<Option<String>>>,
}

impl PendingClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever was pending.
    pub fn set(&self, text: impl Into<String>) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(text.into());
        }
    }

    /// Remove and return the pending text.
    pub fn take(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|mut slot| slot.take())
    }

    pub fn peek(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

pub struct ClipboardWatcher<S: ClipboardSource + 'static> {
    source: Arc<S>,
    pending: PendingClipboard,
    last: String,
    poll_interval: Duration,
}

impl<S: ClipboardSource + 'static> ClipboardWatcher<S> {
    pub fn new(source: Arc<S>, pending: PendingClipboard, poll_interval: Duration) -> Self {
        Self {
            source,
            pending,
            last: String::new(),
            poll_interval,
        }
    }

    /// Read the clipboard once and return the utterance to forward, if any.
    ///
    /// A phrase also replaces the pending slot. The last-seen text is updated
    /// for every new capture, including command echoes, so a command copied
    /// twice is not reconsidered.
    pub fn poll_once(&mut self) -> Result<Option<Utterance>> {
        let current = normalize_clipboard(&self.source.read_text()?);
        if current.is_empty() || current == self.last {
            return Ok(None);
        }
        self.last = current.clone();

        let sample = ClipboardSample {
            word_count: current.split_whitespace().count(),
            text: current,
        };

        match classify_clipboard(&sample.text) {
            ClipboardClass::Ignore => {
                debug!(words = sample.word_count, "Clipboard capture ignored");
                Ok(None)
            }
            ClipboardClass::AutoDefine => Ok(Some(Utterance::new(
                sample.text,
                UtteranceSource::ClipboardWord,
            ))),
            ClipboardClass::PromptExplain => {
                self.pending.set(sample.text.clone());
                Ok(Some(Utterance::new(
                    sample.text,
                    UtteranceSource::ClipboardPhrase,
                )))
            }
        }
    }

    /// Start polling on a task. Captures go to `mailbox`.
    pub fn spawn(
        mut self,
        mailbox: mpsc::UnboundedSender<Inbound>,
        cancel_token: CancellationToken,
    ) -> WatcherHandle {
        let token = cancel_token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_ms = self.poll_interval.as_millis() as u64, "Clipboard watcher started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.poll_once() {
                            Ok(Some(utterance)) => {
                                if mailbox.send(Inbound::Utterance(utterance)).is_err() {
                                    debug!("Mailbox closed; clipboard watcher exiting");
                                    break;
                                }
                            }
                            Ok(None) => {}
                            Err(e) => debug!(error = %e, "Clipboard read failed"),
                        }
                    }
                    _ = token.cancelled() => {
                        info!("Clipboard watcher shutting down");
                        break;
                    }
                }
            }
        });
        WatcherHandle::new("clipboard", cancel_token, handle)
    }
}

// =============================================================================
// System clipboard
// =============================================================================

/// The OS clipboard. Only implemented on Windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

#[cfg(target_os = "windows")]
impl ClipboardSource for SystemClipboard {
    fn read_text(&self) -> Result<String> {
        unsafe { read_clipboard_text() }
    }
}

#[cfg(target_os = "windows")]
unsafe fn read_clipboard_text() -> Result<String> {
    use windows_sys::Win32::System::DataExchange::{
        CloseClipboard, GetClipboardData, IsClipboardFormatAvailable, OpenClipboard,
    };
    use windows_sys::Win32::System::Memory::{GlobalLock, GlobalUnlock};

    const CF_UNICODETEXT: u32 = 13;

    if IsClipboardFormatAvailable(CF_UNICODETEXT) == 0 {
        return Ok(String::new());
    }
    if OpenClipboard(0) == 0 {
        return Err(ZigsyError::Clipboard("clipboard is busy".into()));
    }

    let handle = GetClipboardData(CF_UNICODETEXT);
    if handle == 0 {
        CloseClipboard();
        return Err(ZigsyError::Clipboard("no text data".into()));
    }

    let ptr = GlobalLock(handle as _) as *const u16;
    if ptr.is_null() {
        CloseClipboard();
        return Err(ZigsyError::Clipboard("failed to lock clipboard data".into()));
    }

    let mut len = 0usize;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    let text = String::from_utf16_lossy(std::slice::from_raw_parts(ptr, len));

    GlobalUnlock(handle as _);
    CloseClipboard();
    Ok(text)
}

#[cfg(not(target_os = "windows"))]
impl ClipboardSource for SystemClipboard {
    fn read_text(&self) -> Result<String> {
        Err(ZigsyError::Clipboard(
            "Clipboard access is only available on Windows".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    /// Clipboard that returns a scripted value.
    #[derive(Default)]
    struct FakeClipboard {
        text: StdMutex<String>,
    }

    impl FakeClipboard {
        fn set(&self, text: &str) {
            *self.text.lock().unwrap() = text.to_string();
        }
    }

    impl ClipboardSource for FakeClipboard {
        fn read_text(&self) -> Result<String> {
            Ok(self.text.lock().unwrap().clone())
        }
    }

    fn watcher() -> (Arc<FakeClipboard>, PendingClipboard, ClipboardWatcher<FakeClipboard>) {
        let source = Arc::new(FakeClipboard::default());
        let pending = PendingClipboard::new();
        let watcher = ClipboardWatcher::new(source.clone(), pending.clone(), Duration::from_millis(10));
        (source, pending, watcher)
    }

    #[test]
    fn test_normalize_strips_trailing_punctuation() {
        assert_eq!(normalize_clipboard("  Restart the router?!  "), "Restart the router");
        assert_eq!(normalize_clipboard("a.b.c;:"), "a.b.c");
        assert_eq!(normalize_clipboard("..."), "");
    }

    #[test]
    fn test_classify_word_counts() {
        assert_eq!(classify_clipboard("bandwidth"), ClipboardClass::AutoDefine);
        assert_eq!(classify_clipboard("cloud storage"), ClipboardClass::AutoDefine);
        assert_eq!(classify_clipboard("x"), ClipboardClass::Ignore);
        assert_eq!(classify_clipboard("restart the router"), ClipboardClass::PromptExplain);

        let fifty = vec!["word"; 50].join(" ");
        let sixty = vec!["word"; 60].join(" ");
        assert_eq!(classify_clipboard(&fifty), ClipboardClass::PromptExplain);
        assert_eq!(classify_clipboard(&sixty), ClipboardClass::Ignore);
    }

    #[test]
    fn test_classify_ignores_reserved_phrases() {
        assert_eq!(classify_clipboard("ghost mode"), ClipboardClass::Ignore);
        assert_eq!(classify_clipboard("Stash This"), ClipboardClass::Ignore);
    }

    #[test]
    fn test_ghost_mode_capture_produces_nothing() {
        let (source, pending, mut watcher) = watcher();
        source.set("ghost mode");
        assert!(watcher.poll_once().unwrap().is_none());
        assert!(pending.peek().is_none());
    }

    #[test]
    fn test_phrase_sets_pending_and_forwards() {
        let (source, pending, mut watcher) = watcher();
        source.set("restart the router.");

        let utterance = watcher.poll_once().unwrap().unwrap();
        assert_eq!(utterance.source, UtteranceSource::ClipboardPhrase);
        assert_eq!(utterance.text, "restart the router");
        assert_eq!(pending.peek().as_deref(), Some("restart the router"));
    }

    #[test]
    fn test_word_becomes_define_request() {
        let (source, pending, mut watcher) = watcher();
        source.set("firmware");

        let utterance = watcher.poll_once().unwrap().unwrap();
        assert_eq!(utterance.source, UtteranceSource::ClipboardWord);
        assert!(pending.peek().is_none());
    }

    #[test]
    fn test_sixty_words_ignored() {
        let (source, pending, mut watcher) = watcher();
        source.set(&vec!["lorem"; 60].join(" "));
        assert!(watcher.poll_once().unwrap().is_none());
        assert!(pending.peek().is_none());
    }

    #[test]
    fn test_repeat_capture_suppressed() {
        let (source, _pending, mut watcher) = watcher();
        source.set("firmware");
        assert!(watcher.poll_once().unwrap().is_some());
        assert!(watcher.poll_once().unwrap().is_none());

        source.set("firmware!");
        assert!(watcher.poll_once().unwrap().is_none());

        source.set("kernel");
        assert!(watcher.poll_once().unwrap().is_some());
    }

    #[test]
    fn test_command_echo_updates_last_seen() {
        let (source, _pending, mut watcher) = watcher();
        source.set("firmware");
        watcher.poll_once().unwrap();
        source.set("stash");
        assert!(watcher.poll_once().unwrap().is_none());
        // Copying the earlier word again counts as a new capture.
        source.set("firmware");
        assert!(watcher.poll_once().unwrap().is_some());
    }

    #[test]
    fn test_later_phrase_overwrites_pending() {
        let (source, pending, mut watcher) = watcher();
        source.set("first phrase goes here");
        watcher.poll_once().unwrap();
        source.set("second phrase goes here");
        watcher.poll_once().unwrap();
        assert_eq!(pending.take().as_deref(), Some("second phrase goes here"));
        assert!(pending.take().is_none());
    }

    #[tokio::test]
    async fn test_spawned_watcher_forwards_to_mailbox() {
        let (source, _pending, watcher) = watcher();
        source.set("router");

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = watcher.spawn(tx, CancellationToken::new());

        let inbound = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match inbound {
            Inbound::Utterance(u) => {
                assert_eq!(u.text, "router");
                assert_eq!(u.source, UtteranceSource::ClipboardWord);
            }
            other => panic!("unexpected inbound: {:?}", other),
        }

        handle.stop().await.unwrap();
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_system_clipboard_errors_off_windows() {
        let err = SystemClipboard.read_text().unwrap_err();
        assert!(err.to_string().contains("only available on Windows"));
    }
}
