//! Zigsy Watch crate - passive input sources that run beside the conversation.
//!
//! Provides the clipboard watcher (word / phrase captures), the foreground
//! window watcher that keeps a single latest [`WindowSnapshot`], and the
//! wake-word listener. Each runs as its own task and is stopped through a
//! [`WatcherHandle`].
//!
//! [`WindowSnapshot`]: zigsy_core::types::WindowSnapshot

pub mod clipboard;
pub mod controller;
pub mod wake_word;
pub mod window;

pub use clipboard::{
    classify_clipboard, normalize_clipboard, ClipboardSource, ClipboardWatcher, PendingClipboard,
    SystemClipboard,
};
pub use controller::WatcherHandle;
pub use wake_word::{detect_wake_phrase, SpeechRecognizer, WakeWordListener};
pub use window::{ForegroundWindowProbe, WindowFilter, WindowIntrospector, WindowState, WindowWatcher};
