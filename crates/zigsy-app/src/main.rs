//! Zigsy application binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Open the memory file and stash log
//! 3. Start the passive watchers (clipboard, foreground window)
//! 4. Open the microphone for push-to-talk and the wake-word listener
//! 5. Load the knowledge index in the background
//! 6. Run the conversation pipeline behind the console front end

mod cli;
mod console;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use zigsy_chat::{
    spawn_knowledge_load, CommandSpeaker, ContextFusion, ConversationPipeline, KnowledgeSlot,
    NullSpeaker, OllamaBackend, PipelineParts, PushToTalk, Speaker, SysinfoVitals, VoiceCapture,
};
use zigsy_core::config::ZigsyConfig;
use zigsy_core::events::{EventSink, FanoutSink, TracingSink};
use zigsy_core::types::Inbound;
use zigsy_locate::FileLocator;
use zigsy_storage::{MemoryStore, StashLog};
use zigsy_voice::{
    spawn_audio_router, Microphone, WhisperEngine, WhisperRecognizer, WhisperTranscriber,
};
use zigsy_watch::{
    ClipboardWatcher, ForegroundWindowProbe, PendingClipboard, SystemClipboard, WakeWordListener,
    WatcherHandle, WindowFilter, WindowState, WindowWatcher,
};

use crate::cli::{expand_home, CliArgs};
use crate::console::{run_console, spawn_stdin_reader, ConsoleSink, LastFolder};

/// Live microphone plus what hangs off it. Dropping it stops capture.
struct VoiceInput {
    _microphone: Microphone,
    push_to_talk: Option<Arc<PushToTalk>>,
}

/// Open the microphone and Whisper, then start push-to-talk and/or the
/// wake-word listener. Returns `None` when voice input cannot run here.
fn start_voice(
    config: &ZigsyConfig,
    mailbox: &UnboundedSender<Inbound>,
    sink: &Arc<dyn EventSink>,
    cancel_token: &CancellationToken,
    watchers: &mut Vec<WatcherHandle>,
) -> Option<VoiceInput> {
    let model_path = expand_home(&config.voice.model_path);
    let engine = match WhisperEngine::load(&model_path, &config.voice.language) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            tracing::info!(error = %e, "Voice input unavailable");
            return None;
        }
    };
    let (microphone, frames) = match Microphone::open(&config.voice.device) {
        Ok(opened) => opened,
        Err(e) => {
            tracing::info!(error = %e, "Voice input unavailable");
            return None;
        }
    };

    let push_to_talk = config.voice.push_to_talk.then(|| {
        Arc::new(PushToTalk::new(
            VoiceCapture::new(microphone.sample_rate(), config.voice.max_record_seconds),
            Arc::new(WhisperTranscriber::new(Arc::clone(&engine))),
            mailbox.clone(),
            Arc::clone(sink),
        ))
    });

    let wake_frames = config.watch.wake_word_enabled.then(|| {
        let (tx, rx) = std::sync::mpsc::channel();
        let listener = WakeWordListener::new(
            WhisperRecognizer::new(Arc::clone(&engine)),
            config.assistant.wake_phrase.clone(),
        );
        watchers.push(listener.spawn(rx, mailbox.clone(), cancel_token.child_token()));
        tx
    });

    if let Err(e) = spawn_audio_router(frames, push_to_talk.as_ref().map(|p| p.recorder()), wake_frames) {
        tracing::warn!(error = %e, "Failed to start audio router");
        return None;
    }
    tracing::info!(
        device = microphone.device(),
        push_to_talk = push_to_talk.is_some(),
        wake_word = config.watch.wake_word_enabled,
        "Voice input ready"
    );

    Some(VoiceInput {
        _microphone: microphone,
        push_to_talk,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config. Tracing is not up yet, so a load failure is reported after init.
    let config_file = args.resolve_config_path();
    let (mut config, config_error) = if config_file.exists() {
        match ZigsyConfig::load(&config_file) {
            Ok(config) => (config, None),
            Err(e) => (ZigsyConfig::default(), Some(e)),
        }
    } else {
        (ZigsyConfig::default(), None)
    };
    args.apply(&mut config);

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Zigsy v{}", env!("CARGO_PKG_VERSION"));
    match config_error {
        Some(e) => tracing::warn!(path = %config_file.display(), error = %e, "Invalid config; using defaults"),
        None => tracing::info!(path = %config_file.display(), "Configuration resolved"),
    }

    // Storage.
    let data_dir = expand_home(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    let memory_path = data_dir.join(&config.storage.memory_file);
    let memory = match MemoryStore::open(&memory_path) {
        Ok(memory) => Arc::new(memory),
        Err(e) => {
            tracing::error!(path = %memory_path.display(), error = %e, "Failed to open memory file");
            return Err(e.into());
        }
    };
    let stash = StashLog::new(data_dir.join(&config.storage.stash_file));

    // Output.
    let last_folder = LastFolder::default();
    let sink: Arc<dyn EventSink> = Arc::new(FanoutSink::new(vec![
        Box::new(ConsoleSink::new(last_folder.clone())),
        Box::new(TracingSink),
    ]));
    let speaker: Arc<dyn Speaker> = if config.speech.enabled {
        Arc::new(CommandSpeaker::from_config(&config.speech))
    } else {
        Arc::new(NullSpeaker)
    };

    // Shared state.
    let (mailbox, inbox) = tokio::sync::mpsc::unbounded_channel();
    let cancel_token = CancellationToken::new();
    let clipboard = Arc::new(SystemClipboard);
    let pending = PendingClipboard::new();
    let window = WindowState::new();
    let knowledge = KnowledgeSlot::new();

    // === Background tasks ===

    let mut watchers: Vec<WatcherHandle> = Vec::new();
    let native_watchers = cfg!(target_os = "windows");

    if !config.watch.clipboard_enabled {
        tracing::info!("Clipboard watcher disabled");
    } else if native_watchers {
        let watcher = ClipboardWatcher::new(
            Arc::clone(&clipboard),
            pending.clone(),
            Duration::from_millis(config.watch.clipboard_poll_ms),
        );
        watchers.push(watcher.spawn(mailbox.clone(), cancel_token.child_token()));
    } else {
        tracing::info!("Clipboard watcher unavailable on this platform");
    }

    if !config.watch.window_enabled {
        tracing::info!("Window watcher disabled");
    } else if native_watchers {
        let watcher = WindowWatcher::new(
            Arc::new(ForegroundWindowProbe),
            window.clone(),
            WindowFilter::new(&config.watch.ignored_processes, &config.assistant.name),
            Duration::from_millis(config.watch.window_poll_ms),
        );
        watchers.push(watcher.spawn(cancel_token.child_token()));
    } else {
        tracing::info!("Window watcher unavailable on this platform");
    }

    let voice = if config.voice.push_to_talk || config.watch.wake_word_enabled {
        start_voice(&config, &mailbox, &sink, &cancel_token, &mut watchers)
    } else {
        tracing::info!("Voice input disabled");
        None
    };
    let push_to_talk = voice.as_ref().and_then(|v| v.push_to_talk.clone());

    spawn_knowledge_load(
        data_dir.join(&config.knowledge.raw_dir),
        data_dir.join(&config.knowledge.index_file),
        knowledge.clone(),
        Arc::clone(&sink),
    );

    // === Conversation pipeline ===

    let pipeline = ConversationPipeline::new(PipelineParts {
        backend: Arc::new(OllamaBackend::from_config(&config.chat)),
        fusion: ContextFusion::new(
            Arc::clone(&memory),
            window.clone(),
            knowledge,
            config.knowledge.top_k,
        ),
        locator: Arc::new(FileLocator::from_config(&config.locate)),
        memory,
        stash,
        clipboard,
        pending,
        vitals: Arc::new(SysinfoVitals),
        speaker,
        sink,
        system_prompt: config.assistant.system_prompt.clone(),
    });
    tracing::info!(model = %config.chat.model, "Conversation pipeline ready");
    let pipeline_handle = tokio::spawn(pipeline.run(inbox, cancel_token.clone()));

    tokio::select! {
        _ = run_console(spawn_stdin_reader(), mailbox, last_folder, push_to_talk) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
    }

    // === Shutdown ===

    cancel_token.cancel();
    drop(voice);
    for watcher in watchers {
        let name = watcher.name();
        if let Err(e) = watcher.stop().await {
            tracing::warn!(watcher = name, error = %e, "Watcher did not stop cleanly");
        }
    }
    let history = pipeline_handle.await?;
    tracing::info!(turns = history.len() / 2, "Zigsy stopped");

    Ok(())
}
