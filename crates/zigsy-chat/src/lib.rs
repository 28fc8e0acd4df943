//! Conversational engine for Zigsy.
//!
//! Classifies utterances, answers built-in directives and file requests
//! directly, and routes everything else through context fusion to the chat
//! backend, one turn at a time.

pub mod backend;
pub mod classifier;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod retrieval;
pub mod speech;
pub mod state;
pub mod vitals;
pub mod voice;

pub use backend::{ChatBackend, OllamaBackend};
pub use classifier::{classify, Classification, CommandKind};
pub use context::{ContextFusion, ContextRequest};
pub use error::ChatError;
pub use pipeline::{augment_message, ConversationPipeline, PipelineParts};
pub use retrieval::{spawn_knowledge_load, KnowledgeIndex, KnowledgeSlot, Passage, Retriever};
pub use speech::{CommandSpeaker, NullSpeaker, Speaker};
pub use state::{Turn, TurnState};
pub use vitals::{SysinfoVitals, Vitals, VitalsProbe};
pub use voice::{spawn_transcription, PushToTalk, Transcriber, VoiceCapture};
