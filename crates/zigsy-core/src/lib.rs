pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use commands::{match_reserved_phrase, ReservedCommand, REMEMBER_PREFIX};
pub use config::ZigsyConfig;
pub use error::{Result, ZigsyError};
pub use events::{AssistantEvent, AssistantStatus, EventSink};
pub use types::*;
