pub mod memory;
pub mod stash;

pub use memory::{MemoryRecord, MemoryStore};
pub use stash::StashLog;
