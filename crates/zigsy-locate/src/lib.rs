//! Heuristic file search for spoken or typed requests like "find my budget".

pub mod locator;
pub mod open;
pub mod query;
pub mod report;

pub use locator::{default_roots, FileLocator, LocateOutcome, DEFAULT_SKIP_DIRS};
pub use open::open_folder;
pub use query::{clean_search_term, is_natural_language, is_vague, strip_leading_filler};
pub use report::{FoundEntry, MatchKind};
