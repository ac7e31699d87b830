//! CLI command handlers, one per file.

mod completions;
mod get;
mod matching;
mod ping;
mod scan;

pub use completions::run_completions;
pub use get::run_get;
pub use matching::run_match;
pub use ping::run_ping;
pub use scan::run_scan;
