//! Search over the transcript.
//!
//! Filtering and highlighting are presentational: stored messages are never touched.

mod filter;
mod highlight;

pub use filter::{HighlightedRun, TranscriptView, ViewEntry, filter};
pub use highlight::{contains_ignore_case, match_spans};
