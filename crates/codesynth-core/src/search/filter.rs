//! Transcript filtering for the searchable history view.

use super::highlight::{contains_ignore_case, match_spans};
use crate::review::StructuredDocument;
use crate::session::{Message, Transcript};
use std::ops::Range;

/// A prose run with the spans to highlight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightedRun<'a> {
    pub text: &'a str,
    /// Byte ranges into `text`; empty when there is nothing to highlight.
    pub spans: Vec<Range<usize>>,
}

/// One message that passed the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewEntry<'a> {
    /// Position in the full transcript.
    pub index: usize,
    pub message: &'a Message,
    /// Prose runs in display order: the whole content for user messages, the
    /// extractor's prose runs for model messages.
    pub prose: Vec<HighlightedRun<'a>>,
}

/// Projection of a transcript for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptView<'a> {
    pub query: &'a str,
    pub entries: Vec<ViewEntry<'a>>,
}

impl<'a> TranscriptView<'a> {
    pub fn messages(&self) -> impl Iterator<Item = &'a Message> + '_ {
        self.entries.iter().map(|entry| entry.message)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when a query filtered out every message of a non-empty transcript.
    pub fn is_no_match(&self, transcript: &Transcript) -> bool {
        !self.query.is_empty() && self.entries.is_empty() && !transcript.is_empty()
    }
}

/// Filters `transcript` by `query`, case-insensitively, preserving order.
///
/// An empty query keeps every message and highlights nothing. A whitespace-only
/// query still filters but highlights nothing.
pub fn filter<'a>(transcript: &'a Transcript, query: &'a str) -> TranscriptView<'a> {
    let highlight = !query.trim().is_empty();

    let entries = transcript
        .messages()
        .iter()
        .enumerate()
        .filter(|(_, message)| contains_ignore_case(&message.content, query))
        .map(|(index, message)| ViewEntry {
            index,
            message,
            prose: prose_runs(message)
                .into_iter()
                .map(|text| HighlightedRun {
                    text,
                    spans: if highlight {
                        match_spans(text, query)
                    } else {
                        Vec::new()
                    },
                })
                .collect(),
        })
        .collect();

    TranscriptView { query, entries }
}

fn prose_runs(message: &Message) -> Vec<&str> {
    if message.is_model() {
        StructuredDocument::extract(&message.content).prose_runs()
    } else {
        vec![message.content.as_str()]
    }
}
