//! Session state repository trait.
//!
//! Defines the interface for persisting the three pieces of session state:
//! the document set, the transcript and the last-selected document name.

use crate::error::Result;
use crate::session::Transcript;
use crate::workspace::DocumentSet;

/// Everything restored at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub documents: DocumentSet,
    pub transcript: Transcript,
    pub selected_document: Option<String>,
}

/// An abstract repository for session state persistence.
///
/// # Implementation Notes
///
/// Loading never fails on corrupt data: unreadable values fall back to empty
/// state and are logged. Write methods are called after every in-memory mutation.
pub trait SessionStateRepository: Send + Sync {
    /// Loads the persisted session, falling back to empty values per key.
    fn load(&self) -> SessionSnapshot;

    fn save_documents(&self, documents: &DocumentSet) -> Result<()>;

    fn save_transcript(&self, transcript: &Transcript) -> Result<()>;

    /// Persists the selection, or removes the key when `None`.
    fn save_selected_document(&self, name: Option<&str>) -> Result<()>;

    /// Erases every persisted key.
    fn clear(&self) -> Result<()>;
}
