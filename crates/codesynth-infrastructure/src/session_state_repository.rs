//! Session state persisted through a [`KeyValueStore`].
//!
//! Each piece of state lives under its own key as a JSON string, so a corrupt
//! value only loses that piece.

use codesynth_core::error::{Result, SynthError};
use codesynth_core::session::{Message, SessionSnapshot, SessionStateRepository, Transcript};
use codesynth_core::storage::KeyValueStore;
use codesynth_core::workspace::DocumentSet;
use serde::de::DeserializeOwned;
use std::sync::Arc;

pub const FILES_KEY: &str = "gemini_code_synthesizer_files";
pub const CHAT_HISTORY_KEY: &str = "gemini_code_synthesizer_chat_history";
pub const SELECTED_FILE_KEY: &str = "gemini_code_synthesizer_selected_file_name";

/// [`SessionStateRepository`] over any key/value store.
#[derive(Clone)]
pub struct KvSessionStateRepository {
    store: Arc<dyn KeyValueStore>,
}

impl KvSessionStateRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Reads and parses `key`, returning `None` when it is unset.
    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| SynthError::StorageParse {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    /// Like [`Self::read_json`] but logs and discards failures.
    fn read_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.read_json(key) {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding unreadable session state");
                T::default()
            }
        }
    }
}

impl SessionStateRepository for KvSessionStateRepository {
    fn load(&self) -> SessionSnapshot {
        let documents: DocumentSet = self.read_or_default(FILES_KEY);
        let messages: Vec<Message> = self.read_or_default(CHAT_HISTORY_KEY);
        let selected_document: Option<String> = match self.store.get(SELECTED_FILE_KEY) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = SELECTED_FILE_KEY, error = %e, "Discarding unreadable session state");
                None
            }
        };

        tracing::debug!(
            documents = documents.len(),
            messages = messages.len(),
            "Loaded session state"
        );

        SessionSnapshot {
            documents,
            transcript: Transcript::restore(messages),
            selected_document,
        }
    }

    fn save_documents(&self, documents: &DocumentSet) -> Result<()> {
        self.store
            .set(FILES_KEY, &serde_json::to_string(documents)?)
    }

    fn save_transcript(&self, transcript: &Transcript) -> Result<()> {
        self.store
            .set(CHAT_HISTORY_KEY, &serde_json::to_string(transcript.messages())?)
    }

    fn save_selected_document(&self, name: Option<&str>) -> Result<()> {
        match name {
            Some(name) => self.store.set(SELECTED_FILE_KEY, name),
            None => self.store.remove(SELECTED_FILE_KEY),
        }
    }

    fn clear(&self) -> Result<()> {
        for key in [FILES_KEY, CHAT_HISTORY_KEY, SELECTED_FILE_KEY] {
            self.store.remove(key)?;
        }
        Ok(())
    }
}
