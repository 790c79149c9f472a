//! Synthesizer session use case.
//!
//! `SynthesizerSession` wires the uploaded document set, the transcript engine and
//! session persistence together, so that every state change the user can see is
//! written through to the store.

use crate::engine::{EngineConfig, EngineState, TranscriptEngine};
use crate::transcript_writer::TranscriptWriter;
use codesynth_core::agent::ModelService;
use codesynth_core::config::SynthConfig;
use codesynth_core::error::{Result, SynthError};
use codesynth_core::prompt::Preferences;
use codesynth_core::review::{self, ScriptArtifact, StructuredDocument};
use codesynth_core::search::{self, TranscriptView};
use codesynth_core::session::{SessionStateRepository, Transcript, TurnOutcome};
use codesynth_core::workspace::{Document, DocumentSet};
use codesynth_infrastructure::{
    ConfigService, FileIngestor, JsonFileStore, KvSessionStateRepository, SynthPaths,
};
use codesynth_interaction::GeminiModelService;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

#[derive(Debug, Default)]
struct Workspace {
    documents: DocumentSet,
    selected: Option<String>,
}

/// One user's synthesizer workspace: documents, selection and transcript.
///
/// # Example
///
/// ```ignore
/// let session = SynthesizerSession::open(&SynthPaths::new(None)?)?;
/// session.ingest_files(&paths).await?;
/// let preferences = Preferences::new("Merge into one CLI tool")?;
/// session.start_analysis(&preferences).await?;
/// if let Some(path) = session.export_script(Path::new(".")).await? {
///     println!("wrote {}", path.display());
/// }
/// ```
pub struct SynthesizerSession {
    config: SynthConfig,
    engine: Arc<TranscriptEngine>,
    repository: Arc<dyn SessionStateRepository>,
    writer: Arc<TranscriptWriter>,
    ingestor: FileIngestor,
    workspace: Mutex<Workspace>,
}

impl SynthesizerSession {
    /// Restores the persisted session and builds the engine around it.
    ///
    /// The saved selection is kept only if that document still exists; otherwise
    /// the first document is selected.
    ///
    /// # Errors
    ///
    /// Returns `Config` for an unusable configuration.
    pub fn bootstrap(
        config: SynthConfig,
        model: Arc<dyn ModelService>,
        repository: Arc<dyn SessionStateRepository>,
    ) -> Result<Self> {
        config.validate()?;
        let snapshot = repository.load();

        let selected = snapshot
            .selected_document
            .filter(|name| snapshot.documents.contains(name))
            .or_else(|| snapshot.documents.first().map(|d| d.name.clone()));

        let writer = Arc::new(TranscriptWriter::new(Arc::clone(&repository)));
        let engine = TranscriptEngine::new(EngineConfig::from(&config), model)?
            .with_transcript(snapshot.transcript)
            .with_sink(writer.clone());

        tracing::info!(
            documents = snapshot.documents.len(),
            messages = engine.transcript().len(),
            selected = ?selected,
            "Session restored"
        );

        Ok(Self {
            ingestor: FileIngestor::new(&config.source_extensions),
            config,
            engine: Arc::new(engine),
            repository,
            writer,
            workspace: Mutex::new(Workspace {
                documents: snapshot.documents,
                selected,
            }),
        })
    }

    /// Opens the session described by the files under `paths`.
    ///
    /// Reads `config.toml` and the Gemini key, then restores state from the JSON
    /// store (`storage_path` or `state.json`).
    ///
    /// # Errors
    ///
    /// - `Config` when no API key is available
    /// - `Serialization`/`Io` for an unreadable configuration file
    ///
    /// A corrupt state file is set aside and the session starts empty.
    pub fn open(paths: &SynthPaths) -> Result<Self> {
        let config_service = ConfigService::new(paths);
        let config = config_service.load_config()?;
        let secrets = config_service.load_secrets()?;
        let model = Arc::new(GeminiModelService::new(secrets.require_gemini_key()?)?);

        let state_path = config
            .storage_path
            .clone()
            .unwrap_or_else(|| paths.state_file());
        let store = Arc::new(JsonFileStore::open(state_path)?);
        let repository = Arc::new(KvSessionStateRepository::new(store));

        Self::bootstrap(config, model, repository)
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Shared handle to the engine, e.g. for cancelling from another task.
    pub fn engine(&self) -> Arc<TranscriptEngine> {
        Arc::clone(&self.engine)
    }

    fn workspace(&self) -> MutexGuard<'_, Workspace> {
        self.workspace
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ========================================================================
    // Documents
    // ========================================================================

    pub fn documents(&self) -> DocumentSet {
        self.workspace().documents.clone()
    }

    pub fn selected_document(&self) -> Option<Document> {
        let workspace = self.workspace();
        let name = workspace.selected.as_deref()?;
        workspace.documents.get(name).cloned()
    }

    /// Merges `documents` into the set, skipping names already present.
    ///
    /// The first document ever added becomes the selection.
    ///
    /// # Returns
    ///
    /// The number of documents actually added.
    pub fn add_documents(&self, documents: Vec<Document>) -> Result<usize> {
        let mut workspace = self.workspace();
        let added = workspace.documents.add_all(documents);
        if added == 0 {
            return Ok(0);
        }
        self.repository.save_documents(&workspace.documents)?;

        if workspace.selected.is_none() {
            workspace.selected = workspace.documents.first().map(|d| d.name.clone());
            self.repository
                .save_selected_document(workspace.selected.as_deref())?;
        }
        tracing::info!(added, total = workspace.documents.len(), "Documents added");
        Ok(added)
    }

    /// Reads `paths` from disk and adds the accepted files.
    pub async fn ingest_files(&self, paths: &[PathBuf]) -> Result<usize> {
        let documents = self.ingestor.ingest(paths).await;
        self.add_documents(documents)
    }

    /// # Errors
    ///
    /// Returns `InvalidInput` when no document has that name.
    pub fn select_document(&self, name: &str) -> Result<()> {
        let mut workspace = self.workspace();
        if !workspace.documents.contains(name) {
            return Err(SynthError::invalid_input(format!("Unknown document: {name}")));
        }
        workspace.selected = Some(name.to_string());
        self.repository.save_selected_document(Some(name))
    }

    // ========================================================================
    // Conversation
    // ========================================================================

    /// Runs the analysis over the current document set.
    pub async fn start_analysis(&self, preferences: &Preferences) -> Result<TurnOutcome> {
        let documents = self.documents();
        self.engine.start_analysis(&documents, preferences).await
    }

    pub async fn send_follow_up(&self, message: &str) -> Result<TurnOutcome> {
        self.engine.send_follow_up(message).await
    }

    pub fn cancel(&self) -> bool {
        self.engine.cancel()
    }

    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    pub fn transcript(&self) -> Transcript {
        self.engine.transcript()
    }

    pub fn subscribe(&self) -> watch::Receiver<Transcript> {
        self.engine.subscribe()
    }

    pub fn last_error(&self) -> Option<String> {
        self.engine.last_error()
    }

    /// Waits until the current transcript has reached the store.
    ///
    /// Transcript writes happen off the streaming task; documents and selection
    /// are written synchronously.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    /// Filters the transcript by `query` and hands the view to `render`.
    pub fn search<R>(&self, query: &str, render: impl FnOnce(&TranscriptView<'_>) -> R) -> R {
        let transcript = self.engine.transcript();
        let view = search::filter(&transcript, query);
        render(&view)
    }

    /// Extracts the most recent model message and hands it to `render`.
    ///
    /// Returns `None` when the model has not answered yet.
    pub fn latest_review<R>(&self, render: impl FnOnce(&StructuredDocument<'_>) -> R) -> Option<R> {
        let transcript = self.engine.transcript();
        let message = transcript.latest_model_message()?;
        Some(render(&review::extract(&message.content)))
    }

    /// The downloadable script of the latest model message, if it has one.
    pub fn latest_script(&self) -> Option<ScriptArtifact> {
        self.latest_review(|document| {
            ScriptArtifact::from_document(
                document,
                &self.config.script_extension,
                &self.config.comment_prefix,
            )
        })
        .flatten()
    }

    /// Writes the latest script into `dir`.
    ///
    /// Returns `Ok(None)` when there is no complete script to export.
    pub async fn export_script(&self, dir: &Path) -> Result<Option<PathBuf>> {
        match self.latest_script() {
            Some(artifact) => codesynth_infrastructure::write_script(&artifact, dir)
                .await
                .map(Some),
            None => Ok(None),
        }
    }

    /// Forgets documents, selection, transcript and conversation, and erases
    /// every persisted key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` while a turn is in flight.
    pub async fn clear_all(&self) -> Result<()> {
        self.engine.clear()?;
        {
            let mut workspace = self.workspace();
            workspace.documents.clear();
            workspace.selected = None;
        }
        // Pending transcript writes must land before the keys are erased.
        self.writer.flush().await;
        self.repository.clear()?;
        tracing::info!("Session cleared");
        Ok(())
    }
}
