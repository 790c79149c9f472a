//! Streaming transcript engine.
//!
//! Drives one model turn at a time through `Idle → Sending → Streaming → Idle`,
//! applying reply deltas to the transcript in arrival order. Observers see every
//! mutation through a `watch` channel; an optional [`TranscriptSink`] receives the
//! same mutations synchronously, on the streaming task.

use codesynth_core::agent::{ConversationHandle, ModelService};
use codesynth_core::config::SynthConfig;
use codesynth_core::error::{Result, SynthError};
use codesynth_core::prompt::{Preferences, PromptBuilder};
use codesynth_core::session::{Message, Transcript, TurnOutcome};
use codesynth_core::workspace::DocumentSet;
use futures::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Engine lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No turn in flight.
    Idle,
    /// Request sent, waiting for the reply stream to open.
    Sending,
    /// Applying reply deltas.
    Streaming,
}

/// Receives the transcript after every mutation, on the mutating task.
///
/// Called once per delta; implementations must not block.
pub trait TranscriptSink: Send + Sync {
    fn transcript_changed(&self, transcript: &Transcript);
}

/// Static engine settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub model_id: String,
    pub prompt_builder: PromptBuilder,
}

impl EngineConfig {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            prompt_builder: PromptBuilder::default(),
        }
    }

    pub fn with_prompt_builder(mut self, prompt_builder: PromptBuilder) -> Self {
        self.prompt_builder = prompt_builder;
        self
    }
}

impl From<&SynthConfig> for EngineConfig {
    fn from(config: &SynthConfig) -> Self {
        Self::new(config.model_id.clone()).with_prompt_builder(config.prompt_builder())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnKind {
    Analysis,
    FollowUp { len_before: usize },
}

struct Inner {
    state: EngineState,
    conversation: Option<Arc<dyn ConversationHandle>>,
    cancel: Option<CancellationToken>,
    last_error: Option<String>,
}

/// Owns the transcript and the live conversation.
///
/// Shared behind an `Arc` so [`TranscriptEngine::cancel`] can be called while a
/// turn is awaited elsewhere.
pub struct TranscriptEngine {
    config: EngineConfig,
    model: Arc<dyn ModelService>,
    inner: Mutex<Inner>,
    transcript: watch::Sender<Transcript>,
    sink: Option<Arc<dyn TranscriptSink>>,
}

impl TranscriptEngine {
    /// Creates an idle engine with an empty transcript.
    ///
    /// # Errors
    ///
    /// Returns `Config` when no model id is configured.
    pub fn new(config: EngineConfig, model: Arc<dyn ModelService>) -> Result<Self> {
        if config.model_id.trim().is_empty() {
            return Err(SynthError::config("model id must not be empty"));
        }
        let (transcript, _) = watch::channel(Transcript::new());
        Ok(Self {
            config,
            model,
            inner: Mutex::new(Inner {
                state: EngineState::Idle,
                conversation: None,
                cancel: None,
                last_error: None,
            }),
            transcript,
            sink: None,
        })
    }

    /// Starts from a restored transcript. The first follow-up replays it as history.
    pub fn with_transcript(self, transcript: Transcript) -> Self {
        self.transcript.send_replace(transcript);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn TranscriptSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn state(&self) -> EngineState {
        self.lock().state
    }

    pub fn is_busy(&self) -> bool {
        self.state() != EngineState::Idle
    }

    /// Snapshot of the current transcript.
    pub fn transcript(&self) -> Transcript {
        self.transcript.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Transcript> {
        self.transcript.subscribe()
    }

    /// User-visible message of the last failed turn (`Error: ...`).
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Runs the analysis turn over `documents`.
    ///
    /// Replaces the transcript and the conversation. On failure the partial reply
    /// is kept and the error is returned (and recorded in [`Self::last_error`]).
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for an empty document set or blank objective (nothing changes)
    /// - `InvalidState` while another turn is in flight
    /// - `Stream` when the model fails
    pub async fn start_analysis(
        &self,
        documents: &DocumentSet,
        preferences: &Preferences,
    ) -> Result<TurnOutcome> {
        let prompt = self.config.prompt_builder.build(documents, preferences)?;
        let token = self.begin_turn()?;

        tracing::info!(
            documents = documents.len(),
            prompt_len = prompt.len(),
            model = %self.config.model_id,
            "Starting analysis"
        );

        self.mutate(|transcript| transcript.clear());
        let conversation = self
            .model
            .create_conversation(&self.config.model_id, Vec::new());
        self.lock().conversation = Some(Arc::clone(&conversation));

        let mut guard = TurnGuard::new(self);
        let result = self.stream_reply(conversation, &prompt, &token).await;
        guard.disarm();
        self.finish_turn(TurnKind::Analysis, result)
    }

    /// Sends a follow-up question in the current conversation.
    ///
    /// When the live conversation was lost (restart, cancel, failed analysis) a new
    /// one is seeded with the non-empty transcript entries. On failure the transcript
    /// is restored to exactly what it was before the call.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a blank message or a transcript without context
    /// - `InvalidState` while another turn is in flight
    /// - `Stream` when the model fails
    pub async fn send_follow_up(&self, message: &str) -> Result<TurnOutcome> {
        let message = message.trim();
        if message.is_empty() {
            return Err(SynthError::invalid_input("Follow-up message must not be empty"));
        }
        if !self.transcript.borrow().has_context() {
            return Err(SynthError::invalid_input(
                "Nothing to follow up on: run an analysis first",
            ));
        }
        let token = self.begin_turn()?;

        let live = self.lock().conversation.clone();
        let conversation = match live {
            Some(conversation) => conversation,
            None => {
                let history = self.transcript.borrow().history();
                tracing::debug!(turns = history.len(), "Rebuilding conversation from transcript");
                let conversation = self
                    .model
                    .create_conversation(&self.config.model_id, history);
                self.lock().conversation = Some(Arc::clone(&conversation));
                conversation
            }
        };

        let len_before = self.transcript.borrow().len();
        tracing::info!(message_len = message.len(), "Sending follow-up");
        self.mutate(|transcript| transcript.push(Message::user(message)));

        let mut guard = TurnGuard::new(self);
        let result = self.stream_reply(conversation, message, &token).await;
        guard.disarm();
        self.finish_turn(TurnKind::FollowUp { len_before }, result)
    }

    /// Requests cancellation of the in-flight turn.
    ///
    /// Returns `false` when idle or already cancelled. Text received so far is kept.
    pub fn cancel(&self) -> bool {
        let mut inner = self.lock();
        if inner.state == EngineState::Idle {
            return false;
        }
        inner.last_error = None;
        match &inner.cancel {
            Some(token) if !token.is_cancelled() => {
                tracing::info!(state = ?inner.state, "Cancelling turn");
                token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Empties the transcript and forgets the conversation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` while a turn is in flight.
    pub fn clear(&self) -> Result<()> {
        {
            let mut inner = self.lock();
            if inner.state != EngineState::Idle {
                return Err(SynthError::invalid_state("Cannot clear while a response is in progress"));
            }
            inner.conversation = None;
            inner.last_error = None;
        }
        self.mutate(|transcript| transcript.clear());
        tracing::debug!("Transcript cleared");
        Ok(())
    }

    // ------------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, state: EngineState) {
        self.lock().state = state;
    }

    /// Moves `Idle → Sending` and hands out the turn's cancellation token.
    fn begin_turn(&self) -> Result<CancellationToken> {
        let mut inner = self.lock();
        if inner.state != EngineState::Idle {
            return Err(SynthError::invalid_state(
                "A response is already in progress",
            ));
        }
        let token = CancellationToken::new();
        inner.state = EngineState::Sending;
        inner.cancel = Some(token.clone());
        inner.last_error = None;
        Ok(token)
    }

    /// Applies `f` to the transcript, then notifies the sink.
    fn mutate(&self, f: impl FnOnce(&mut Transcript)) {
        self.transcript.send_modify(f);
        if let Some(sink) = &self.sink {
            sink.transcript_changed(&self.transcript.borrow());
        }
    }

    fn drop_empty_placeholder(&self) {
        let stranded = self
            .transcript
            .borrow()
            .last()
            .is_some_and(|m| m.is_model() && m.is_empty());
        if stranded {
            self.mutate(|transcript| {
                transcript.pop_empty_placeholder();
            });
        }
    }

    async fn stream_reply(
        &self,
        conversation: Arc<dyn ConversationHandle>,
        message: &str,
        token: &CancellationToken,
    ) -> Result<TurnOutcome> {
        let mut deltas = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(TurnOutcome::Cancelled),
            opened = conversation.send_streaming(message) => opened?,
        };

        tracing::debug!("Reply stream opened");
        self.set_state(EngineState::Streaming);
        self.mutate(|transcript| transcript.push(Message::model("")));

        let mut received = 0usize;
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!(deltas = received, "Stopped consuming reply stream");
                    return Ok(TurnOutcome::Cancelled);
                }
                next = deltas.next() => match next {
                    Some(Ok(delta)) => {
                        received += 1;
                        self.mutate(|transcript| {
                            transcript.append_to_last(&delta);
                        });
                    }
                    Some(Err(err)) => return Err(err),
                    None => {
                        tracing::debug!(deltas = received, "Reply stream finished");
                        return Ok(TurnOutcome::Completed);
                    }
                },
            }
        }
    }

    /// Settles the transcript and returns to `Idle`.
    fn finish_turn(&self, kind: TurnKind, result: Result<TurnOutcome>) -> Result<TurnOutcome> {
        match (&result, kind) {
            (Err(_), TurnKind::FollowUp { len_before }) => {
                self.mutate(|transcript| transcript.truncate(len_before));
            }
            _ => self.drop_empty_placeholder(),
        }

        let mut inner = self.lock();
        inner.state = EngineState::Idle;
        inner.cancel = None;
        match &result {
            Ok(TurnOutcome::Completed) => {
                tracing::info!(?kind, "Turn completed");
            }
            Ok(TurnOutcome::Cancelled) => {
                tracing::info!(?kind, "Turn cancelled");
                inner.conversation = None;
                inner.last_error = None;
            }
            Err(err) => {
                tracing::error!(?kind, error = %err, "Turn failed");
                if kind == TurnKind::Analysis {
                    inner.conversation = None;
                }
                inner.last_error = Some(err.user_message());
            }
        }
        result
    }
}

/// Returns the engine to `Idle` if a turn future is dropped mid-flight.
struct TurnGuard<'a> {
    engine: &'a TranscriptEngine,
    armed: bool,
}

impl<'a> TurnGuard<'a> {
    fn new(engine: &'a TranscriptEngine) -> Self {
        Self {
            engine,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::warn!("Turn abandoned before completion");
        self.engine.drop_empty_placeholder();
        let mut inner = self.engine.lock();
        inner.state = EngineState::Idle;
        inner.cancel = None;
        inner.conversation = None;
    }
}
