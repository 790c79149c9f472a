//! Scripted model service shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use codesynth_core::agent::{ConversationHandle, DeltaStream, ModelService};
use codesynth_core::error::{Result, SynthError};
use codesynth_core::session::ConversationTurn;
use futures::StreamExt;
use futures::channel::mpsc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// What the next `send_streaming` call does.
pub enum Reply {
    /// Opens a stream yielding these items, then ends.
    Items(Vec<Result<String>>),
    /// Fails before the stream opens.
    OpenError(SynthError),
    /// Opens a stream fed by the test through a channel.
    Channel(mpsc::UnboundedReceiver<Result<String>>),
    /// Never opens.
    Pending,
}

impl Reply {
    pub fn deltas(deltas: &[&str]) -> Self {
        Self::Items(deltas.iter().map(|d| Ok(d.to_string())).collect())
    }
}

#[derive(Default)]
struct Shared {
    replies: Mutex<VecDeque<Reply>>,
    conversations: Mutex<Vec<Vec<ConversationTurn>>>,
    sent: Mutex<Vec<String>>,
}

/// Hands out scripted replies in order, across all conversations.
#[derive(Clone, Default)]
pub struct ScriptedModel {
    shared: Arc<Shared>,
}

impl ScriptedModel {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        let model = Self::default();
        model.shared.replies.lock().unwrap().extend(replies);
        model
    }

    pub fn push(&self, reply: Reply) {
        self.shared.replies.lock().unwrap().push_back(reply);
    }

    /// Seed history of every conversation created so far.
    pub fn conversations(&self) -> Vec<Vec<ConversationTurn>> {
        self.shared.conversations.lock().unwrap().clone()
    }

    /// Every message sent, in order.
    pub fn sent(&self) -> Vec<String> {
        self.shared.sent.lock().unwrap().clone()
    }
}

impl ModelService for ScriptedModel {
    fn create_conversation(
        &self,
        _model_id: &str,
        history: Vec<ConversationTurn>,
    ) -> Arc<dyn ConversationHandle> {
        self.shared.conversations.lock().unwrap().push(history.clone());
        Arc::new(ScriptedConversation {
            shared: Arc::clone(&self.shared),
            history,
        })
    }
}

struct ScriptedConversation {
    shared: Arc<Shared>,
    history: Vec<ConversationTurn>,
}

#[async_trait]
impl ConversationHandle for ScriptedConversation {
    async fn send_streaming(&self, message: &str) -> Result<DeltaStream> {
        self.shared.sent.lock().unwrap().push(message.to_string());
        let reply = self.shared.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Items(items)) => Ok(futures::stream::iter(items).boxed()),
            Some(Reply::OpenError(err)) => Err(err),
            Some(Reply::Channel(rx)) => Ok(rx.boxed()),
            Some(Reply::Pending) => futures::future::pending().await,
            None => Err(SynthError::internal("no scripted reply left")),
        }
    }

    fn history(&self) -> Vec<ConversationTurn> {
        self.history.clone()
    }
}
