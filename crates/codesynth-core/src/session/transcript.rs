//! The ordered message log of one analysis session.

use super::message::{ConversationTurn, Message};
use serde::{Deserialize, Serialize};

/// How a streaming turn ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The stream ran to completion.
    Completed,
    /// The user cancelled; output received so far was kept.
    Cancelled,
}

/// Ordered sequence of messages.
///
/// Append-only, except that the last element may grow while streaming, a failed
/// follow-up is rolled back with [`Transcript::truncate`], and [`Transcript::clear`]
/// resets everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a transcript from restored messages.
    ///
    /// A trailing empty model message can only be a placeholder of an interrupted
    /// stream, so it is dropped.
    pub fn restore(mut messages: Vec<Message>) -> Self {
        if messages.last().is_some_and(|m| m.is_model() && m.is_empty()) {
            messages.pop();
        }
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Most recent model message, if any.
    pub fn latest_model_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_model())
    }

    /// True when at least one message carries content a follow-up can build on.
    pub fn has_context(&self) -> bool {
        self.messages.iter().any(|m| !m.is_empty())
    }

    /// Non-empty messages as conversation history, in order.
    pub fn history(&self) -> Vec<ConversationTurn> {
        self.messages
            .iter()
            .filter(|m| !m.is_empty())
            .map(ConversationTurn::from)
            .collect()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Appends `delta` to the last message in place.
    ///
    /// Returns `false` when the transcript is empty.
    pub fn append_to_last(&mut self, delta: &str) -> bool {
        match self.messages.last_mut() {
            Some(last) => {
                last.content.push_str(delta);
                true
            }
            None => false,
        }
    }

    /// Removes the last message if it is an empty model placeholder.
    pub fn pop_empty_placeholder(&mut self) -> bool {
        if self.messages.last().is_some_and(|m| m.is_model() && m.is_empty()) {
            self.messages.pop();
            true
        } else {
            false
        }
    }

    pub fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl From<Vec<Message>> for Transcript {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MessageRole;

    #[test]
    fn test_restore_drops_stranded_placeholder() {
        let transcript = Transcript::restore(vec![
            Message::model("analysis"),
            Message::user("why?"),
            Message::model(""),
        ]);
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.last().unwrap().role, MessageRole::User);
    }

    #[test]
    fn test_history_skips_empty_entries() {
        let transcript = Transcript::from(vec![
            Message::model(""),
            Message::model("first answer"),
            Message::user("follow up"),
        ]);

        let history = transcript.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].text, "first answer");
        assert_eq!(history[1].role, MessageRole::User);
    }

    #[test]
    fn test_has_context() {
        assert!(!Transcript::new().has_context());
        assert!(!Transcript::from(vec![Message::model("")]).has_context());
        assert!(Transcript::from(vec![Message::model("x")]).has_context());
    }

    #[test]
    fn test_append_to_last() {
        let mut transcript = Transcript::new();
        assert!(!transcript.append_to_last("lost"));

        transcript.push(Message::model(""));
        transcript.append_to_last("Hel");
        transcript.append_to_last("lo");
        assert_eq!(transcript.last().unwrap().content, "Hello");
    }

    #[test]
    fn test_serializes_like_stored_chat_history() {
        let transcript = Transcript::from(vec![Message::user("hi"), Message::model("hello")]);
        let json = serde_json::to_string(&transcript).unwrap();
        assert_eq!(
            json,
            r#"[{"role":"user","content":"hi"},{"role":"model","content":"hello"}]"#
        );
    }
}
