//! Contract with the remote chat model.
//!
//! A [`ModelService`] opens conversations; a [`ConversationHandle`] sends one
//! message at a time and yields the reply as a lazy stream of text deltas.
//!
//! # Example
//! ```ignore
//! use futures::StreamExt;
//!
//! let conversation = service.create_conversation("gemini-2.5-flash", Vec::new());
//! let mut deltas = conversation.send_streaming("Hello").await?;
//! while let Some(delta) = deltas.next().await {
//!     print!("{}", delta?);
//! }
//! ```

use crate::error::Result;
use crate::session::ConversationTurn;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

/// Finite stream of reply deltas. May fail at any point; not restartable.
pub type DeltaStream = BoxStream<'static, Result<String>>;

/// Factory for conversations with a remote model.
pub trait ModelService: Send + Sync {
    /// Opens a conversation, seeded with `history` when the live one was lost.
    fn create_conversation(
        &self,
        model_id: &str,
        history: Vec<ConversationTurn>,
    ) -> Arc<dyn ConversationHandle>;
}

/// A conversation with its own history.
///
/// Implementations append the exchange to their history only once the returned
/// stream has been consumed to completion; a failed or abandoned stream leaves the
/// history untouched.
#[async_trait]
pub trait ConversationHandle: Send + Sync {
    /// Sends `message` and returns the reply stream once the model starts answering.
    async fn send_streaming(&self, message: &str) -> Result<DeltaStream>;

    /// Prior turns currently held by the conversation.
    fn history(&self) -> Vec<ConversationTurn>;
}
