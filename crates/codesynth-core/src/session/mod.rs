//! Session domain module.
//!
//! # Module Structure
//!
//! - `message`: Message types (`MessageRole`, `Message`, `ConversationTurn`)
//! - `transcript`: The ordered message log (`Transcript`) and `TurnOutcome`
//! - `repository`: Persistence contract (`SessionStateRepository`, `SessionSnapshot`)

mod message;
mod repository;
mod transcript;

// Re-export public API
pub use message::{ConversationTurn, Message, MessageRole};
pub use repository::{SessionSnapshot, SessionStateRepository};
pub use transcript::{Transcript, TurnOutcome};
