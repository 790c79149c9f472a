//! Application layer for the Code Synthesizer.
//!
//! Provides the streaming transcript engine and the session use case that
//! coordinates documents, the engine and persistence.

pub mod engine;
pub mod session_usecase;
pub mod telemetry;
mod transcript_writer;

pub use engine::{EngineConfig, EngineState, TranscriptEngine, TranscriptSink};
pub use session_usecase::SynthesizerSession;
pub use telemetry::init_tracing;
