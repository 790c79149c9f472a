//! Remote model adapters implementing the `codesynth_core::agent` contract.

pub mod gemini_api_agent;

pub use gemini_api_agent::{DEFAULT_GEMINI_MODEL, GeminiModelService};
