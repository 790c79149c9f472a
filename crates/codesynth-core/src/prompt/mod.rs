//! Prompt construction: questionnaire preferences and the analysis request.

mod builder;
mod preferences;

pub use builder::PromptBuilder;
pub use preferences::{ArchitecturalStyle, DocumentationLevel, Preferences};
