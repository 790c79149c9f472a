//! Section and code-block extraction from model responses.
//!
//! The response is split at the first recognised script header into an analysis
//! section and a script section. Each section is tokenised into prose and fenced
//! code runs; closed code runs of the script section form the downloadable script.

mod document;
mod lexer;
mod lines;

pub use document::{CodeBlock, Layout, Run, SCRIPT_JOIN_MARKER, Segment, StructuredDocument};
pub use lexer::{Token, tokenize};
pub use lines::{ProseLine, classify_lines};

use serde::{Deserialize, Serialize};

/// Title the model is asked to open its analysis with.
pub const ANALYSIS_HEADER: &str = "**Part 1: Best Practices & Novelty Analysis**";

/// Title the model is asked to open the synthesized script section with.
pub const SCRIPT_HEADER: &str = "**Part 2: The Advanced Super Script**";

/// Every accepted spelling of the script section title.
pub const SCRIPT_HEADERS: [&str; 3] = [
    SCRIPT_HEADER,
    "**Part 2: The Super Script**",
    "**The Super Script**",
];

/// Base name of the exported script file.
pub const SCRIPT_FILE_STEM: &str = "synthesized_script";

/// Shorthand for [`StructuredDocument::extract`].
pub fn extract(text: &str) -> StructuredDocument<'_> {
    StructuredDocument::extract(text)
}

/// The downloadable script as a named file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptArtifact {
    pub file_name: String,
    pub content: String,
}

impl ScriptArtifact {
    /// Builds `synthesized_script.<extension>` from the document's script section.
    pub fn from_document(
        document: &StructuredDocument<'_>,
        extension: &str,
        comment_prefix: &str,
    ) -> Option<Self> {
        let content = document.downloadable_script(comment_prefix)?;
        Some(Self {
            file_name: format!("{SCRIPT_FILE_STEM}.{}", extension.trim_start_matches('.')),
            content,
        })
    }
}
