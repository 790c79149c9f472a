//! Assembles the analysis request sent as the first message of a session.

use super::preferences::{ArchitecturalStyle, Preferences};
use crate::error::{Result, SynthError};
use crate::review::{ANALYSIS_HEADER, SCRIPT_HEADER};
use crate::workspace::DocumentSet;
use minijinja::{Environment, context};

const NO_LIBRARIES: &str = "User did not specify any.";
const AUTO_ARCHITECTURE: &str = "Determine the best style based on the code";

const ANALYSIS_TEMPLATE: &str = r#"As an expert {{ language }} developer and senior code architect, your task is to perform an in-depth analysis of the following {{ language }} files, taking into account the user's specific preferences for the final synthesized script. Your goal is to synthesize them into a single, cohesive, and advanced "super script" that represents the most robust and production-ready version possible.

**User Preferences for Synthesis**
*   **Primary Objective**: {{ objective }}
*   **Essential Libraries**: {{ libraries }}
*   **Documentation Level**: {{ documentation }}
*   **Architectural Style**: {{ architecture }}

Your response must be in two parts, clearly separated with Markdown, using the exact section titles below.

{{ analysis_header }}

Review all the provided code and identify:
*   **Strengths**: Point out 2-3 examples of excellent coding practices (e.g., clean architecture, efficient algorithms, good documentation).
*   **Areas for Improvement**: Identify weaknesses such as style violations, potential bugs, security vulnerabilities, or inefficient code. Provide specific examples and suggest how to fix them.
*   **Novel & Useful Portions**: Explicitly identify any unique, clever, or particularly advanced algorithms, data structures, or techniques present in the code that should be preserved or enhanced in the final script.

{{ script_header }}

Combine the functionalities from all provided files into a single, well-structured, production-grade {{ language }} script. This script must:
*   Be cohesive and logically organized, guided by the user's preferred **Architectural Style**.
*   Incorporate the user's specified **Essential Libraries** and meet their **Primary Objective**.
*   Eliminate redundant code.
*   Incorporate and potentially enhance the **novel and useful portions** identified in Part 1.
*   Consolidate all necessary imports at the top.
*   Include a clear entry point. If multiple execution paths exist, provide a robust command-line interface to select between them.
*   Be documented according to the user's specified **Documentation Level**.
*   **CRITICAL REQUIREMENT**: The entire synthesized script must be presented within a single, runnable ```{{ fence }} code block. Do not split the script into multiple files or multiple code blocks.

Here is the code to analyze:
{% for doc in documents %}
--- FILE: {{ doc.name }} ---

{{ doc.content }}
{% endfor %}"#;

/// Builds the analysis prompt for a document set.
///
/// The target language only changes the wording and the fence tag the model is
/// asked to use; section headers are fixed because the extractor relies on them.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    language: String,
    fence_tag: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new("Python", "python")
    }
}

impl PromptBuilder {
    pub fn new(language: impl Into<String>, fence_tag: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            fence_tag: fence_tag.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Renders the request for `documents` in add-order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty document set.
    pub fn build(&self, documents: &DocumentSet, preferences: &Preferences) -> Result<String> {
        if documents.is_empty() {
            return Err(SynthError::invalid_input(
                "Please upload at least one file to review.",
            ));
        }
        preferences.validate()?;

        let libraries = match preferences.libraries().trim() {
            "" => NO_LIBRARIES.to_string(),
            listed => listed.to_string(),
        };
        let architecture = match preferences.architectural_style() {
            ArchitecturalStyle::Auto => AUTO_ARCHITECTURE.to_string(),
            style => style.to_string(),
        };
        let documents: Vec<_> = documents.iter().collect();

        let env = Environment::new();
        let prompt = env.render_str(
            ANALYSIS_TEMPLATE,
            context! {
                language => &self.language,
                fence => &self.fence_tag,
                objective => preferences.objective(),
                libraries => libraries,
                documentation => preferences.documentation_level().to_string(),
                architecture => architecture,
                analysis_header => ANALYSIS_HEADER,
                script_header => SCRIPT_HEADER,
                documents => documents,
            },
        )?;
        Ok(prompt)
    }
}
