//! Configuration models.
//!
//! Loading lives in the infrastructure crate; these are the plain values it produces.

use crate::error::{Result, SynthError};
use crate::prompt::PromptBuilder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_MODEL_ID: &str = "gemini-2.5-flash";

/// Application settings read from `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SynthConfig {
    /// Model used for every conversation.
    pub model_id: String,
    /// Accepted upload extensions, without the dot.
    pub source_extensions: Vec<String>,
    /// Language named in the analysis prompt.
    pub language: String,
    /// Fence tag the model is asked to use for the script.
    pub fence_tag: String,
    /// Extension of the exported script file.
    pub script_extension: String,
    /// Line-comment prefix used between concatenated script blocks.
    pub comment_prefix: String,
    /// Session state file; the platform config directory is used when unset.
    pub storage_path: Option<PathBuf>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            source_extensions: vec!["py".to_string()],
            language: "Python".to_string(),
            fence_tag: "python".to_string(),
            script_extension: "py".to_string(),
            comment_prefix: "#".to_string(),
            storage_path: None,
        }
    }
}

impl SynthConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model_id.trim().is_empty() {
            return Err(SynthError::config("model_id must not be empty"));
        }
        if self.source_extensions.is_empty() {
            return Err(SynthError::config("source_extensions must list at least one extension"));
        }
        Ok(())
    }

    pub fn prompt_builder(&self) -> PromptBuilder {
        PromptBuilder::new(&self.language, &self.fence_tag)
    }
}

/// Gemini credentials.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GeminiSecret {
    pub api_key: String,
}

/// Contents of `secret.json`, possibly completed from the environment.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<GeminiSecret>,
}

impl SecretConfig {
    /// Returns the Gemini API key.
    ///
    /// # Errors
    ///
    /// Returns `Config` when no non-blank key is configured.
    pub fn require_gemini_key(&self) -> Result<&str> {
        self.gemini
            .as_ref()
            .map(|g| g.api_key.trim())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| SynthError::config("API key not set: configure gemini.api_key or GEMINI_API_KEY"))
    }
}
