//! Questionnaire answers collected before an analysis run.

use crate::error::{Result, SynthError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How heavily the synthesized script should be documented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentationLevel {
    Minimal,
    #[default]
    Standard,
    Extensive,
}

impl fmt::Display for DocumentationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DocumentationLevel::Minimal => "minimal",
            DocumentationLevel::Standard => "standard",
            DocumentationLevel::Extensive => "extensive",
        };
        f.write_str(label)
    }
}

/// Preferred structure of the synthesized script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchitecturalStyle {
    /// Let the model pick the style that fits the code.
    #[default]
    Auto,
    Oop,
    Functional,
    Procedural,
}

impl fmt::Display for ArchitecturalStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ArchitecturalStyle::Auto => "auto",
            ArchitecturalStyle::Oop => "oop",
            ArchitecturalStyle::Functional => "functional",
            ArchitecturalStyle::Procedural => "procedural",
        };
        f.write_str(label)
    }
}

/// Preferences for one analysis run. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    objective: String,
    #[serde(default)]
    libraries: String,
    #[serde(default)]
    documentation_level: DocumentationLevel,
    #[serde(default)]
    architectural_style: ArchitecturalStyle,
}

impl Preferences {
    /// Creates preferences with default documentation level and style.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when `objective` is blank.
    pub fn new(objective: impl Into<String>) -> Result<Self> {
        let preferences = Self {
            objective: objective.into(),
            libraries: String::new(),
            documentation_level: DocumentationLevel::default(),
            architectural_style: ArchitecturalStyle::default(),
        };
        preferences.validate()?;
        Ok(preferences)
    }

    pub fn with_libraries(mut self, libraries: impl Into<String>) -> Self {
        self.libraries = libraries.into();
        self
    }

    pub fn with_documentation_level(mut self, level: DocumentationLevel) -> Self {
        self.documentation_level = level;
        self
    }

    pub fn with_architectural_style(mut self, style: ArchitecturalStyle) -> Self {
        self.architectural_style = style;
        self
    }

    /// Checks the invariants a deserialized value may have skipped.
    pub fn validate(&self) -> Result<()> {
        if self.objective.trim().is_empty() {
            return Err(SynthError::invalid_input("The primary objective must not be empty"));
        }
        Ok(())
    }

    pub fn objective(&self) -> &str {
        &self.objective
    }

    pub fn libraries(&self) -> &str {
        &self.libraries
    }

    pub fn documentation_level(&self) -> DocumentationLevel {
        self.documentation_level
    }

    pub fn architectural_style(&self) -> ArchitecturalStyle {
        self.architectural_style
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_objective_is_rejected() {
        let err = Preferences::new("   ").unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_defaults() {
        let preferences = Preferences::new("demo script").unwrap();
        assert_eq!(preferences.documentation_level(), DocumentationLevel::Standard);
        assert_eq!(preferences.architectural_style(), ArchitecturalStyle::Auto);
        assert_eq!(preferences.libraries(), "");
    }

    #[test]
    fn test_deserialize_form_payload() {
        let json = r#"{"objective":"cli tool","libraries":"click","documentationLevel":"extensive","architecturalStyle":"oop"}"#;
        let preferences: Preferences = serde_json::from_str(json).unwrap();
        assert!(preferences.validate().is_ok());
        assert_eq!(preferences.documentation_level(), DocumentationLevel::Extensive);
        assert_eq!(preferences.architectural_style(), ArchitecturalStyle::Oop);
    }
}
