//! Error types for the Code Synthesizer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire synthesizer workspace.
///
/// A user-initiated cancel is not represented here; it is reported as
/// [`crate::session::TurnOutcome::Cancelled`].
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SynthError {
    /// Required credential or configuration is missing or unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input rejected locally before any external call.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not permitted in the current engine state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Persisted state could not be parsed.
    #[error("Failed to parse stored '{key}': {message}")]
    StorageParse { key: String, message: String },

    /// Model or transport failure while sending or streaming.
    #[error("{message}")]
    Stream {
        status_code: Option<u16>,
        message: String,
        is_retryable: bool,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SynthError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an InvalidInput error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Creates an InvalidState error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Creates a non-retryable Stream error without an HTTP status.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream {
            status_code: None,
            message: message.into(),
            is_retryable: false,
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream { .. })
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Stream {
                is_retryable: true,
                ..
            }
        )
    }

    /// Message suitable for an error banner.
    pub fn user_message(&self) -> String {
        format!("Error: {self}")
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for SynthError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for SynthError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for SynthError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for SynthError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<minijinja::Error> for SynthError {
    fn from(err: minijinja::Error) -> Self {
        Self::Internal(format!("prompt template: {err}"))
    }
}

/// A type alias for `Result<T, SynthError>`.
pub type Result<T> = std::result::Result<T, SynthError>;
