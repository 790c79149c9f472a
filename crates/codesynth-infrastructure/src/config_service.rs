//! Loads `config.toml` and `secret.json`.

use crate::paths::SynthPaths;
use codesynth_core::config::{GeminiSecret, SecretConfig, SynthConfig};
use codesynth_core::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variables consulted for the Gemini key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Reads configuration and secrets from disk.
///
/// # Example
///
/// ```ignore
/// let service = ConfigService::new(&SynthPaths::new(None)?);
/// let config = service.load_config()?;
/// let secrets = service.load_secrets()?;
/// let key = secrets.require_gemini_key()?;
/// ```
#[derive(Debug, Clone)]
pub struct ConfigService {
    config_path: PathBuf,
    secret_path: PathBuf,
}

impl ConfigService {
    pub fn new(paths: &SynthPaths) -> Self {
        Self::with_paths(paths.config_file(), paths.secret_file())
    }

    pub fn with_paths(config_path: impl Into<PathBuf>, secret_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            secret_path: secret_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Loads `SynthConfig`.
    ///
    /// A missing or empty file yields the defaults; a malformed one is a
    /// `Serialization` error.
    pub fn load_config(&self) -> Result<SynthConfig> {
        let Some(content) = read_if_present(&self.config_path)? else {
            tracing::debug!(path = %self.config_path.display(), "No config file, using defaults");
            return Ok(SynthConfig::default());
        };
        let config: SynthConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads secrets, completing a missing key from the process environment.
    pub fn load_secrets(&self) -> Result<SecretConfig> {
        self.load_secrets_with(|name| std::env::var(name).ok())
    }

    /// Loads secrets using `lookup` for environment variables.
    ///
    /// A non-blank key in `secret.json` wins; otherwise the first non-blank
    /// variable from [`API_KEY_ENV_VARS`] is used.
    pub fn load_secrets_with<F>(&self, lookup: F) -> Result<SecretConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut secrets = match read_if_present(&self.secret_path)? {
            Some(content) => serde_json::from_str::<SecretConfig>(&content)?,
            None => SecretConfig::default(),
        };

        if secrets.require_gemini_key().is_err() {
            let from_env = API_KEY_ENV_VARS
                .iter()
                .filter_map(|name| lookup(*name))
                .find(|value| !value.trim().is_empty());
            if let Some(api_key) = from_env {
                tracing::debug!("Using Gemini API key from environment");
                secrets.gemini = Some(GeminiSecret { api_key });
            }
        }

        Ok(secrets)
    }
}

fn read_if_present(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(content))
}
