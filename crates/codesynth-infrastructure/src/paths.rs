//! Path management for codesynth configuration and state files.
//!
//! ```text
//! ~/.config/codesynth/      # Platform config directory (dirs::config_dir)
//! ├── config.toml           # Application configuration
//! ├── secret.json           # API keys
//! └── state.json            # Persisted session state (key/value)
//! ```

use codesynth_core::error::{Result, SynthError};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "codesynth";
const CONFIG_FILE: &str = "config.toml";
const SECRET_FILE: &str = "secret.json";
const STATE_FILE: &str = "state.json";

/// Resolves codesynth files under a base directory.
///
/// The base defaults to the platform config directory; tests pass a temp dir.
#[derive(Debug, Clone)]
pub struct SynthPaths {
    base: PathBuf,
}

impl SynthPaths {
    /// Uses `base` when given, otherwise `<config_dir>/codesynth`.
    ///
    /// # Errors
    ///
    /// Returns `Config` when no base is given and the platform has no config directory.
    pub fn new(base: Option<&Path>) -> Result<Self> {
        let base = match base {
            Some(path) => path.to_path_buf(),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or_else(|| SynthError::config("Cannot find config directory"))?,
        };
        Ok(Self { base })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join(CONFIG_FILE)
    }

    pub fn secret_file(&self) -> PathBuf {
        self.base.join(SECRET_FILE)
    }

    pub fn state_file(&self) -> PathBuf {
        self.base.join(STATE_FILE)
    }
}
