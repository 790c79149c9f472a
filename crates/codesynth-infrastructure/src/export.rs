//! Writes the synthesized script to disk.

use codesynth_core::error::Result;
use codesynth_core::review::ScriptArtifact;
use std::path::{Path, PathBuf};

/// Writes `artifact` into `dir` (created if needed) and returns the file path.
///
/// An existing file with the same name is overwritten.
pub async fn write_script(artifact: &ScriptArtifact, dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(&artifact.file_name);
    tokio::fs::write(&path, artifact.content.as_bytes()).await?;
    tracing::info!(path = %path.display(), bytes = artifact.content.len(), "Exported script");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_script_creates_directory() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out");
        let artifact = ScriptArtifact {
            file_name: "synthesized_script.py".to_string(),
            content: "print('done')\n".to_string(),
        };

        let path = write_script(&artifact, &target).await.unwrap();

        assert_eq!(path, target.join("synthesized_script.py"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "print('done')\n");
    }
}
