//! Reads uploaded source files into [`Document`]s.

use codesynth_core::workspace::Document;
use std::path::{Path, PathBuf};

/// Turns file paths into documents, keeping only accepted extensions.
#[derive(Debug, Clone)]
pub struct FileIngestor {
    extensions: Vec<String>,
}

impl FileIngestor {
    /// `extensions` are matched case-insensitively; a leading dot is ignored.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { extensions }
    }

    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|accepted| *accepted == ext)
            })
            .unwrap_or(false)
    }

    /// Reads every accepted file in input order.
    ///
    /// Rejected extensions and unreadable files are skipped with a warning; the
    /// file name (not the full path) becomes the document name. Invalid UTF-8 is
    /// replaced rather than rejected.
    pub async fn ingest(&self, paths: &[PathBuf]) -> Vec<Document> {
        let mut documents = Vec::with_capacity(paths.len());

        for path in paths {
            if !self.accepts(path) {
                tracing::warn!(path = %path.display(), "Skipping file with unsupported extension");
                continue;
            }
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                tracing::warn!(path = %path.display(), "Skipping path without a file name");
                continue;
            };

            match tokio::fs::read(path).await {
                Ok(bytes) => {
                    let content = String::from_utf8_lossy(&bytes).into_owned();
                    tracing::debug!(%name, bytes = bytes.len(), "Ingested file");
                    documents.push(Document::new(name, content));
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                }
            }
        }

        documents
    }
}
