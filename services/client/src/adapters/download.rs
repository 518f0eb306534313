//! services/client/src/adapters/download.rs
//!
//! Saves binary API responses into the configured download directory.

use price_analysis_core::domain::Download;
use std::path::{Path, PathBuf};
use tracing::info;

const FALLBACK_NAME: &str = "download.xlsx";

#[derive(Clone, Debug)]
pub struct DownloadDir {
    root: PathBuf,
}

impl DownloadDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the download under its sanitized name, replacing any previous file.
    pub async fn save(&self, download: &Download) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(sanitize_file_name(&download.file_name));
        tokio::fs::write(&path, &download.bytes).await?;
        info!(path = %path.display(), bytes = download.bytes.len(), "Saved download");
        Ok(path)
    }
}

/// Replaces path separators and other characters most filesystems reject.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned
    }
}
