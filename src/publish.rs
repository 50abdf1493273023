//! Research-paper thumbnails with stable public names and URLs.
//!
//! Uploaded papers get their thumbnail at
//! `<root>/uploads/thumbnails/research_papers/research_paper_{user}_{content}_{mtime}.jpg`
//! and are served from the same relative path under `base_url`. The source
//! modification time is part of the name, so re-uploading a paper yields a
//! new URL and stale browser caches are never hit.

use crate::config::ThumbnailConfig;
use crate::generate::ThumbnailGenerator;
use crate::output::ThumbnailResult;
use crate::pipeline::input::SourceDocument;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Directory (relative to the publish root) and URL path of thumbnails.
pub const THUMBNAIL_SUBDIR: &str = "uploads/thumbnails/research_papers";

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// `research_paper_{user_id}_{content_id}_{mtime|unknown}.jpg`
pub fn research_paper_filename(user_id: u64, content_id: u64, mtime_secs: Option<u64>) -> String {
    let timestamp = mtime_secs
        .map(|t| t.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!("research_paper_{user_id}_{content_id}_{timestamp}.jpg")
}

/// Outcome of [`Publisher::publish`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedThumbnail {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Full pipeline result, including degradations.
    pub result: ThumbnailResult,
}

/// Where published thumbnails live on disk and on the web.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publisher {
    pub root: PathBuf,
    pub base_url: String,
}

impl Default for Publisher {
    /// Rooted at the current working directory, served from [`DEFAULT_BASE_URL`].
    fn default() -> Self {
        Self {
            root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Publisher {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    pub fn thumbnail_dir(&self) -> PathBuf {
        self.root.join(THUMBNAIL_SUBDIR)
    }

    pub fn url_for(&self, filename: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            THUMBNAIL_SUBDIR,
            filename
        )
    }

    /// Render `pdf_path` into the published location for this user/content.
    pub fn publish(
        &self,
        generator: &ThumbnailGenerator,
        pdf_path: &Path,
        user_id: u64,
        content_id: u64,
        config: &ThumbnailConfig,
    ) -> PublishedThumbnail {
        let source = SourceDocument::probe(pdf_path);
        let modified = if source.exists {
            source.modified_secs
        } else {
            None
        };
        let filename = research_paper_filename(user_id, content_id, modified);
        let output = self.thumbnail_dir().join(&filename);

        let result = generator.generate(pdf_path, &output, config);
        if result.success {
            let url = self.url_for(&filename);
            info!("Published research paper thumbnail: {url}");
            PublishedThumbnail {
                success: true,
                url: Some(url),
                error: None,
                result,
            }
        } else {
            PublishedThumbnail {
                success: false,
                url: None,
                error: result.error.clone(),
                result,
            }
        }
    }
}
