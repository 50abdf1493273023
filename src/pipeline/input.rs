//! Input resolution: validate the source PDF before any backend sees it.
//!
//! A missing source is fatal and short-circuits the pipeline before any
//! rasterization attempt. A file that does not start with the `%PDF` magic is
//! only logged: rasterizers are the authority on what they can open, and the
//! placeholder branch still produces a thumbnail for anything unreadable.

use crate::error::ThumbnailError;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};

/// A validated source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub exists: bool,
    /// Modification time in whole seconds since the Unix epoch, if readable.
    pub modified_secs: Option<u64>,
}

impl SourceDocument {
    /// Inspect `path` without validating it.
    pub fn probe(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path).ok();
        let modified_secs = metadata
            .as_ref()
            .and_then(|m| m.modified().ok())
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs());
        Self {
            exists: metadata.map(|m| m.is_file()).unwrap_or(false),
            path,
            modified_secs,
        }
    }

    /// Probe `path` and require a readable regular file.
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self, ThumbnailError> {
        let doc = Self::probe(path);
        if !doc.exists {
            return Err(ThumbnailError::SourceNotFound { path: doc.path });
        }

        match std::fs::File::open(&doc.path) {
            Ok(mut f) => {
                let mut magic = [0u8; 4];
                if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                    warn!(
                        "{} does not start with %PDF (found {:?}); trying anyway",
                        doc.path.display(),
                        magic
                    );
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(ThumbnailError::PermissionDenied { path: doc.path });
            }
            Err(_) => {
                return Err(ThumbnailError::SourceNotFound { path: doc.path });
            }
        }

        debug!("Resolved source PDF: {}", doc.path.display());
        Ok(doc)
    }
}
