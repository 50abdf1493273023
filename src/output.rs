//! Result types returned by every `generate*` entry point.

use crate::error::{Degradation, ThumbnailError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which branch produced the thumbnail pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThumbnailSource {
    /// A real render of page 1 by the named rasterizer strategy.
    Rendered { rasterizer: String },
    /// The synthetic paper-page placeholder.
    Placeholder,
}

/// Outcome of one thumbnail invocation.
///
/// `success` is `true` exactly when a JPEG of `width × height` was written to
/// `output_path`. On failure `error` carries a human-readable message and no
/// other field describes an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailResult {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ThumbnailSource>,

    /// Non-fatal fallbacks taken along the way, in the order they happened.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degradations: Vec<Degradation>,

    #[serde(default)]
    pub width: u32,

    #[serde(default)]
    pub height: u32,
}

impl ThumbnailResult {
    pub fn succeeded(
        output_path: PathBuf,
        source: ThumbnailSource,
        degradations: Vec<Degradation>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            success: true,
            output_path: Some(output_path),
            error: None,
            source: Some(source),
            degradations,
            width,
            height,
        }
    }

    pub fn failed(error: &ThumbnailError) -> Self {
        Self {
            success: false,
            output_path: None,
            error: Some(error.to_string()),
            source: None,
            degradations: Vec::new(),
            width: 0,
            height: 0,
        }
    }

    /// `true` when the placeholder branch produced this thumbnail.
    pub fn is_placeholder(&self) -> bool {
        matches!(self.source, Some(ThumbnailSource::Placeholder))
    }
}
