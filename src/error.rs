//! Error types for the pdfthumb library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ThumbnailError`]: **Fatal**: no thumbnail file can be produced at all
//!   (missing source, unwritable output, encoder failure). The top-level
//!   `generate*` functions fold it into a
//!   [`crate::output::ThumbnailResult`] with `success: false`.
//!
//! * [`Degradation`]: **Non-fatal**: a stage fell back to a simpler strategy
//!   (margin crop, resize-and-pad, placeholder) but a valid thumbnail was
//!   still written. Recorded in [`crate::output::ThumbnailResult::degradations`]
//!   so callers can tell a real page render from a best-effort one.
//!
//! Stage-local errors ([`RasterError`], [`DetectError`], [`TextError`]) never
//! leave the pipeline; the orchestrator turns them into degradations.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdfthumb library.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Source PDF was not found at the given path.
    #[error("PDF file not found: {}", .path.display())]
    SourceNotFound { path: PathBuf },

    /// Process does not have read permission on the source file.
    #[error("Permission denied reading '{}'", .path.display())]
    PermissionDenied { path: PathBuf },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The output directory could not be created.
    #[error("Failed to create output directory '{}': {source}", .path.display())]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JPEG encoding of the final raster failed.
    #[error("Failed to encode thumbnail as JPEG: {0}")]
    EncodingFailed(#[from] image::ImageError),

    /// Could not write or rename the output file.
    #[error("Failed to write thumbnail '{}': {source}", .path.display())]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another job in the same batch already writes this output path.
    #[error("Output '{}' is already claimed by another job in this batch", .path.display())]
    DuplicateOutput { path: PathBuf },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Control ───────────────────────────────────────────────────────────
    /// The caller asked the pipeline to stop at a stage checkpoint.
    #[error("Thumbnail generation cancelled before stage '{stage}'")]
    Cancelled { stage: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal fallback taken while producing a thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// No rasterizer produced a frame; the placeholder was drawn instead.
    #[error("rasterization unavailable after {attempts} attempts: {last_error}")]
    RasterizationUnavailable { attempts: usize, last_error: String },

    /// Content analysis failed; a fixed margin crop was used.
    #[error("content detection degraded: {detail}")]
    ContentDetectionDegraded { detail: String },

    /// The page had no content pixels; a fixed margin crop was used.
    #[error("blank page, fixed margin crop used")]
    BlankPage,

    /// Scale-and-crop failed; the frame was resized and padded instead.
    #[error("composition degraded: {detail}")]
    CompositionDegraded { detail: String },

    /// Sharpening/contrast was skipped.
    #[error("enhancement skipped: {detail}")]
    EnhancementSkipped { detail: String },

    /// Page text could not be read; placeholder uses default text.
    #[error("text extraction failed: {detail}")]
    TextExtractionFailed { detail: String },
}

/// Why a single rasterizer attempt did not produce a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RasterError {
    /// The backend is not installed at this location.
    #[error("{0}")]
    Unavailable(String),

    /// The backend ran but failed on this document.
    #[error("{0}")]
    Failed(String),

    /// The backend ran but produced no page for page 1.
    #[error("document produced zero pages")]
    NoPages,
}

/// Why content analysis could not compute a bounding box.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectError {
    /// No pixel darker than the threshold exists.
    #[error("no content pixels found")]
    NoContent,

    /// The luminance buffer was inconsistent with the frame dimensions.
    #[error("content analysis failed: {0}")]
    Analysis(String),
}

/// Why page text could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextError {
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Failed(String),
}
