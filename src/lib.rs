//! # pdfthumb
//!
//! Turn the first page of a PDF into a fixed-size JPEG preview for a
//! document gallery.
//!
//! ## Why this crate?
//!
//! Uploaded PDFs are an unreliable input and the rasterizer is an optional
//! host capability. This crate walks an ordered list of rasterizer
//! installations, crops the rendered page to its content, and always produces
//! a correctly sized preview. When nothing can render the page, it draws a
//! synthetic "paper" thumbnail from the page text instead, so every upload
//! gets a thumbnail.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      validate source path, capture mtime
//!  ├─ 2. Render     first working rasterizer (pdfium / poppler) → page 1 @ 300 DPI
//!  ├─ 3. Detect     content box (luminance < 250) + 2% padding
//!  ├─ 4. Composite  scale to width, crop from top with a slight left bias
//!  ├─ 5. Enhance    unsharp mask + 10% contrast
//!  │      └─ no rasterizer? ─▶ Placeholder from page text
//!  └─ 6. Encode     JPEG (quality 95), atomic write
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfthumb::{ThumbnailConfig, ThumbnailGenerator};
//!
//! let generator = ThumbnailGenerator::new();
//! let result = generator.generate("paper.pdf", "thumbs/paper.jpg", &ThumbnailConfig::default());
//! assert!(result.success, "{:?}", result.error);
//! println!("{:?} via {:?}", result.output_path, result.source);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfthumb` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdfthumb = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod error;
pub mod frame;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod publish;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{PageRasterizer, TextExtractor};
pub use config::{
    Backend, DetectorKind, FontConfig, Location, PipelineConfig, PipelineConfigBuilder,
    RasterizerConfig, ThumbnailConfig, ThumbnailConfigBuilder, ENCODE_QUALITY,
};
pub use error::{Degradation, DetectError, RasterError, TextError, ThumbnailError};
pub use frame::{ContentBoundingBox, RasterFrame};
pub use generate::{
    default_generator, generate_thumbnail, generate_thumbnail_async, ThumbnailGenerator,
    ThumbnailGeneratorBuilder,
};
pub use output::{ThumbnailResult, ThumbnailSource};
pub use pipeline::input::SourceDocument;
pub use pipeline::placeholder::Typeface;
pub use pipeline::render::{RasterAttempt, RasterOutcome, RasterStrategyResolver};
pub use progress::{NoopProgressCallback, ProgressCallback, Stage, ThumbnailProgressCallback};
pub use publish::{research_paper_filename, PublishedThumbnail, Publisher};
pub use stream::{discover_pdfs, jobs_into_dir, thumbnail_stream, ThumbnailJob, ThumbnailStream};
