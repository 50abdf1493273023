//! Progress-callback trait for per-stage thumbnail events.
//!
//! Inject an [`Arc<dyn ThumbnailProgressCallback>`] via
//! [`crate::generate::ThumbnailGeneratorBuilder::progress_callback`] to
//! receive events as the pipeline moves through its stages, and to cancel a
//! run cooperatively.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a Tokio broadcast channel, an upload-status record, or a
//! terminal progress line without the library knowing how the host
//! application communicates. The trait is `Send + Sync` so one callback can
//! observe many concurrent invocations from [`crate::stream::thumbnail_stream`].
//!
//! # Cancellation
//!
//! [`ThumbnailProgressCallback::is_cancelled`] is polled before every stage.
//! Returning `true` stops the run and yields a result with `success: false`.
//! Nothing is written to the output path by a cancelled run.
//!
//! # Example
//!
//! ```rust
//! use pdfthumb::{Stage, ThumbnailGenerator, ThumbnailProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ThumbnailProgressCallback for CountingCallback {
//!     fn on_stage_complete(&self, stage: Stage) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{stage} done");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: AtomicUsize::new(0),
//! });
//!
//! let generator = ThumbnailGenerator::builder()
//!     .progress_callback(counter as Arc<dyn ThumbnailProgressCallback>)
//!     .build()
//!     .unwrap();
//! # let _ = generator;
//! ```

use crate::error::Degradation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Rasterize,
    DetectContent,
    Composite,
    Enhance,
    Placeholder,
    Encode,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Rasterize => "rasterize",
            Stage::DetectContent => "detect_content",
            Stage::Composite => "composite",
            Stage::Enhance => "enhance",
            Stage::Placeholder => "placeholder",
            Stage::Encode => "encode",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Called by the thumbnail pipeline as it runs each stage.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// One generator (and so one callback) may serve many concurrent invocations.
/// Implementations must protect shared mutable state with appropriate
/// synchronisation primitives (e.g. `Mutex`, `AtomicUsize`).
pub trait ThumbnailProgressCallback: Send + Sync {
    /// Called just before `stage` runs.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called after `stage` produced its output (possibly via a fallback).
    fn on_stage_complete(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called whenever a stage falls back to a simpler strategy.
    fn on_degraded(&self, stage: Stage, degradation: &Degradation) {
        let _ = (stage, degradation);
    }

    /// Polled before each stage; `true` stops the run.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ThumbnailProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in the generator.
pub type ProgressCallback = Arc<dyn ThumbnailProgressCallback>;
