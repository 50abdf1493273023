//! Thumbnail generation entry points.
//!
//! ```text
//! Start ─▶ Rasterize ─┬─ frame ──▶ DetectContent ─▶ Composite ─▶ Enhance ─┬─▶ Encode ─▶ Done
//!                     └─ none ───▶ Placeholder ───────────────────────────┘
//! ```
//!
//! ## Why a result value instead of `Result`?
//!
//! Callers (upload handlers, batch jobs) want one uniform record per document
//! whatever happened. Fatal errors ([`ThumbnailError`]) are folded into a
//! [`ThumbnailResult`] with `success: false`; non-fatal fallbacks are listed in
//! `degradations`. Once a frame has been rendered every later failure degrades
//! inside the rendered branch; the placeholder is only for "no frame at all".
//!
//! ## Why spawn_blocking for the async API?
//!
//! Rendering at 300 DPI and Lanczos resampling are CPU-bound and pdfium is
//! not async-safe. [`generate_thumbnail_async`] moves the whole pipeline onto
//! tokio's blocking pool so executor threads never stall.

use crate::backend::{self, PageRasterizer, TextExtractor};
use crate::config::{DetectorKind, PipelineConfig, ThumbnailConfig};
use crate::error::{Degradation, ThumbnailError};
use crate::frame::RasterFrame;
use crate::output::{ThumbnailResult, ThumbnailSource};
use crate::pipeline::encode::{encode_jpeg, ensure_parent_dir, write_atomic};
use crate::pipeline::input::SourceDocument;
use crate::pipeline::placeholder::{self, Typeface};
use crate::pipeline::render::{RasterOutcome, RasterStrategyResolver};
use crate::pipeline::{composite, detect, enhance, text};
use crate::progress::{NoopProgressCallback, ProgressCallback, Stage};
use image::RgbImage;
use once_cell::sync::Lazy;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Shared generator used by [`generate_thumbnail`]; rasterizer locations come
/// from the environment (see [`crate::config::RasterizerConfig::from_env`]).
static DEFAULT_GENERATOR: Lazy<Arc<ThumbnailGenerator>> = Lazy::new(|| {
    let config = PipelineConfig {
        rasterizer: crate::config::RasterizerConfig::from_env(),
        ..PipelineConfig::default()
    };
    Arc::new(
        ThumbnailGenerator::from_config(config).unwrap_or_else(|_| ThumbnailGenerator::new()),
    )
});

/// The process-wide default generator.
pub fn default_generator() -> Arc<ThumbnailGenerator> {
    Arc::clone(&DEFAULT_GENERATOR)
}

/// Generate a thumbnail with the default generator.
///
/// # Example
/// ```rust,no_run
/// use pdfthumb::{generate_thumbnail, ThumbnailConfig};
///
/// let result = generate_thumbnail("paper.pdf", "thumbs/paper.jpg", &ThumbnailConfig::default());
/// if !result.success {
///     eprintln!("{}", result.error.unwrap_or_default());
/// }
/// ```
pub fn generate_thumbnail(
    source: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &ThumbnailConfig,
) -> ThumbnailResult {
    DEFAULT_GENERATOR.generate(source, output, config)
}

/// Run [`ThumbnailGenerator::generate`] on tokio's blocking pool.
pub async fn generate_thumbnail_async(
    generator: Arc<ThumbnailGenerator>,
    source: impl Into<PathBuf>,
    output: impl Into<PathBuf>,
    config: ThumbnailConfig,
) -> ThumbnailResult {
    let source = source.into();
    let output = output.into();
    tokio::task::spawn_blocking(move || generator.generate(&source, &output, &config))
        .await
        .unwrap_or_else(|e| {
            ThumbnailResult::failed(&ThumbnailError::Internal(format!(
                "Thumbnail task panicked: {e}"
            )))
        })
}

/// A configured thumbnail pipeline.
///
/// Holds no per-invocation state: one generator can serve any number of
/// concurrent [`generate`](Self::generate) calls.
pub struct ThumbnailGenerator {
    resolver: RasterStrategyResolver,
    text_extractors: Vec<Arc<dyn TextExtractor>>,
    detector: DetectorKind,
    typeface: Typeface,
    text_char_limit: usize,
    progress: ProgressCallback,
}

impl fmt::Debug for ThumbnailGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThumbnailGenerator")
            .field("resolver", &self.resolver)
            .field(
                "text_extractors",
                &self
                    .text_extractors
                    .iter()
                    .map(|t| t.name())
                    .collect::<Vec<_>>(),
            )
            .field("detector", &self.detector)
            .field("typeface", &self.typeface)
            .field("text_char_limit", &self.text_char_limit)
            .finish()
    }
}

impl Default for ThumbnailGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ThumbnailGenerator {
    /// Generator with [`PipelineConfig::default()`].
    pub fn new() -> Self {
        Self::assemble(PipelineConfig::default(), None, None, None, None)
    }

    /// Generator for a specific pipeline configuration.
    pub fn from_config(config: PipelineConfig) -> Result<Self, ThumbnailError> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> ThumbnailGeneratorBuilder {
        ThumbnailGeneratorBuilder::default()
    }

    fn assemble(
        config: PipelineConfig,
        rasterizers: Option<Vec<Arc<dyn PageRasterizer>>>,
        text_extractors: Option<Vec<Arc<dyn TextExtractor>>>,
        typeface: Option<Typeface>,
        progress: Option<ProgressCallback>,
    ) -> Self {
        let resolver = match rasterizers {
            Some(strategies) => {
                RasterStrategyResolver::with_strategies(strategies, config.rasterizer.dpi)
            }
            None => RasterStrategyResolver::from_config(&config.rasterizer),
        };
        let text_extractors = text_extractors
            .unwrap_or_else(|| backend::text_extractors_from_config(&config.rasterizer));
        let typeface = typeface.unwrap_or_else(|| Typeface::load(&config.fonts));

        Self {
            resolver,
            text_extractors,
            detector: config.detector,
            typeface,
            text_char_limit: config.text_char_limit,
            progress: progress.unwrap_or_else(|| Arc::new(NoopProgressCallback)),
        }
    }

    pub fn resolver(&self) -> &RasterStrategyResolver {
        &self.resolver
    }

    /// Produce a `config.width × config.height` JPEG of page 1 of `source`.
    ///
    /// Never panics and never returns an error: see [`ThumbnailResult`].
    pub fn generate(
        &self,
        source: impl AsRef<Path>,
        output: impl AsRef<Path>,
        config: &ThumbnailConfig,
    ) -> ThumbnailResult {
        let source = source.as_ref();
        let output = output.as_ref();
        let started = Instant::now();
        info!("Generating thumbnail: {} → {}", source.display(), output.display());

        let outcome = catch_unwind(AssertUnwindSafe(|| self.try_generate(source, output, config)))
            .unwrap_or_else(|_| {
                Err(ThumbnailError::Internal(
                    "thumbnail pipeline panicked".to_string(),
                ))
            });

        match outcome {
            Ok(result) => {
                info!(
                    "Thumbnail written to {} in {}ms ({} degradation(s))",
                    output.display(),
                    started.elapsed().as_millis(),
                    result.degradations.len()
                );
                result
            }
            Err(e) => {
                error!("Thumbnail generation failed for {}: {}", source.display(), e);
                ThumbnailResult::failed(&e)
            }
        }
    }

    fn try_generate(
        &self,
        source: &Path,
        output: &Path,
        config: &ThumbnailConfig,
    ) -> Result<ThumbnailResult, ThumbnailError> {
        config.validate()?;
        let doc = SourceDocument::resolve(source)?;
        ensure_parent_dir(output)?;

        let mut degradations = Vec::new();

        // ── Rasterize ────────────────────────────────────────────────────────
        self.checkpoint(Stage::Rasterize)?;
        let outcome = self.resolver.resolve(&doc.path);
        self.progress.on_stage_complete(Stage::Rasterize);

        let (image, thumbnail_source) = match outcome {
            RasterOutcome::Rendered { frame, strategy } => (
                self.guarded_render_branch(&frame, config, &mut degradations)?,
                ThumbnailSource::Rendered {
                    rasterizer: strategy,
                },
            ),
            RasterOutcome::Unavailable { attempts } => {
                for attempt in &attempts {
                    debug!("  {}: {}", attempt.strategy, attempt.error);
                }
                self.degrade(
                    Stage::Rasterize,
                    RasterOutcome::unavailable_degradation(&attempts),
                    &mut degradations,
                );
                (
                    self.placeholder_branch(&doc.path, config, &mut degradations)?,
                    ThumbnailSource::Placeholder,
                )
            }
        };

        // ── Encode ───────────────────────────────────────────────────────────
        self.checkpoint(Stage::Encode)?;
        let bytes = encode_jpeg(&image)?;
        write_atomic(output, &bytes)?;
        self.progress.on_stage_complete(Stage::Encode);

        Ok(ThumbnailResult::succeeded(
            output.to_path_buf(),
            thumbnail_source,
            degradations,
            image.width(),
            image.height(),
        ))
    }

    /// [`Self::render_branch`], with a panic degrading to resize-and-pad of
    /// the whole frame.
    fn guarded_render_branch(
        &self,
        frame: &RasterFrame,
        config: &ThumbnailConfig,
        degradations: &mut Vec<Degradation>,
    ) -> Result<RgbImage, ThumbnailError> {
        let rendered = catch_unwind(AssertUnwindSafe(|| {
            self.render_branch(frame, config, degradations)
        }));
        match rendered {
            Ok(result) => result,
            Err(_) => {
                warn!("Rendered branch panicked; resizing and padding the full page");
                self.degrade(
                    Stage::Composite,
                    Degradation::CompositionDegraded {
                        detail: "rendered branch panicked".into(),
                    },
                    degradations,
                );
                Ok(composite::resize_and_pad(frame, config.width, config.height))
            }
        }
    }

    fn render_branch(
        &self,
        frame: &RasterFrame,
        config: &ThumbnailConfig,
        degradations: &mut Vec<Degradation>,
    ) -> Result<RgbImage, ThumbnailError> {
        self.checkpoint(Stage::DetectContent)?;
        let (bbox, degradation) = detect::locate_content(frame, self.detector);
        if let Some(d) = degradation {
            self.degrade(Stage::DetectContent, d, degradations);
        }
        let content = frame.crop(&bbox);
        self.progress.on_stage_complete(Stage::DetectContent);

        self.checkpoint(Stage::Composite)?;
        let (composed, degradation) = composite::compose(&content, config);
        if let Some(d) = degradation {
            self.degrade(Stage::Composite, d, degradations);
        }
        self.progress.on_stage_complete(Stage::Composite);

        self.checkpoint(Stage::Enhance)?;
        let (enhanced, degradation) = enhance::enhance_or_passthrough(composed);
        if let Some(d) = degradation {
            self.degrade(Stage::Enhance, d, degradations);
        }
        self.progress.on_stage_complete(Stage::Enhance);

        Ok(enhanced)
    }

    fn placeholder_branch(
        &self,
        pdf_path: &Path,
        config: &ThumbnailConfig,
        degradations: &mut Vec<Degradation>,
    ) -> Result<RgbImage, ThumbnailError> {
        self.checkpoint(Stage::Placeholder)?;
        let (page_text, degradation) =
            text::extract_page_text(&self.text_extractors, pdf_path, self.text_char_limit);
        if let Some(d) = degradation {
            self.degrade(Stage::Placeholder, d, degradations);
        }
        let image = placeholder::synthesize(&page_text, config, &self.typeface);
        info!("Created placeholder thumbnail for {}", pdf_path.display());
        self.progress.on_stage_complete(Stage::Placeholder);
        Ok(image)
    }

    fn checkpoint(&self, stage: Stage) -> Result<(), ThumbnailError> {
        if self.progress.is_cancelled() {
            warn!("Cancelled before stage {stage}");
            return Err(ThumbnailError::Cancelled {
                stage: stage.to_string(),
            });
        }
        self.progress.on_stage_start(stage);
        Ok(())
    }

    fn degrade(&self, stage: Stage, degradation: Degradation, degradations: &mut Vec<Degradation>) {
        self.progress.on_degraded(stage, &degradation);
        degradations.push(degradation);
    }
}

/// Builder for [`ThumbnailGenerator`].
///
/// Rasterizers, text extractors and the typeface default to what
/// [`PipelineConfig`] describes; each can be replaced, e.g. with stubs in
/// tests.
#[derive(Default)]
pub struct ThumbnailGeneratorBuilder {
    config: PipelineConfig,
    rasterizers: Option<Vec<Arc<dyn PageRasterizer>>>,
    text_extractors: Option<Vec<Arc<dyn TextExtractor>>>,
    typeface: Option<Typeface>,
    progress: Option<ProgressCallback>,
}

impl ThumbnailGeneratorBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use exactly these rasterization strategies, in order.
    pub fn rasterizers(mut self, rasterizers: Vec<Arc<dyn PageRasterizer>>) -> Self {
        self.rasterizers = Some(rasterizers);
        self
    }

    /// Use exactly these text extractors, in order.
    pub fn text_extractors(mut self, extractors: Vec<Arc<dyn TextExtractor>>) -> Self {
        self.text_extractors = Some(extractors);
        self
    }

    pub fn typeface(mut self, typeface: Typeface) -> Self {
        self.typeface = Some(typeface);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.progress = Some(cb);
        self
    }

    /// Validate the pipeline configuration and assemble the generator.
    pub fn build(self) -> Result<ThumbnailGenerator, ThumbnailError> {
        self.config.validate()?;
        Ok(ThumbnailGenerator::assemble(
            self.config,
            self.rasterizers,
            self.text_extractors,
            self.typeface,
            self.progress,
        ))
    }
}
