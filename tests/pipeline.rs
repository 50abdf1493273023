//! Integration tests for the thumbnail pipeline.
//!
//! Rasterizers and text extractors are stubbed so these tests run without
//! pdfium or poppler installed. The source "PDF" only has to exist on disk;
//! its bytes are never parsed.
//!
//! Run with:
//!   cargo test --test pipeline -- --nocapture

use futures::StreamExt;
use image::{GenericImageView, Rgb, RgbImage};
use pdfthumb::pipeline::detect::locate_content;
use pdfthumb::pipeline::placeholder::derive_title;
use pdfthumb::{
    generate_thumbnail_async, jobs_into_dir, research_paper_filename, thumbnail_stream,
    Degradation, DetectorKind, PageRasterizer, Publisher, RasterError, RasterFrame, Stage,
    TextError, TextExtractor, ThumbnailConfig, ThumbnailGenerator, ThumbnailJob,
    ThumbnailProgressCallback, ThumbnailSource, Typeface,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Route pipeline logs to the test harness; `RUST_LOG=pdfthumb=debug` to see them.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Rasterizer that always returns a copy of one frame.
struct FixedFrame {
    frame: RasterFrame,
    calls: AtomicUsize,
}

impl FixedFrame {
    fn new(image: RgbImage) -> Arc<Self> {
        Arc::new(Self {
            frame: RasterFrame::new(image).expect("non-empty test frame"),
            calls: AtomicUsize::new(0),
        })
    }
}

impl PageRasterizer for FixedFrame {
    fn name(&self) -> String {
        "fixed".into()
    }

    fn rasterize(&self, _: &Path, _: u16, _: u32) -> Result<RasterFrame, RasterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.frame.clone())
    }
}

struct NotInstalled;

impl PageRasterizer for NotInstalled {
    fn name(&self) -> String {
        "not-installed".into()
    }

    fn rasterize(&self, _: &Path, _: u16, _: u32) -> Result<RasterFrame, RasterError> {
        Err(RasterError::Unavailable("library not found".into()))
    }
}

struct CannedText(String);

impl TextExtractor for CannedText {
    fn name(&self) -> String {
        "canned".into()
    }

    fn extract_text(&self, _: &Path, _: u16) -> Result<String, TextError> {
        Ok(self.0.clone())
    }
}

/// Letter page at 300 DPI-ish proportions with a centered black square.
fn page_with_square() -> RgbImage {
    let mut img = RgbImage::from_pixel(1000, 1000, Rgb([255, 255, 255]));
    for y in 400..600 {
        for x in 400..600 {
            img.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }
    img
}

fn rendering_generator(image: RgbImage) -> ThumbnailGenerator {
    init_logging();
    ThumbnailGenerator::builder()
        .rasterizers(vec![FixedFrame::new(image)])
        .text_extractors(Vec::new())
        .typeface(Typeface::Blocks)
        .build()
        .unwrap()
}

fn placeholder_generator(text: &str) -> ThumbnailGenerator {
    init_logging();
    ThumbnailGenerator::builder()
        .rasterizers(vec![Arc::new(NotInstalled)])
        .text_extractors(vec![Arc::new(CannedText(text.to_string()))])
        .typeface(Typeface::Blocks)
        .build()
        .unwrap()
}

/// A source file that exists; contents are irrelevant to stub backends.
fn fake_pdf(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("paper.pdf");
    std::fs::write(&path, b"%PDF-1.4\n%%EOF\n").unwrap();
    path
}

fn decoded_dimensions(path: &Path) -> (u32, u32) {
    image::open(path).expect("output is a decodable JPEG").dimensions()
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[test]
fn missing_source_reports_not_found_without_rasterizing() {
    let rasterizer = FixedFrame::new(page_with_square());
    let generator = ThumbnailGenerator::builder()
        .rasterizers(vec![rasterizer.clone()])
        .typeface(Typeface::Blocks)
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();

    let result = generator.generate(
        "/tmp/missing.pdf",
        dir.path().join("out.jpg"),
        &ThumbnailConfig::default(),
    );

    assert!(!result.success);
    assert!(result.error.unwrap().contains("not found"));
    assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn centered_square_is_cropped_tightly_and_sized_exactly() {
    let frame = RasterFrame::new(page_with_square()).unwrap();
    let (bbox, degradation) = locate_content(&frame, DetectorKind::Vectorized);
    assert!(degradation.is_none());
    assert_eq!(bbox.as_tuple(), (380, 380, 619, 619));

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("thumbs/square.jpg");
    let result = rendering_generator(page_with_square()).generate(
        fake_pdf(&dir),
        &out,
        &ThumbnailConfig::default(),
    );

    assert!(result.success, "{:?}", result.error);
    assert_eq!(
        result.source,
        Some(ThumbnailSource::Rendered {
            rasterizer: "fixed".into()
        })
    );
    assert!(result.degradations.is_empty());
    assert_eq!((result.width, result.height), (400, 250));
    assert_eq!(decoded_dimensions(&out), (400, 250));
}

#[test]
fn unavailable_rasterizer_falls_back_to_placeholder() {
    let text = "A Study of Legal AI. By J. Doe. This paper explores...";
    assert_eq!(derive_title(text), "A Study of Legal AI");

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("placeholder.jpg");
    let result = placeholder_generator(text).generate(
        fake_pdf(&dir),
        &out,
        &ThumbnailConfig::default(),
    );

    assert!(result.success, "{:?}", result.error);
    assert!(result.is_placeholder());
    assert!(matches!(
        result.degradations.first(),
        Some(Degradation::RasterizationUnavailable { attempts: 1, .. })
    ));
    assert_eq!(decoded_dimensions(&out), (400, 250));
}

#[test]
fn blank_page_uses_margin_crop() {
    let blank = RgbImage::from_pixel(850, 1100, Rgb([255, 255, 255]));
    let frame = RasterFrame::new(blank.clone()).unwrap();
    let (bbox, degradation) = locate_content(&frame, DetectorKind::Vectorized);
    assert_eq!(bbox.as_tuple(), (85, 110, 765, 990));
    assert_eq!(degradation, Some(Degradation::BlankPage));

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("blank.jpg");
    let result =
        rendering_generator(blank).generate(fake_pdf(&dir), &out, &ThumbnailConfig::default());

    assert!(result.success);
    assert_eq!(result.degradations, vec![Degradation::BlankPage]);
    assert!(!result.is_placeholder());
    assert_eq!(decoded_dimensions(&out), (400, 250));
}

#[test]
fn custom_size_is_honored_regardless_of_quality() {
    let config = ThumbnailConfig::builder()
        .width(800)
        .height(600)
        .quality(70)
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("big.jpg");
    let result = rendering_generator(page_with_square()).generate(fake_pdf(&dir), &out, &config);

    assert!(result.success);
    assert_eq!(decoded_dimensions(&out), (800, 600));
}

// ── Properties ───────────────────────────────────────────────────────────────

#[test]
fn quality_setting_does_not_change_output_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let source = fake_pdf(&dir);
    let generator = rendering_generator(page_with_square());

    let q70 = ThumbnailConfig::builder().quality(70).build().unwrap();
    let q85 = ThumbnailConfig::builder().quality(85).build().unwrap();
    let a = dir.path().join("q70.jpg");
    let b = dir.path().join("q85.jpg");
    assert!(generator.generate(&source, &a, &q70).success);
    assert!(generator.generate(&source, &b, &q85).success);

    assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
}

#[test]
fn repeated_runs_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let source = fake_pdf(&dir);
    let config = ThumbnailConfig::default();

    let rendered = rendering_generator(page_with_square());
    let placeholder = placeholder_generator(&"Contract Analytics at Scale. ".repeat(5));

    for (name, generator) in [("rendered", &rendered), ("placeholder", &placeholder)] {
        let a = dir.path().join(format!("{name}-1.jpg"));
        let b = dir.path().join(format!("{name}-2.jpg"));
        assert!(generator.generate(&source, &a, &config).success);
        assert!(generator.generate(&source, &b, &config).success);
        assert_eq!(
            std::fs::read(&a).unwrap(),
            std::fs::read(&b).unwrap(),
            "{name} output differs between runs"
        );
    }
}

#[test]
fn degenerate_frames_still_produce_exact_size() {
    let dir = tempfile::tempdir().unwrap();
    let source = fake_pdf(&dir);
    let config = ThumbnailConfig::default();

    let frames = [
        RgbImage::from_pixel(1, 1, Rgb([0, 0, 0])),
        RgbImage::from_pixel(1, 1, Rgb([255, 255, 255])),
        RgbImage::from_pixel(50, 30, Rgb([20, 20, 20])),
        RgbImage::from_pixel(3000, 5, Rgb([0, 0, 0])),
        RgbImage::from_pixel(10, 100, Rgb([0, 0, 0])),
    ];
    for (i, frame) in frames.into_iter().enumerate() {
        let out = dir.path().join(format!("degenerate-{i}.jpg"));
        let result = rendering_generator(frame).generate(&source, &out, &config);
        assert!(result.success, "frame {i}: {:?}", result.error);
        assert_eq!(decoded_dimensions(&out), (400, 250), "frame {i}");
    }
}

#[test]
fn empty_text_placeholder_is_valid() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("empty.jpg");
    let config = ThumbnailConfig::builder().width(300).height(420).build().unwrap();
    let result = placeholder_generator("").generate(fake_pdf(&dir), &out, &config);

    assert!(result.success);
    assert!(result.is_placeholder());
    assert_eq!(decoded_dimensions(&out), (300, 420));
}

#[test]
fn no_strategies_at_all_still_succeeds() {
    let generator = ThumbnailGenerator::builder()
        .rasterizers(Vec::new())
        .text_extractors(Vec::new())
        .typeface(Typeface::Blocks)
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("none.jpg");
    let result = generator.generate(fake_pdf(&dir), &out, &ThumbnailConfig::default());

    assert!(result.success);
    assert!(result.is_placeholder());
    assert!(result
        .degradations
        .iter()
        .any(|d| matches!(d, Degradation::TextExtractionFailed { .. })));
}

#[test]
fn unwritable_output_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();

    let result = rendering_generator(page_with_square()).generate(
        fake_pdf(&dir),
        blocker.join("thumb.jpg"),
        &ThumbnailConfig::default(),
    );
    assert!(!result.success);
    assert!(result.error.unwrap().contains("output directory"));
}

// ── Degradations ─────────────────────────────────────────────────────────────

#[test]
fn narrow_tall_frame_renders_without_a_huge_intermediate() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("sliver.jpg");
    let sliver = RgbImage::from_pixel(1, 6000, Rgb([30, 30, 30]));
    let result =
        rendering_generator(sliver).generate(fake_pdf(&dir), &out, &ThumbnailConfig::default());

    assert!(result.success, "{:?}", result.error);
    assert!(result.degradations.is_empty());
    assert_eq!(decoded_dimensions(&out), (400, 250));
}

#[test]
fn oversized_composition_is_recorded_and_padded() {
    let config = ThumbnailConfig::builder()
        .width(20_000)
        .height(10)
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("wide.jpg");
    let frame = RgbImage::from_pixel(1, 5000, Rgb([0, 0, 0]));
    let result = rendering_generator(frame).generate(fake_pdf(&dir), &out, &config);

    assert!(result.success, "{:?}", result.error);
    assert!(!result.is_placeholder());
    assert!(matches!(
        result.degradations.as_slice(),
        [Degradation::CompositionDegraded { .. }]
    ));
    assert_eq!(decoded_dimensions(&out), (20_000, 10));
}

/// Callback that panics when the given stage starts.
struct PanicsAt(Stage);

impl ThumbnailProgressCallback for PanicsAt {
    fn on_stage_start(&self, stage: Stage) {
        if stage == self.0 {
            panic!("callback failure at {stage}");
        }
    }
}

#[test]
fn panic_in_rendered_branch_pads_the_full_page() {
    init_logging();
    let generator = ThumbnailGenerator::builder()
        .rasterizers(vec![FixedFrame::new(page_with_square())])
        .text_extractors(Vec::new())
        .typeface(Typeface::Blocks)
        .progress_callback(Arc::new(PanicsAt(Stage::Composite)))
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("padded.jpg");
    let result = generator.generate(fake_pdf(&dir), &out, &ThumbnailConfig::default());

    assert!(result.success, "{:?}", result.error);
    assert_eq!(
        result.source,
        Some(ThumbnailSource::Rendered {
            rasterizer: "fixed".into()
        })
    );
    assert_eq!(
        result.degradations,
        vec![Degradation::CompositionDegraded {
            detail: "rendered branch panicked".into()
        }]
    );
    assert_eq!(decoded_dimensions(&out), (400, 250));
}

// ── Progress & cancellation ──────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    started: Mutex<Vec<Stage>>,
    degraded: Mutex<Vec<Stage>>,
    cancel_before: Mutex<Option<Stage>>,
    cancelled: AtomicBool,
}

impl ThumbnailProgressCallback for Recorder {
    fn on_stage_start(&self, stage: Stage) {
        self.started.lock().unwrap().push(stage);
        if *self.cancel_before.lock().unwrap() == Some(stage) {
            self.cancelled.store(true, Ordering::SeqCst);
        }
    }

    fn on_degraded(&self, stage: Stage, _degradation: &Degradation) {
        self.degraded.lock().unwrap().push(stage);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[test]
fn stages_are_reported_in_order() {
    let recorder = Arc::new(Recorder::default());
    let generator = ThumbnailGenerator::builder()
        .rasterizers(vec![FixedFrame::new(page_with_square())])
        .typeface(Typeface::Blocks)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let result = generator.generate(
        fake_pdf(&dir),
        dir.path().join("t.jpg"),
        &ThumbnailConfig::default(),
    );

    assert!(result.success);
    assert_eq!(
        *recorder.started.lock().unwrap(),
        vec![
            Stage::Rasterize,
            Stage::DetectContent,
            Stage::Composite,
            Stage::Enhance,
            Stage::Encode
        ]
    );
    assert!(recorder.degraded.lock().unwrap().is_empty());
}

#[test]
fn cancellation_stops_before_next_stage_and_writes_nothing() {
    let recorder = Arc::new(Recorder::default());
    *recorder.cancel_before.lock().unwrap() = Some(Stage::DetectContent);
    let generator = ThumbnailGenerator::builder()
        .rasterizers(vec![FixedFrame::new(page_with_square())])
        .typeface(Typeface::Blocks)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("cancelled.jpg");

    let result = generator.generate(fake_pdf(&dir), &out, &ThumbnailConfig::default());

    assert!(!result.success);
    assert!(result.error.unwrap().contains("cancelled"));
    assert!(!out.exists());
    assert_eq!(
        *recorder.started.lock().unwrap(),
        vec![Stage::Rasterize, Stage::DetectContent]
    );
}

// ── Async & batch ────────────────────────────────────────────────────────────

#[tokio::test]
async fn async_generation_matches_sync() {
    let dir = tempfile::tempdir().unwrap();
    let source = fake_pdf(&dir);
    let generator = Arc::new(rendering_generator(page_with_square()));

    let sync_out = dir.path().join("sync.jpg");
    let async_out = dir.path().join("async.jpg");
    assert!(generator
        .generate(&source, &sync_out, &ThumbnailConfig::default())
        .success);
    let result = generate_thumbnail_async(
        Arc::clone(&generator),
        source,
        async_out.clone(),
        ThumbnailConfig::default(),
    )
    .await;

    assert!(result.success);
    assert_eq!(
        std::fs::read(sync_out).unwrap(),
        std::fs::read(async_out).unwrap()
    );
}

#[tokio::test]
async fn batch_stream_yields_every_job() {
    let dir = tempfile::tempdir().unwrap();
    let source = fake_pdf(&dir);
    let out_dir = dir.path().join("out");

    let mut jobs: Vec<ThumbnailJob> = (0..6)
        .map(|i| ThumbnailJob::new(&source, out_dir.join(format!("{i}.jpg"))))
        .collect();
    jobs.push(ThumbnailJob::new(dir.path().join("missing.pdf"), out_dir.join("missing.jpg")));

    let generator = Arc::new(rendering_generator(page_with_square()));
    let results: Vec<_> = thumbnail_stream(jobs, generator, ThumbnailConfig::default(), 3)
        .collect()
        .await;

    assert_eq!(results.len(), 7);
    let failures: Vec<_> = results.iter().filter(|(_, r)| !r.success).collect();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].0.source.ends_with("missing.pdf"));
    for i in 0..6 {
        assert!(out_dir.join(format!("{i}.jpg")).exists());
    }
}

#[tokio::test]
async fn same_named_sources_in_one_batch_keep_separate_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let mut sources = Vec::new();
    for sub in ["a", "b"] {
        let path = dir.path().join(sub).join("paper.pdf");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"%PDF-1.4\n").unwrap();
        sources.push(path);
    }
    let out_dir = dir.path().join("out");
    let jobs = jobs_into_dir(sources, &out_dir);

    let generator = Arc::new(rendering_generator(page_with_square()));
    let results: Vec<_> = thumbnail_stream(jobs, generator, ThumbnailConfig::default(), 2)
        .collect()
        .await;

    assert!(results.iter().all(|(_, r)| r.success));
    let mut outputs: Vec<_> = results.iter().map(|(j, _)| j.output.clone()).collect();
    outputs.sort();
    assert_eq!(outputs, vec![out_dir.join("paper-2.jpg"), out_dir.join("paper.jpg")]);
    assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 2);
}

#[tokio::test]
async fn repeated_output_path_fails_instead_of_overwriting() {
    let dir = tempfile::tempdir().unwrap();
    let source = fake_pdf(&dir);
    let out = dir.path().join("shared.jpg");
    let jobs = vec![ThumbnailJob::new(&source, &out), ThumbnailJob::new(&source, &out)];

    let generator = Arc::new(rendering_generator(page_with_square()));
    let results: Vec<_> = thumbnail_stream(jobs, generator, ThumbnailConfig::default(), 2)
        .collect()
        .await;

    assert_eq!(results.iter().filter(|(_, r)| r.success).count(), 1);
    let failure = results.iter().find(|(_, r)| !r.success).unwrap();
    assert!(failure.1.error.as_deref().unwrap().contains("already claimed"));
}

// ── Publishing ───────────────────────────────────────────────────────────────

#[test]
fn publish_names_file_by_user_content_and_mtime() {
    let dir = tempfile::tempdir().unwrap();
    let source = fake_pdf(&dir);
    let mtime = std::fs::metadata(&source)
        .unwrap()
        .modified()
        .unwrap()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let publisher = Publisher::new(dir.path(), "http://localhost:5000");
    let published = publisher.publish(
        &placeholder_generator(""),
        &source,
        7,
        42,
        &ThumbnailConfig::default(),
    );

    let filename = research_paper_filename(7, 42, Some(mtime));
    let expected_url =
        format!("http://localhost:5000/uploads/thumbnails/research_papers/{filename}");
    assert!(published.success, "{:?}", published.error);
    assert_eq!(published.url.as_deref(), Some(expected_url.as_str()));
    assert!(dir
        .path()
        .join("uploads/thumbnails/research_papers")
        .join(&filename)
        .exists());
}

#[test]
fn publish_of_missing_source_fails_with_unknown_timestamp_name() {
    let dir = tempfile::tempdir().unwrap();
    let publisher = Publisher::new(dir.path(), "http://localhost:5000");
    let published = publisher.publish(
        &placeholder_generator(""),
        &dir.path().join("gone.pdf"),
        1,
        2,
        &ThumbnailConfig::default(),
    );

    assert!(!published.success);
    assert!(published.url.is_none());
    assert!(published.error.unwrap().contains("not found"));
    assert!(!dir
        .path()
        .join("uploads/thumbnails/research_papers/research_paper_1_2_unknown.jpg")
        .exists());
}
