//! CLI binary for pdfthumb.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ThumbnailConfig` / `PipelineConfig` and prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::StreamExt;
use pdfthumb::{
    discover_pdfs, jobs_into_dir, thumbnail_stream, Backend, DetectorKind, FontConfig,
    PipelineConfig, Publisher, RasterizerConfig, ThumbnailConfig, ThumbnailGenerator,
    ThumbnailResult, ThumbnailSource,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One thumbnail (400x250 by default)
  pdfthumb paper.pdf -o paper.jpg

  # Larger preview, poppler only
  pdfthumb paper.pdf -o paper.jpg --width 800 --height 500 --backend poppler

  # Use a bundled rasterizer installation
  pdfthumb paper.pdf -o paper.jpg --rasterizer-path ./vendor/poppler/bin

  # Publish under the research-paper naming scheme
  pdfthumb paper.pdf --publish --user-id 7 --content-id 42 --root /srv/app

  # Every PDF in a directory, 8 at a time, JSON lines on stdout
  pdfthumb --batch uploads/ --out-dir thumbs/ --jobs 8 --json

ENVIRONMENT VARIABLES:
  PDFTHUMB_RASTERIZER_PATH  Explicit rasterizer installation (tried first)
  PDFIUM_LIB_PATH           Extra pdfium library directory
  POPPLER_PATH              Extra poppler bin directory
  RUST_LOG                  Override log filter (e.g. pdfthumb=debug)

When no rasterizer is installed the thumbnail is a synthetic paper page drawn
from the PDF text; the command still succeeds.
"#;

/// Generate fixed-size JPEG thumbnails from the first page of PDF files.
#[derive(Parser, Debug)]
#[command(
    name = "pdfthumb",
    version,
    about = "Generate fixed-size JPEG thumbnails from the first page of PDF files",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source PDF (single-file mode).
    #[arg(required_unless_present = "batch")]
    input: Option<PathBuf>,

    /// Output JPEG path (single-file mode).
    #[arg(short, long, required_unless_present_any = ["batch", "publish"])]
    output: Option<PathBuf>,

    /// Thumbnail width in pixels.
    #[arg(long, env = "PDFTHUMB_WIDTH", default_value_t = 400,
          value_parser = clap::value_parser!(u32).range(1..))]
    width: u32,

    /// Thumbnail height in pixels.
    #[arg(long, env = "PDFTHUMB_HEIGHT", default_value_t = 250,
          value_parser = clap::value_parser!(u32).range(1..))]
    height: u32,

    /// Requested JPEG quality (1–100). Reported only; output is always quality 95.
    #[arg(long, env = "PDFTHUMB_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Rendering DPI (72–600).
    #[arg(long, env = "PDFTHUMB_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Content detector implementation.
    #[arg(long, value_enum, default_value = "vectorized")]
    detector: DetectorArg,

    /// Explicit rasterizer installation directory, tried before all others.
    #[arg(long, env = "PDFTHUMB_RASTERIZER_PATH")]
    rasterizer_path: Option<PathBuf>,

    /// Additional installation directory to probe (repeatable). Replaces the built-in list.
    #[arg(long = "candidate-path")]
    candidate_paths: Vec<PathBuf>,

    /// Do not fall back to the system library path / PATH.
    #[arg(long)]
    no_system_rasterizer: bool,

    /// Rasterizer backend, in order of preference (repeatable).
    #[arg(long = "backend", value_enum)]
    backends: Vec<BackendArg>,

    /// Font file for placeholder text (repeatable). Replaces the built-in list.
    #[arg(long = "font")]
    fonts: Vec<PathBuf>,

    /// Print results as JSON instead of a summary line.
    #[arg(long)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFTHUMB_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFTHUMB_QUIET")]
    quiet: bool,

    /// Write to the research-paper location instead of --output.
    #[arg(long, requires_all = ["user_id", "content_id"], conflicts_with = "batch")]
    publish: bool,

    /// Uploader id used in the published file name.
    #[arg(long)]
    user_id: Option<u64>,

    /// Content id used in the published file name.
    #[arg(long)]
    content_id: Option<u64>,

    /// Root directory under which `uploads/thumbnails/research_papers` lives.
    #[arg(long, env = "PDFTHUMB_PUBLISH_ROOT")]
    root: Option<PathBuf>,

    /// Base URL for published thumbnails.
    #[arg(long, env = "PDFTHUMB_BASE_URL", default_value = pdfthumb::publish::DEFAULT_BASE_URL)]
    base_url: String,

    /// Batch mode: PDF files or directories of PDFs.
    #[arg(long, num_args = 1.., requires = "out_dir")]
    batch: Vec<PathBuf>,

    /// Output directory for batch mode (`<stem>.jpg` per input).
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Concurrent thumbnails in batch mode.
    #[arg(short, long, env = "PDFTHUMB_JOBS", default_value_t = 4)]
    jobs: usize,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum DetectorArg {
    Vectorized,
    Naive,
}

impl From<DetectorArg> for DetectorKind {
    fn from(v: DetectorArg) -> Self {
        match v {
            DetectorArg::Vectorized => DetectorKind::Vectorized,
            DetectorArg::Naive => DetectorKind::Naive,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Pdfium,
    Poppler,
}

impl From<BackendArg> for Backend {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Pdfium => Backend::Pdfium,
            BackendArg::Poppler => Backend::Poppler,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build configs ────────────────────────────────────────────────────
    let thumb_config = ThumbnailConfig::builder()
        .width(cli.width)
        .height(cli.height)
        .quality(cli.quality)
        .build()
        .context("Invalid thumbnail size or quality")?;

    let generator = Arc::new(
        ThumbnailGenerator::from_config(build_pipeline_config(&cli)?)
            .context("Invalid pipeline configuration")?,
    );

    // ── Dispatch ─────────────────────────────────────────────────────────
    let all_ok = if !cli.batch.is_empty() {
        run_batch(&cli, generator, thumb_config).await?
    } else if cli.publish {
        run_publish(&cli, generator, thumb_config).await?
    } else {
        run_single(&cli, generator, thumb_config).await?
    };

    if !all_ok {
        std::process::exit(1);
    }
    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_pipeline_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .dpi(cli.dpi)
        .detector(cli.detector.into())
        .use_system_default(!cli.no_system_rasterizer);

    let local = cli
        .rasterizer_path
        .clone()
        .or_else(|| RasterizerConfig::from_env().local_installation);
    if let Some(path) = local {
        builder = builder.local_installation(path);
    }
    if !cli.candidate_paths.is_empty() {
        builder = builder.candidate_paths(cli.candidate_paths.clone());
    }
    if !cli.backends.is_empty() {
        builder = builder.backends(cli.backends.iter().map(|b| (*b).into()).collect());
    }
    if !cli.fonts.is_empty() {
        builder = builder.fonts(FontConfig {
            candidates: cli.fonts.clone(),
        });
    }

    builder.build().context("Invalid pipeline configuration")
}

async fn run_single(
    cli: &Cli,
    generator: Arc<ThumbnailGenerator>,
    config: ThumbnailConfig,
) -> Result<bool> {
    let (Some(input), Some(output)) = (cli.input.clone(), cli.output.clone()) else {
        bail!("INPUT and --output are required");
    };
    let started = Instant::now();
    let result = pdfthumb::generate_thumbnail_async(generator, input.clone(), output, config).await;
    report(cli, &input, &result, started)?;
    Ok(result.success)
}

async fn run_publish(
    cli: &Cli,
    generator: Arc<ThumbnailGenerator>,
    config: ThumbnailConfig,
) -> Result<bool> {
    let (Some(input), Some(user_id), Some(content_id)) =
        (cli.input.clone(), cli.user_id, cli.content_id)
    else {
        bail!("--publish needs INPUT, --user-id and --content-id");
    };
    let publisher = match cli.root {
        Some(ref root) => Publisher::new(root, cli.base_url.clone()),
        None => Publisher {
            base_url: cli.base_url.clone(),
            ..Publisher::default()
        },
    };

    let published = tokio::task::spawn_blocking(move || {
        publisher.publish(&generator, &input, user_id, content_id, &config)
    })
    .await
    .context("Publish task panicked")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&published).context("Failed to serialise result")?
        );
    } else if published.success {
        if !cli.quiet {
            println!("{}", published.url.as_deref().unwrap_or_default());
        }
    } else {
        eprintln!(
            "{} {}",
            red("✘"),
            published.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(published.success)
}

async fn run_batch(
    cli: &Cli,
    generator: Arc<ThumbnailGenerator>,
    config: ThumbnailConfig,
) -> Result<bool> {
    let Some(ref out_dir) = cli.out_dir else {
        bail!("--batch requires --out-dir");
    };

    let mut sources = Vec::new();
    for path in &cli.batch {
        let pdfs = discover_pdfs(path)
            .with_context(|| format!("Failed to list PDFs in {}", path.display()))?;
        sources.extend(pdfs);
    }
    let jobs = jobs_into_dir(sources, out_dir);
    if jobs.is_empty() {
        bail!("No PDF files found");
    }

    let total = jobs.len();
    let started = Instant::now();
    let mut failed = 0usize;
    let mut results = thumbnail_stream(jobs, generator, config, cli.jobs);
    while let Some((job, result)) = results.next().await {
        if !result.success {
            failed += 1;
        }
        if cli.json {
            let line = serde_json::json!({ "job": job, "result": result });
            println!("{line}");
        } else {
            report(cli, &job.source, &result, started)?;
        }
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "{} {}/{} thumbnails  {}ms",
            if failed == 0 { green("✔") } else { cyan("⚠") },
            total - failed,
            total,
            started.elapsed().as_millis()
        );
    }
    Ok(failed == 0)
}

fn report(
    cli: &Cli,
    input: &std::path::Path,
    result: &ThumbnailResult,
    started: Instant,
) -> Result<()> {
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(result).context("Failed to serialise result")?
        );
        return Ok(());
    }
    if result.success {
        if cli.quiet {
            return Ok(());
        }
        let via = match &result.source {
            Some(ThumbnailSource::Rendered { rasterizer }) => rasterizer.clone(),
            Some(ThumbnailSource::Placeholder) => "placeholder".to_string(),
            None => String::new(),
        };
        let path = result
            .output_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        eprintln!(
            "{} {}  →  {}  {}",
            green("✔"),
            input.display(),
            path,
            dim(&format!("{}  {}ms", via, started.elapsed().as_millis())),
        );
        for degradation in &result.degradations {
            eprintln!("   {} {}", cyan("⚠"), degradation);
        }
    } else {
        eprintln!(
            "{} {}  {}",
            red("✘"),
            input.display(),
            red(result.error.as_deref().unwrap_or("unknown error"))
        );
    }
    Ok(())
}
