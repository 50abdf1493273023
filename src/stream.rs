//! Batch API: thumbnail many documents concurrently, emitting results as
//! they complete.
//!
//! ## Why stream?
//!
//! A gallery import can hold hundreds of uploads. A stream lets callers
//! record each result (or update a progress line) the moment it is ready
//! instead of waiting for the slowest document. Results arrive in completion
//! order; each item carries its [`ThumbnailJob`] so callers can match them up.

use crate::config::ThumbnailConfig;
use crate::error::ThumbnailError;
use crate::generate::{generate_thumbnail_async, ThumbnailGenerator};
use crate::output::ThumbnailResult;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::{info, warn};

/// One source → output pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailJob {
    pub source: PathBuf,
    pub output: PathBuf,
}

impl ThumbnailJob {
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
        }
    }
}

/// One job per source, each writing `<out_dir>/<stem>.jpg`.
///
/// Sources whose names collide (`a/paper.pdf` and `b/paper.pdf`, or
/// `x.pdf` and `x.PDF`) get `-2`, `-3`, ... suffixes in input order. Names
/// are compared case-insensitively so the result is also safe on
/// case-insensitive filesystems.
pub fn jobs_into_dir(
    sources: impl IntoIterator<Item = PathBuf>,
    out_dir: &Path,
) -> Vec<ThumbnailJob> {
    let mut taken = HashSet::new();
    sources
        .into_iter()
        .map(|source| {
            let stem = source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "thumbnail".to_string());
            let mut name = format!("{stem}.jpg");
            let mut n = 2;
            while !taken.insert(name.to_lowercase()) {
                name = format!("{stem}-{n}.jpg");
                n += 1;
            }
            ThumbnailJob::new(source, out_dir.join(name))
        })
        .collect()
}

/// A boxed stream of finished jobs.
pub type ThumbnailStream = Pin<Box<dyn Stream<Item = (ThumbnailJob, ThumbnailResult)> + Send>>;

/// Run `jobs` through `generator`, at most `concurrency` at a time.
///
/// A job whose output path repeats an earlier job's fails with
/// [`ThumbnailError::DuplicateOutput`] instead of overwriting it.
///
/// # Example
/// ```rust,no_run
/// use pdfthumb::{thumbnail_stream, ThumbnailConfig, ThumbnailGenerator, ThumbnailJob};
/// use futures::StreamExt;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let jobs = vec![ThumbnailJob::new("a.pdf", "a.jpg"), ThumbnailJob::new("b.pdf", "b.jpg")];
/// let generator = Arc::new(ThumbnailGenerator::new());
/// let mut results = thumbnail_stream(jobs, generator, ThumbnailConfig::default(), 4);
/// while let Some((job, result)) = results.next().await {
///     println!("{} → success={}", job.source.display(), result.success);
/// }
/// # }
/// ```
pub fn thumbnail_stream(
    jobs: impl IntoIterator<Item = ThumbnailJob>,
    generator: Arc<ThumbnailGenerator>,
    config: ThumbnailConfig,
    concurrency: usize,
) -> ThumbnailStream {
    let jobs: Vec<ThumbnailJob> = jobs.into_iter().collect();
    let concurrency = concurrency.max(1);
    info!(
        "Starting batch of {} thumbnails (concurrency {})",
        jobs.len(),
        concurrency
    );

    let mut claimed = HashSet::new();
    let jobs: Vec<(ThumbnailJob, bool)> = jobs
        .into_iter()
        .map(|job| {
            let duplicate = !claimed.insert(job.output.clone());
            (job, duplicate)
        })
        .collect();

    let s = stream::iter(jobs.into_iter().map(move |(job, duplicate)| {
        let generator = Arc::clone(&generator);
        async move {
            if duplicate {
                warn!("Skipping {}: output already claimed", job.source.display());
                let error = ThumbnailError::DuplicateOutput {
                    path: job.output.clone(),
                };
                return (job, ThumbnailResult::failed(&error));
            }
            let result =
                generate_thumbnail_async(generator, job.source.clone(), job.output.clone(), config)
                    .await;
            (job, result)
        }
    }))
    .buffer_unordered(concurrency);

    Box::pin(s)
}

/// PDF files to process for `path`: the file itself, or every `*.pdf`
/// directly inside a directory, sorted by name.
pub fn discover_pdfs(path: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut pdfs: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                    .unwrap_or(false)
        })
        .collect();
    pdfs.sort();
    Ok(pdfs)
}
