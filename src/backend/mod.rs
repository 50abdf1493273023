//! External rasterization and text-extraction capabilities.
//!
//! The pipeline never talks to pdfium or poppler directly. It sees two narrow
//! traits, [`PageRasterizer`] and [`TextExtractor`], and an ordered list of
//! implementations built from [`RasterizerConfig`]. A missing installation is
//! an ordinary [`RasterError::Unavailable`] value, so swapping or adding a
//! backend never touches the orchestrator.
//!
//! ```text
//! RasterizerConfig::locations()   ×   backends
//!  ├─ Dir(local installation)        ├─ pdfium  (libpdfium in that dir)
//!  ├─ Dir(candidate …)               └─ poppler (pdftoppm / pdftotext in that dir)
//!  └─ System                            (dynamic loader path / PATH)
//! ```

pub mod pdfium;
pub mod poppler;

use crate::config::{Backend, Location, RasterizerConfig};
use crate::error::{RasterError, TextError};
use crate::frame::RasterFrame;
use image::imageops::{self, FilterType};
use std::path::Path;
use std::sync::Arc;

/// Renders one page of a PDF to a raster frame.
///
/// Implementations must be `Send + Sync`: one generator is shared by every
/// concurrent invocation.
pub trait PageRasterizer: Send + Sync {
    /// Human-readable description of this strategy, used in logs and results.
    fn name(&self) -> String;

    /// Render `page` (1-indexed) at `dpi`.
    fn rasterize(&self, pdf_path: &Path, page: u16, dpi: u32) -> Result<RasterFrame, RasterError>;
}

/// Pulls raw text from one page of a PDF.
pub trait TextExtractor: Send + Sync {
    fn name(&self) -> String;

    /// Text of `page` (1-indexed); may be empty.
    fn extract_text(&self, pdf_path: &Path, page: u16) -> Result<String, TextError>;
}

/// Every (location, backend) pair as a rasterization strategy, in order.
pub fn rasterizers_from_config(config: &RasterizerConfig) -> Vec<Arc<dyn PageRasterizer>> {
    config
        .locations()
        .into_iter()
        .flat_map(|location| {
            config
                .backends
                .iter()
                .map(move |backend| rasterizer_for(*backend, location.clone(), config))
        })
        .collect()
}

/// Every (location, backend) pair as a text extractor, in order.
pub fn text_extractors_from_config(config: &RasterizerConfig) -> Vec<Arc<dyn TextExtractor>> {
    config
        .locations()
        .into_iter()
        .flat_map(|location| {
            config
                .backends
                .iter()
                .map(move |backend| text_extractor_for(*backend, location.clone()))
        })
        .collect()
}

fn rasterizer_for(
    backend: Backend,
    location: Location,
    config: &RasterizerConfig,
) -> Arc<dyn PageRasterizer> {
    match backend {
        Backend::Pdfium => Arc::new(pdfium::PdfiumBackend::new(
            location,
            config.max_rendered_pixels,
        )),
        Backend::Poppler => Arc::new(poppler::PopplerBackend::new(
            location,
            config.max_rendered_pixels,
        )),
    }
}

fn text_extractor_for(backend: Backend, location: Location) -> Arc<dyn TextExtractor> {
    match backend {
        Backend::Pdfium => Arc::new(pdfium::PdfiumBackend::new(location, 0)),
        Backend::Poppler => Arc::new(poppler::PopplerBackend::new(location, 0)),
    }
}

/// Downscale so the longest edge is at most `max_pixels` (0 disables the cap).
pub(crate) fn cap_longest_edge(frame: RasterFrame, max_pixels: u32) -> RasterFrame {
    let (w, h) = frame.dimensions();
    let longest = w.max(h);
    if max_pixels == 0 || longest <= max_pixels {
        return frame;
    }
    let new_w = ((w as u64 * max_pixels as u64) / longest as u64).max(1) as u32;
    let new_h = ((h as u64 * max_pixels as u64) / longest as u64).max(1) as u32;
    let resized = imageops::resize(frame.as_rgb(), new_w, new_h, FilterType::Triangle);
    RasterFrame::new(resized).unwrap_or(frame)
}
