//! pdfium backend via `pdfium-render`.
//!
//! The library is bound per call. Binding is cheap next to a 300 DPI render,
//! and it keeps the backend free of process-wide state: a strategy that fails
//! to bind simply reports [`RasterError::Unavailable`] and the resolver moves
//! on.

use super::{cap_longest_edge, PageRasterizer, TextExtractor};
use crate::config::Location;
use crate::error::{RasterError, TextError};
use crate::frame::RasterFrame;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Platform file name of the pdfium shared library.
pub fn library_file_name() -> &'static str {
    if cfg!(target_os = "macos") {
        "libpdfium.dylib"
    } else if cfg!(windows) {
        "pdfium.dll"
    } else {
        "libpdfium.so"
    }
}

/// pdfium bound from a directory (or library file), or from the system path.
#[derive(Debug, Clone)]
pub struct PdfiumBackend {
    location: Location,
    max_rendered_pixels: u32,
}

impl PdfiumBackend {
    pub fn new(location: Location, max_rendered_pixels: u32) -> Self {
        Self {
            location,
            max_rendered_pixels,
        }
    }

    /// Library path this backend would load, if it is directory-based.
    pub fn library_path(&self) -> Option<PathBuf> {
        match &self.location {
            Location::Dir(p) if p.is_file() => Some(p.clone()),
            Location::Dir(p) => Some(p.join(library_file_name())),
            Location::System => None,
        }
    }

    fn bind(&self) -> Result<Pdfium, String> {
        let bindings = match self.library_path() {
            Some(lib) => {
                if !lib.exists() {
                    return Err(format!("no pdfium library at {}", lib.display()));
                }
                Pdfium::bind_to_library(&lib)
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| format!("failed to bind pdfium: {e}"))?;
        Ok(Pdfium::new(bindings))
    }
}

impl PageRasterizer for PdfiumBackend {
    fn name(&self) -> String {
        format!("pdfium ({})", self.location)
    }

    fn rasterize(&self, pdf_path: &Path, page: u16, dpi: u32) -> Result<RasterFrame, RasterError> {
        let pdfium = self.bind().map_err(RasterError::Unavailable)?;

        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| RasterError::Failed(format!("pdfium could not open PDF: {e:?}")))?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        if total_pages == 0 || page == 0 || page as usize > total_pages {
            return Err(RasterError::NoPages);
        }

        let pdf_page = pages
            .get(page - 1)
            .map_err(|e| RasterError::Failed(format!("page {page}: {e:?}")))?;

        let mut render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);
        if self.max_rendered_pixels > 0 {
            render_config = render_config
                .set_maximum_width(self.max_rendered_pixels as i32)
                .set_maximum_height(self.max_rendered_pixels as i32);
        }

        let bitmap = pdf_page
            .render_with_config(&render_config)
            .map_err(|e| RasterError::Failed(format!("page {page}: {e:?}")))?;

        let frame = RasterFrame::from_dynamic(bitmap.as_image()).ok_or(RasterError::NoPages)?;
        debug!(
            "pdfium rendered page {} → {}x{} px",
            page,
            frame.width(),
            frame.height()
        );
        Ok(cap_longest_edge(frame, self.max_rendered_pixels))
    }
}

impl TextExtractor for PdfiumBackend {
    fn name(&self) -> String {
        format!("pdfium text ({})", self.location)
    }

    fn extract_text(&self, pdf_path: &Path, page: u16) -> Result<String, TextError> {
        let pdfium = self.bind().map_err(TextError::Unavailable)?;

        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| TextError::Failed(format!("pdfium could not open PDF: {e:?}")))?;

        let pages = document.pages();
        if page == 0 || page as usize > pages.len() as usize {
            return Err(TextError::Failed("document has no such page".into()));
        }
        let pdf_page = pages
            .get(page - 1)
            .map_err(|e| TextError::Failed(format!("page {page}: {e:?}")))?;

        let text = pdf_page
            .text()
            .map_err(|e| TextError::Failed(format!("page {page} text: {e:?}")))?;
        Ok(text.all())
    }
}
