//! poppler backend: shells out to `pdftoppm` and `pdftotext`.
//!
//! `pdftoppm -singlefile` writes exactly `<prefix>.png` into a scratch
//! [`TempDir`], which is removed when the call returns. The page size from
//! `pdfinfo` lowers the requested DPI so the longest edge stays within the
//! pixel cap; without it, the full-DPI render is downscaled afterwards.

use super::{cap_longest_edge, PageRasterizer, TextExtractor};
use crate::config::Location;
use crate::error::{RasterError, TextError};
use crate::frame::RasterFrame;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;
use tracing::debug;

static RE_PAGE_SIZE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Page\s+(?:\d+\s+)?size:\s+([\d.]+)\s+x\s+([\d.]+)\s+pts").unwrap()
});

/// Page size in points from `pdfinfo` output.
pub fn parse_page_size(info: &str) -> Option<(f64, f64)> {
    let caps = RE_PAGE_SIZE.captures(info)?;
    let width: f64 = caps[1].parse().ok()?;
    let height: f64 = caps[2].parse().ok()?;
    (width > 0.0 && height > 0.0).then_some((width, height))
}

/// Highest DPI, at most `dpi`, that keeps the longest page edge within
/// `max_pixels` (0 disables the bound).
pub fn bounded_dpi(dpi: u32, page_pts: Option<(f64, f64)>, max_pixels: u32) -> u32 {
    let Some((width, height)) = page_pts else {
        return dpi;
    };
    if max_pixels == 0 {
        return dpi;
    }
    let limit = (f64::from(max_pixels) * 72.0 / width.max(height)).floor();
    if limit >= f64::from(dpi) {
        dpi
    } else {
        (limit as u32).max(1)
    }
}

/// Platform executable name for a poppler tool.
pub fn executable_name(tool: &str) -> String {
    if cfg!(windows) {
        format!("{tool}.exe")
    } else {
        tool.to_string()
    }
}

/// `pdftoppm` / `pdftotext` from a bin directory, or from `PATH`.
#[derive(Debug, Clone)]
pub struct PopplerBackend {
    location: Location,
    max_rendered_pixels: u32,
}

enum ToolFailure {
    Missing(String),
    Failed(String),
}

impl PopplerBackend {
    pub fn new(location: Location, max_rendered_pixels: u32) -> Self {
        Self {
            location,
            max_rendered_pixels,
        }
    }

    /// Resolve the executable for `tool` under this location.
    pub fn tool_path(&self, tool: &str) -> Result<PathBuf, String> {
        match &self.location {
            Location::Dir(dir) => {
                let exe = dir.join(executable_name(tool));
                if exe.is_file() {
                    Ok(exe)
                } else {
                    Err(format!("{} not found in {}", tool, dir.display()))
                }
            }
            Location::System => Ok(PathBuf::from(executable_name(tool))),
        }
    }

    fn run(&self, tool: &str, args: &[&std::ffi::OsStr]) -> Result<Output, ToolFailure> {
        let exe = self.tool_path(tool).map_err(ToolFailure::Missing)?;
        let output = Command::new(&exe).args(args).output().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound || e.kind() == io::ErrorKind::PermissionDenied {
                ToolFailure::Missing(format!("cannot run {}: {e}", exe.display()))
            } else {
                ToolFailure::Failed(format!("{} failed to start: {e}", exe.display()))
            }
        })?;

        if !output.status.success() {
            return Err(ToolFailure::Failed(format!(
                "{} exited with {}: {}",
                tool,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output)
    }

    /// Size of `page` in points, or `None` when `pdfinfo` cannot tell.
    fn page_size(&self, pdf_path: &Path, page: u16) -> Option<(f64, f64)> {
        let page_arg = page.to_string();
        let args = [
            "-f".as_ref(),
            page_arg.as_ref(),
            "-l".as_ref(),
            page_arg.as_ref(),
            pdf_path.as_os_str(),
        ];
        match self.run("pdfinfo", &args) {
            Ok(output) => parse_page_size(&String::from_utf8_lossy(&output.stdout)),
            Err(ToolFailure::Missing(msg) | ToolFailure::Failed(msg)) => {
                debug!("pdfinfo unavailable, rendering at requested DPI: {msg}");
                None
            }
        }
    }
}

impl PageRasterizer for PopplerBackend {
    fn name(&self) -> String {
        format!("poppler ({})", self.location)
    }

    fn rasterize(&self, pdf_path: &Path, page: u16, dpi: u32) -> Result<RasterFrame, RasterError> {
        let temp_dir = TempDir::new()
            .map_err(|e| RasterError::Failed(format!("cannot create scratch dir: {e}")))?;
        let prefix = temp_dir.path().join("page");

        let dpi = if self.max_rendered_pixels == 0 {
            dpi
        } else {
            bounded_dpi(dpi, self.page_size(pdf_path, page), self.max_rendered_pixels)
        };
        let page_arg = page.to_string();
        let dpi_arg = dpi.to_string();
        let args = [
            "-png".as_ref(),
            "-r".as_ref(),
            dpi_arg.as_ref(),
            "-f".as_ref(),
            page_arg.as_ref(),
            "-l".as_ref(),
            page_arg.as_ref(),
            "-singlefile".as_ref(),
            pdf_path.as_os_str(),
            prefix.as_os_str(),
        ];
        self.run("pdftoppm", &args).map_err(|failure| match failure {
            ToolFailure::Missing(msg) => RasterError::Unavailable(msg),
            ToolFailure::Failed(msg) => RasterError::Failed(msg),
        })?;

        let png_path = prefix.with_extension("png");
        if !png_path.is_file() {
            return Err(RasterError::NoPages);
        }
        let image = image::open(&png_path)
            .map_err(|e| RasterError::Failed(format!("cannot decode pdftoppm output: {e}")))?;

        let frame = RasterFrame::from_dynamic(image).ok_or(RasterError::NoPages)?;
        debug!(
            "pdftoppm rendered page {} at {} dpi → {}x{} px",
            page,
            dpi,
            frame.width(),
            frame.height()
        );
        Ok(cap_longest_edge(frame, self.max_rendered_pixels))
    }
}

impl TextExtractor for PopplerBackend {
    fn name(&self) -> String {
        format!("poppler text ({})", self.location)
    }

    fn extract_text(&self, pdf_path: &Path, page: u16) -> Result<String, TextError> {
        let page_arg = page.to_string();
        let args = [
            "-f".as_ref(),
            page_arg.as_ref(),
            "-l".as_ref(),
            page_arg.as_ref(),
            "-enc".as_ref(),
            "UTF-8".as_ref(),
            pdf_path.as_os_str(),
            "-".as_ref(),
        ];
        let output = self.run("pdftotext", &args).map_err(|failure| match failure {
            ToolFailure::Missing(msg) => TextError::Unavailable(msg),
            ToolFailure::Failed(msg) => TextError::Failed(msg),
        })?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
