//! JPEG encoding and atomic output writes.
//!
//! ## Why a fixed quality?
//!
//! Every thumbnail, rendered or placeholder, is encoded at
//! [`ENCODE_QUALITY`] so that gallery previews look identical regardless of
//! which branch produced them. `ThumbnailConfig::quality` is validated and
//! reported but does not change the bytes.
//!
//! ## Why write through a temp file?
//!
//! Gallery pages may serve a thumbnail while it is being regenerated. The
//! encoded bytes go to a [`NamedTempFile`] in the destination directory and
//! are renamed over the final path, so readers see either the old file or the
//! complete new one, never a truncated JPEG.

use crate::config::ENCODE_QUALITY;
use crate::error::ThumbnailError;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Encode an RGB raster as a baseline JPEG at [`ENCODE_QUALITY`].
pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>, ThumbnailError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, ENCODE_QUALITY).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgb8,
    )?;
    debug!(
        "Encoded {}x{} thumbnail → {} bytes JPEG",
        image.width(),
        image.height(),
        buf.len()
    );
    Ok(buf)
}

/// Create the parent directory of `path` if needed.
pub fn ensure_parent_dir(path: &Path) -> Result<(), ThumbnailError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|source| ThumbnailError::OutputDirFailed {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

/// Write `bytes` to `path` via a temp file in the same directory plus rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ThumbnailError> {
    ensure_parent_dir(path)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let write_failed = |source: std::io::Error| ThumbnailError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_failed)?;
    tmp.write_all(bytes).map_err(write_failed)?;
    tmp.as_file().sync_all().map_err(write_failed)?;
    tmp.persist(path).map_err(|e| write_failed(e.error))?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
