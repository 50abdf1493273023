//! Content bounding-box detection on a mostly-white page.
//!
//! A pixel is *content* when its luminance is below [`CONTENT_THRESHOLD`].
//! The tightest rectangle around all content pixels is padded by
//! `max(5, dim / 50)` on each side and clamped to the frame.
//!
//! Two scans compute the same box:
//!
//! * [`detect_vectorized`]: one pass over the raw buffer building a
//!   row mask and a column mask, then reading the first/last set entries.
//! * [`detect_naive`]: walks inward from each edge with per-pixel reads
//!   until it meets a content row/column.
//!
//! Both feed the same [`pad_extents`], so for any luminance plane and
//! threshold they return identical boxes.

use crate::config::DetectorKind;
use crate::error::{Degradation, DetectError};
use crate::frame::{ContentBoundingBox, RasterFrame};
use image::GrayImage;
use tracing::{debug, warn};

/// Luminance below this value counts as content.
pub const CONTENT_THRESHOLD: u8 = 250;

/// Inclusive pixel extents of all content pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentExtents {
    pub first_col: u32,
    pub last_col: u32,
    pub first_row: u32,
    pub last_row: u32,
}

/// Padding applied on one axis: `max(5, 2% of dim)`.
pub fn padding_for(dim: u32) -> u32 {
    (dim / 50).max(5)
}

/// Expand extents by the padding rule and clamp to the frame.
///
/// Right/bottom become `min(dim, last + padding)`, exclusive.
pub fn pad_extents(
    extents: ContentExtents,
    width: u32,
    height: u32,
) -> Result<ContentBoundingBox, DetectError> {
    let pad_x = padding_for(width);
    let pad_y = padding_for(height);

    let left = extents.first_col.saturating_sub(pad_x);
    let top = extents.first_row.saturating_sub(pad_y);
    let right = extents.last_col.saturating_add(pad_x).min(width);
    let bottom = extents.last_row.saturating_add(pad_y).min(height);

    ContentBoundingBox::new(left, top, right, bottom, width, height).ok_or_else(|| {
        DetectError::Analysis(format!(
            "padded box ({left}, {top}, {right}, {bottom}) is outside {width}x{height}"
        ))
    })
}

/// Mask-based scan over the raw luminance buffer.
pub fn detect_vectorized(
    luma: &GrayImage,
    threshold: u8,
) -> Result<ContentBoundingBox, DetectError> {
    let (width, height) = luma.dimensions();
    let raw = luma.as_raw();
    if width == 0 || height == 0 {
        return Err(DetectError::Analysis("empty luminance plane".into()));
    }
    if raw.len() != width as usize * height as usize {
        return Err(DetectError::Analysis(format!(
            "buffer holds {} samples, expected {}x{}",
            raw.len(),
            width,
            height
        )));
    }

    let mut rows = vec![false; height as usize];
    let mut cols = vec![false; width as usize];
    for (y, row) in raw.chunks_exact(width as usize).enumerate() {
        for (x, &v) in row.iter().enumerate() {
            if v < threshold {
                rows[y] = true;
                cols[x] = true;
            }
        }
    }

    let (Some(first_row), Some(last_row)) = (
        rows.iter().position(|&r| r),
        rows.iter().rposition(|&r| r),
    ) else {
        return Err(DetectError::NoContent);
    };
    let (Some(first_col), Some(last_col)) = (
        cols.iter().position(|&c| c),
        cols.iter().rposition(|&c| c),
    ) else {
        return Err(DetectError::NoContent);
    };

    pad_extents(
        ContentExtents {
            first_col: first_col as u32,
            last_col: last_col as u32,
            first_row: first_row as u32,
            last_row: last_row as u32,
        },
        width,
        height,
    )
}

/// Edge-inward scan with per-pixel reads.
pub fn detect_naive(luma: &GrayImage, threshold: u8) -> Result<ContentBoundingBox, DetectError> {
    let (width, height) = luma.dimensions();
    if width == 0 || height == 0 {
        return Err(DetectError::Analysis("empty luminance plane".into()));
    }

    let is_content = |x: u32, y: u32| luma.get_pixel(x, y).0[0] < threshold;
    let row_has_content = |y: u32| (0..width).any(|x| is_content(x, y));
    let col_has_content = |x: u32| (0..height).any(|y| is_content(x, y));

    let Some(first_row) = (0..height).find(|&y| row_has_content(y)) else {
        return Err(DetectError::NoContent);
    };
    let last_row = (0..height)
        .rev()
        .find(|&y| row_has_content(y))
        .unwrap_or(first_row);
    let first_col = (0..width).find(|&x| col_has_content(x)).unwrap_or(0);
    let last_col = (0..width)
        .rev()
        .find(|&x| col_has_content(x))
        .unwrap_or(first_col);

    pad_extents(
        ContentExtents {
            first_col,
            last_col,
            first_row,
            last_row,
        },
        width,
        height,
    )
}

/// A content scan over a luminance plane.
pub type ContentScan = fn(&GrayImage, u8) -> Result<ContentBoundingBox, DetectError>;

/// Locate the content box of `frame`, never failing.
///
/// The vectorized scan falls back to the naive scan on an analysis error;
/// a blank page or a second failure yields the fixed margin crop, reported
/// as a [`Degradation`].
pub fn locate_content(
    frame: &RasterFrame,
    kind: DetectorKind,
) -> (ContentBoundingBox, Option<Degradation>) {
    locate_in_plane(frame, &frame.luma(), kind)
}

/// [`locate_content`] on a luminance plane computed elsewhere for `frame`.
///
/// A plane whose size differs from the frame is an analysis failure.
pub fn locate_in_plane(
    frame: &RasterFrame,
    luma: &GrayImage,
    kind: DetectorKind,
) -> (ContentBoundingBox, Option<Degradation>) {
    let result = if luma.dimensions() != frame.dimensions() {
        Err(DetectError::Analysis(format!(
            "luminance plane is {}x{}, frame is {}x{}",
            luma.width(),
            luma.height(),
            frame.width(),
            frame.height()
        )))
    } else {
        match kind {
            DetectorKind::Vectorized => scan_with_retry(luma, detect_vectorized),
            DetectorKind::Naive => detect_naive(luma, CONTENT_THRESHOLD),
        }
    };

    match result {
        Ok(bbox) => {
            debug!(
                "Content box {:?} in {}x{} frame",
                bbox.as_tuple(),
                frame.width(),
                frame.height()
            );
            (bbox, None)
        }
        Err(DetectError::NoContent) => {
            debug!("No content pixels; using margin crop");
            (frame.margin_bounds(), Some(Degradation::BlankPage))
        }
        Err(DetectError::Analysis(detail)) => {
            warn!("Content detection failed: {detail}; using margin crop");
            (
                frame.margin_bounds(),
                Some(Degradation::ContentDetectionDegraded { detail }),
            )
        }
    }
}

/// Run `primary`, retrying with [`detect_naive`] on an analysis error.
pub fn scan_with_retry(
    luma: &GrayImage,
    primary: ContentScan,
) -> Result<ContentBoundingBox, DetectError> {
    match primary(luma, CONTENT_THRESHOLD) {
        Err(DetectError::Analysis(detail)) => {
            warn!("Primary content scan failed ({detail}); using naive scan");
            detect_naive(luma, CONTENT_THRESHOLD)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    fn page_with_square(w: u32, h: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> GrayImage {
        let mut img = GrayImage::from_pixel(w, h, Luma([255]));
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        img
    }

    #[test]
    fn padding_rule() {
        assert_eq!(padding_for(100), 5);
        assert_eq!(padding_for(249), 5);
        assert_eq!(padding_for(300), 6);
        assert_eq!(padding_for(2550), 51);
    }

    #[test]
    fn centered_square_box_is_tight_plus_padding() {
        // 1000x1000 page, square at [400, 600) on both axes; padding 20.
        let luma = page_with_square(1000, 1000, 400, 400, 600, 600);
        let bbox = detect_vectorized(&luma, CONTENT_THRESHOLD).unwrap();
        assert_eq!(bbox.as_tuple(), (380, 380, 619, 619));
        assert_eq!(detect_naive(&luma, CONTENT_THRESHOLD).unwrap(), bbox);
    }

    #[test]
    fn padding_clamps_at_edges() {
        let luma = page_with_square(100, 80, 0, 0, 3, 3);
        let bbox = detect_vectorized(&luma, CONTENT_THRESHOLD).unwrap();
        assert_eq!(bbox.as_tuple(), (0, 0, 7, 7));

        let luma = page_with_square(100, 80, 97, 77, 100, 80);
        let bbox = detect_vectorized(&luma, CONTENT_THRESHOLD).unwrap();
        assert_eq!(bbox.as_tuple(), (92, 72, 100, 80));
    }

    #[test]
    fn blank_page_reports_no_content_on_both_paths() {
        let luma = GrayImage::from_pixel(50, 50, Luma([255]));
        assert_eq!(
            detect_vectorized(&luma, CONTENT_THRESHOLD),
            Err(DetectError::NoContent)
        );
        assert_eq!(
            detect_naive(&luma, CONTENT_THRESHOLD),
            Err(DetectError::NoContent)
        );
    }

    #[test]
    fn near_white_is_background() {
        let luma = GrayImage::from_pixel(20, 20, Luma([250]));
        assert_eq!(
            detect_vectorized(&luma, CONTENT_THRESHOLD),
            Err(DetectError::NoContent)
        );
        let mut luma = luma;
        luma.put_pixel(10, 10, Luma([249]));
        assert!(detect_vectorized(&luma, CONTENT_THRESHOLD).is_ok());
    }

    #[test]
    fn single_pixel_page() {
        let luma = GrayImage::from_pixel(1, 1, Luma([0]));
        let a = detect_vectorized(&luma, CONTENT_THRESHOLD).unwrap();
        let b = detect_naive(&luma, CONTENT_THRESHOLD).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_tuple(), (0, 0, 1, 1));
    }

    #[test]
    fn locate_content_on_blank_frame_uses_margin() {
        let frame = RasterFrame::new(RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]))).unwrap();
        let (bbox, degradation) = locate_content(&frame, DetectorKind::Vectorized);
        assert_eq!(bbox.as_tuple(), (20, 10, 180, 90));
        assert_eq!(degradation, Some(Degradation::BlankPage));
    }

    #[test]
    fn locate_content_agrees_across_kinds() {
        let mut img = RgbImage::from_pixel(300, 400, Rgb([255, 255, 255]));
        img.put_pixel(40, 70, Rgb([10, 10, 10]));
        img.put_pixel(260, 330, Rgb([200, 0, 0]));
        let frame = RasterFrame::new(img).unwrap();
        let (a, da) = locate_content(&frame, DetectorKind::Vectorized);
        let (b, db) = locate_content(&frame, DetectorKind::Naive);
        assert_eq!(a, b);
        assert!(da.is_none() && db.is_none());
    }

    fn broken_scan(_: &GrayImage, _: u8) -> Result<ContentBoundingBox, DetectError> {
        Err(DetectError::Analysis("mask scan unavailable".into()))
    }

    #[test]
    fn analysis_failure_retries_with_naive_scan() {
        let luma = page_with_square(1000, 1000, 400, 400, 600, 600);
        let bbox = scan_with_retry(&luma, broken_scan).unwrap();
        assert_eq!(bbox, detect_naive(&luma, CONTENT_THRESHOLD).unwrap());
        assert_eq!(bbox.as_tuple(), (380, 380, 619, 619));

        let blank = GrayImage::from_pixel(30, 30, Luma([255]));
        assert_eq!(
            scan_with_retry(&blank, broken_scan),
            Err(DetectError::NoContent)
        );
    }

    #[test]
    fn failed_analysis_degrades_to_margin_crop() {
        let frame = RasterFrame::new(RgbImage::from_pixel(200, 100, Rgb([0, 0, 0]))).unwrap();
        let (bbox, degradation) =
            locate_in_plane(&frame, &GrayImage::new(0, 0), DetectorKind::Vectorized);
        assert_eq!(bbox.as_tuple(), (20, 10, 180, 90));
        match degradation {
            Some(Degradation::ContentDetectionDegraded { detail }) => {
                assert!(detail.contains("0x0"), "{detail}");
            }
            other => panic!("expected ContentDetectionDegraded, got {other:?}"),
        }

        // the margin box crops and composes to the exact size
        let content = frame.crop(&bbox);
        let config = crate::config::ThumbnailConfig::default();
        let (out, _) = crate::pipeline::composite::compose(&content, &config);
        assert_eq!(out.dimensions(), (400, 250));
    }
}
