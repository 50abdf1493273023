//! Fit cropped page content into the exact thumbnail footprint.
//!
//! ```text
//! content crop ──▶ scale_to_width ──▶ crop_to_size ──▶ width × height
//!                  (Lanczos3,          (y = 0, x biased
//!                   width exact)        10% left of centre)
//! ```
//!
//! Every function here returns an image of exactly the requested size or a
//! typed error; none of them write into their input.

use crate::config::ThumbnailConfig;
use crate::error::Degradation;
use crate::frame::{ContentBoundingBox, RasterFrame};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use tracing::{debug, warn};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Share of the centring margin the crop window is moved towards the left.
const LEFT_BIAS: f64 = 0.1;

/// Largest fit-to-width intermediate accepted, in pixels, unless the target
/// itself is bigger.
pub const MAX_SCALED_PIXELS: u64 = 40_000_000;

/// Resample `frame` so its width is exactly `target_width`.
///
/// Height keeps the aspect ratio: `floor(h * target_width / w)`, at least 1.
/// Fails when the scaled image would exceed `max_pixels`.
pub fn scale_to_width(
    frame: &RasterFrame,
    target_width: u32,
    max_pixels: u64,
) -> Result<RgbImage, Degradation> {
    if target_width == 0 {
        return Err(Degradation::CompositionDegraded {
            detail: "target width is zero".into(),
        });
    }
    let (w, h) = frame.dimensions();
    let new_height = ((h as u64 * target_width as u64) / w as u64).max(1);
    if new_height.saturating_mul(target_width as u64) > max_pixels {
        return Err(Degradation::CompositionDegraded {
            detail: format!(
                "scaling {w}x{h} to width {target_width} needs {target_width}x{new_height} pixels"
            ),
        });
    }
    let new_height = u32::try_from(new_height).map_err(|_| Degradation::CompositionDegraded {
        detail: format!("scaled height overflows for {w}x{h} → width {target_width}"),
    })?;

    let scaled = imageops::resize(frame.as_rgb(), target_width, new_height, FilterType::Lanczos3);
    debug!(
        "Scaled from {}x{} to {}x{} (fit to width)",
        w,
        h,
        scaled.width(),
        scaled.height()
    );
    Ok(scaled)
}

/// Source rows that reach the top `target_height` output rows once the frame
/// is scaled to `target_width`, plus the Lanczos3 support as margin.
pub fn rows_needed(
    frame_width: u32,
    frame_height: u32,
    target_width: u32,
    target_height: u32,
) -> u32 {
    let (w, tw) = (frame_width as u64, target_width.max(1) as u64);
    let rows = (target_height as u64 * w).div_ceil(tw);
    let margin = 3 * w.div_ceil(tw) + 3;
    (rows + margin).min(frame_height as u64) as u32
}

/// Horizontal crop offset: centre, nudged left by 10% of the centring margin.
pub fn biased_crop_x(image_width: u32, target_width: u32) -> u32 {
    let center_x = image_width.saturating_sub(target_width) / 2;
    let left_shift = (center_x as f64 * LEFT_BIAS) as u32;
    let crop_x = center_x - left_shift;
    crop_x.min(image_width.saturating_sub(target_width))
}

/// Cut exactly `target_width × target_height` out of `image`.
///
/// When the image covers the target on both axes the window starts at the top
/// (to keep a title visible) with a left-biased horizontal offset. Otherwise
/// the image is centred on a white canvas of the target size.
pub fn crop_to_size(image: &RgbImage, target_width: u32, target_height: u32) -> RgbImage {
    let (w, h) = image.dimensions();
    if w >= target_width && h >= target_height {
        let crop_x = biased_crop_x(w, target_width);
        let crop_y = 0;
        debug!("Cropping {}x{} at ({}, {})", w, h, crop_x, crop_y);
        imageops::crop_imm(image, crop_x, crop_y, target_width, target_height).to_image()
    } else {
        center_on_canvas(image, target_width, target_height)
    }
}

/// Centre `image` on a white canvas, clipping any axis that overhangs.
pub fn center_on_canvas(image: &RgbImage, target_width: u32, target_height: u32) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(target_width, target_height, WHITE);
    let x = (target_width as i64 - image.width() as i64) / 2;
    let y = (target_height as i64 - image.height() as i64) / 2;
    imageops::overlay(&mut canvas, image, x, y);
    canvas
}

/// Aspect-preserving fit inside the target, padded with white.
///
/// Total: used as the last resort when scale-and-crop cannot run.
pub fn resize_and_pad(frame: &RasterFrame, target_width: u32, target_height: u32) -> RgbImage {
    let (w, h) = frame.dimensions();
    let aspect = w as f64 / h as f64;
    let target_aspect = target_width as f64 / target_height as f64;

    let (new_w, new_h) = if aspect > target_aspect {
        (target_width, (target_width as f64 / aspect) as u32)
    } else {
        ((target_height as f64 * aspect) as u32, target_height)
    };
    let resized = imageops::resize(
        frame.as_rgb(),
        new_w.clamp(1, target_width),
        new_h.clamp(1, target_height),
        FilterType::Lanczos3,
    );
    center_on_canvas(&resized, target_width, target_height)
}

/// Scale-to-width then crop-to-size; degrades to [`resize_and_pad`] on error.
///
/// Rows below the crop window are dropped before resampling, so a narrow
/// frame never turns into a tall intermediate image.
pub fn compose(frame: &RasterFrame, config: &ThumbnailConfig) -> (RgbImage, Option<Degradation>) {
    let (w, h) = frame.dimensions();
    let rows = rows_needed(w, h, config.width, config.height);
    let trimmed;
    let source = match ContentBoundingBox::new(0, 0, w, rows, w, h) {
        Some(window) if rows < h => {
            debug!("Keeping top {rows} of {h} rows before scaling");
            trimmed = frame.crop(&window);
            &trimmed
        }
        _ => frame,
    };
    let max_pixels = MAX_SCALED_PIXELS.max(2 * config.width as u64 * config.height as u64);

    match scale_to_width(source, config.width, max_pixels) {
        Ok(scaled) => (crop_to_size(&scaled, config.width, config.height), None),
        Err(degradation) => {
            warn!("Composition failed: {degradation}; resizing and padding instead");
            (
                resize_and_pad(frame, config.width, config.height),
                Some(degradation),
            )
        }
    }
}
