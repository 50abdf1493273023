//! Best-effort legibility pass for small text.
//!
//! An unsharp mask tuned for 8–10 px glyphs followed by a ~10% contrast
//! boost. The pass is cosmetic: any problem returns the input untouched.

use crate::error::Degradation;
use image::{imageops, RgbImage};
use tracing::warn;

/// Gaussian sigma of the unsharp mask blur.
pub const UNSHARP_SIGMA: f32 = 1.0;

/// Minimum difference (0–255) before a pixel is sharpened.
pub const UNSHARP_THRESHOLD: i32 = 3;

/// Contrast increase in percent.
pub const CONTRAST_BOOST: f32 = 10.0;

/// Sharpen then boost contrast. Dimensions are preserved.
pub fn enhance(image: &RgbImage) -> Result<RgbImage, Degradation> {
    if image.width() == 0 || image.height() == 0 {
        return Err(Degradation::EnhancementSkipped {
            detail: "empty image".into(),
        });
    }

    let sharpened = imageops::unsharpen(image, UNSHARP_SIGMA, UNSHARP_THRESHOLD);
    let enhanced = imageops::contrast(&sharpened, CONTRAST_BOOST);

    if enhanced.dimensions() != image.dimensions() {
        return Err(Degradation::EnhancementSkipped {
            detail: format!(
                "enhancement changed size {:?} → {:?}",
                image.dimensions(),
                enhanced.dimensions()
            ),
        });
    }
    Ok(enhanced)
}

/// [`enhance`], falling back to a copy of the input.
pub fn enhance_or_passthrough(image: RgbImage) -> (RgbImage, Option<Degradation>) {
    match enhance(&image) {
        Ok(enhanced) => (enhanced, None),
        Err(degradation) => {
            warn!("Enhancement failed: {degradation}");
            (image, Some(degradation))
        }
    }
}
