//! Raster data passed between pipeline stages.
//!
//! A [`RasterFrame`] is an owned, never-empty RGB bitmap. Stages take frames
//! by reference and return new ones, so a frame handed to one thread is never
//! written by another.

use image::{imageops, DynamicImage, GrayImage, RgbImage};

/// One rendered page (or an intermediate stage output). Origin is top-left.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterFrame {
    image: RgbImage,
}

impl RasterFrame {
    /// Wrap an RGB buffer. Returns `None` for zero-width or zero-height images.
    pub fn new(image: RgbImage) -> Option<Self> {
        if image.width() == 0 || image.height() == 0 {
            return None;
        }
        Some(Self { image })
    }

    /// Convert any decoded image to RGB. Alpha is dropped, not composited.
    pub fn from_dynamic(image: DynamicImage) -> Option<Self> {
        Self::new(image.into_rgb8())
    }

    /// A solid white frame.
    pub fn blank(width: u32, height: u32) -> Option<Self> {
        Self::new(RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255])))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_rgb(self) -> RgbImage {
        self.image
    }

    /// Single-channel luminance plane used for content analysis.
    ///
    /// Uses the `image` crate's Rec. 709 weights (0.2126 R, 0.7152 G,
    /// 0.0722 B) in integer arithmetic, truncating. Saturated blue maps to
    /// 18 and saturated yellow to 236, so both count as content.
    pub fn luma(&self) -> GrayImage {
        DynamicImage::ImageRgb8(self.image.clone()).into_luma8()
    }

    /// The box covering the whole frame.
    pub fn full_bounds(&self) -> ContentBoundingBox {
        ContentBoundingBox {
            left: 0,
            top: 0,
            right: self.width(),
            bottom: self.height(),
        }
    }

    /// [`ContentBoundingBox::margin_fallback`] for this frame.
    pub fn margin_bounds(&self) -> ContentBoundingBox {
        ContentBoundingBox::margin_fallback(self.width(), self.height())
            .unwrap_or_else(|| self.full_bounds())
    }

    /// Copy out the region described by `bbox` as a new frame.
    ///
    /// The box was validated against this frame's dimensions on construction,
    /// so the region is always non-empty.
    pub fn crop(&self, bbox: &ContentBoundingBox) -> RasterFrame {
        let region = imageops::crop_imm(
            &self.image,
            bbox.left(),
            bbox.top(),
            bbox.width(),
            bbox.height(),
        )
        .to_image();
        RasterFrame { image: region }
    }
}

/// Content rectangle `(left, top, right, bottom)` with exclusive right/bottom.
///
/// Always satisfies `left < right <= frame_width` and
/// `top < bottom <= frame_height` for the frame it was built against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentBoundingBox {
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
}

impl ContentBoundingBox {
    /// Checked constructor; `None` when the box would be empty or leave the frame.
    pub fn new(
        left: u32,
        top: u32,
        right: u32,
        bottom: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<Self> {
        if left < right && right <= frame_width && top < bottom && bottom <= frame_height {
            Some(Self {
                left,
                top,
                right,
                bottom,
            })
        } else {
            None
        }
    }

    /// Fixed-fraction crop used when no content can be located:
    /// `floor(dim / 10)` removed from each side.
    pub fn margin_fallback(frame_width: u32, frame_height: u32) -> Option<Self> {
        let mx = frame_width / 10;
        let my = frame_height / 10;
        Self::new(
            mx,
            my,
            frame_width - mx,
            frame_height - my,
            frame_width,
            frame_height,
        )
    }

    pub fn left(&self) -> u32 {
        self.left
    }

    pub fn top(&self) -> u32 {
        self.top
    }

    pub fn right(&self) -> u32 {
        self.right
    }

    pub fn bottom(&self) -> u32 {
        self.bottom
    }

    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    pub fn as_tuple(&self) -> (u32, u32, u32, u32) {
        (self.left, self.top, self.right, self.bottom)
    }
}
