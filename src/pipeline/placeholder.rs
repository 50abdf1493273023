//! Synthetic "research paper" thumbnail used when no rasterizer is available.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────────[PDF]┐   badge at (w-30, 8), 22×12
//! │      Title line 1 (16 px, bold)    │   ≤ 3 centred lines, 18 px apart
//! │      Title line 2                  │
//! │  John Smith, Jane Doe, Research …  │   11 px
//! │   University Research Institute    │    9 px
//! │             ABSTRACT               │    9 px
//! │ body text wrapped to w - 2·margin  │    8 px, 10 px line height
//! │ ▬▬▬▬▬▬▬▬▬▬▬▬▬▬▬▬▬▬▬▬▬▬▬▬▬▬▬▬▬▬▬▬▬ │   ≤ 8 gray bars
//! └────────────────────────────────────┘▒  shadow
//! ```
//!
//! ## Why a built-in fallback typeface?
//!
//! Font files are an optional host capability just like the rasterizer. When
//! none of the configured candidates loads, [`Typeface::Blocks`] "greeks" the
//! text: every word becomes a bar of its approximate rendered width. The
//! thumbnail keeps the shape of a paper page and the stage still cannot fail.

use crate::config::{FontConfig, ThumbnailConfig};
use crate::pipeline::text::truncate_chars;
use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::fmt;
use tracing::debug;

/// Title used when the page text is too short to derive one.
pub const DEFAULT_TITLE: &str = "Advancing Research in Legal Technology and Innovation";

pub const DEFAULT_AUTHORS: &str = "John Smith, Jane Doe, Research Team";

pub const DEFAULT_INSTITUTION: &str = "University Research Institute";

/// Body used when fewer than [`MIN_ABSTRACT_CHARS`] remain after the title.
pub const DEFAULT_ABSTRACT: &str = "This research presents innovative approaches to legal \
technology, examining the intersection of artificial intelligence and legal practice. Our \
methodology incorporates advanced computational techniques to analyze legal documents and \
provide insights for practitioners. The findings demonstrate significant improvements in \
efficiency and accuracy.";

pub const MIN_ABSTRACT_CHARS: usize = 40;

/// Below this size only the white canvas is returned.
pub const MIN_LAYOUT_WIDTH: u32 = 60;
pub const MIN_LAYOUT_HEIGHT: u32 = 40;

const MARGIN: i64 = 12;
const LINE_HEIGHT: i64 = 10;
const TOP: i64 = 15;

const TITLE_PX: f32 = 16.0;
const TITLE_STEP: i64 = 18;
const MAX_TITLE_LINES: usize = 3;
const AUTHORS_PX: f32 = 11.0;
const TEXT_PX: f32 = 9.0;
const SMALL_PX: f32 = 8.0;
const MAX_FILLER_BARS: i64 = 8;

/// Advance per character, as a fraction of the pixel size, for [`Typeface::Blocks`].
const BLOCK_ADVANCE: f32 = 0.55;

const WHITE: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);
const SHADOW: Rgb<u8> = Rgb([0xf3, 0xf4, 0xf6]);
const BORDER: Rgb<u8> = Rgb([0xe5, 0xe7, 0xeb]);
const TITLE_COLOR: Rgb<u8> = Rgb([0x11, 0x18, 0x27]);
const AUTHORS_COLOR: Rgb<u8> = Rgb([0x37, 0x41, 0x51]);
const INSTITUTION_COLOR: Rgb<u8> = Rgb([0x6b, 0x72, 0x80]);
const BODY_COLOR: Rgb<u8> = Rgb([0x4b, 0x55, 0x63]);
const BAR_COLOR: Rgb<u8> = Rgb([0xd1, 0xd5, 0xdb]);
const BADGE_FILL: Rgb<u8> = Rgb([0xdc, 0x26, 0x26]);
const BADGE_OUTLINE: Rgb<u8> = Rgb([0xb9, 0x1c, 0x1c]);

// ── Text selection ──────────────────────────────────────────────────────────

/// Pick a title from page text.
///
/// Longer than 20 chars with a first sentence (split on `.`) longer than 10
/// chars: that sentence, cut at 60 chars plus `"..."`. Otherwise the first 10
/// words, cut at 50 chars plus `"..."`. Short or empty text gives
/// [`DEFAULT_TITLE`].
pub fn derive_title(text: &str) -> String {
    if text.chars().count() <= 20 {
        return DEFAULT_TITLE.to_string();
    }
    let first_sentence = text.split('.').next().unwrap_or(text);
    if first_sentence.chars().count() > 10 {
        return ellipsize(first_sentence, 60);
    }
    let words: Vec<&str> = text.split_whitespace().take(10).collect();
    ellipsize(&words.join(" "), 50)
}

/// Body text for the abstract block: everything after the first sentence.
pub fn abstract_text(text: &str) -> &str {
    let rest = text.split_once('.').map(|(_, r)| r.trim()).unwrap_or("");
    if rest.chars().count() < MIN_ABSTRACT_CHARS {
        DEFAULT_ABSTRACT
    } else {
        rest
    }
}

fn ellipsize(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", truncate_chars(s, max_chars))
    } else {
        s.to_string()
    }
}

/// Greedy word wrap: a line grows while its measured width stays below
/// `max_width`. A single word wider than the limit gets its own line.
pub fn wrap_words(text: &str, max_width: u32, measure: impl Fn(&str) -> u32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measure(&candidate) < max_width {
            current = candidate;
        } else if current.is_empty() {
            lines.push(word.to_string());
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

// ── Typeface ────────────────────────────────────────────────────────────────

/// Glyph source for the placeholder.
pub enum Typeface {
    /// A TrueType/OpenType font loaded from disk.
    Glyphs(FontVec),
    /// No font: words are drawn as solid bars.
    Blocks,
}

impl fmt::Debug for Typeface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Typeface::Glyphs(_) => f.write_str("Typeface::Glyphs"),
            Typeface::Blocks => f.write_str("Typeface::Blocks"),
        }
    }
}

impl Typeface {
    /// First candidate font that reads and parses, else [`Typeface::Blocks`].
    pub fn load(fonts: &FontConfig) -> Self {
        for path in &fonts.candidates {
            let Ok(bytes) = std::fs::read(path) else {
                continue;
            };
            if let Some(face) = Self::from_bytes(bytes) {
                debug!("Placeholder font: {}", path.display());
                return face;
            }
            debug!("Unparseable font file {}", path.display());
        }
        debug!("No placeholder font available; using block glyphs");
        Typeface::Blocks
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        FontVec::try_from_vec(bytes).ok().map(Typeface::Glyphs)
    }

    /// Rendered width of `text` at `px` pixels.
    pub fn measure(&self, text: &str, px: f32) -> u32 {
        match self {
            Typeface::Glyphs(font) => text_size(PxScale::from(px), font, text).0,
            Typeface::Blocks => (text.chars().count() as f32 * px * BLOCK_ADVANCE).round() as u32,
        }
    }

    /// Draw `text` with its top-left corner at `(x, y)`; clipped to the canvas.
    pub fn draw(&self, canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, px: f32, text: &str) {
        match self {
            Typeface::Glyphs(font) => {
                draw_text_mut(canvas, color, x, y, PxScale::from(px), font, text);
            }
            Typeface::Blocks => {
                let advance = px * BLOCK_ADVANCE;
                let bar_height = ((px * 0.5).round() as u32).max(1);
                let bar_y = y + (px * 0.3).round() as i32;
                let mut cursor = x as f32;
                for word in text.split(' ') {
                    let len = word.chars().count();
                    if len > 0 {
                        let width = ((len as f32 * advance).round() as u32).max(1);
                        let rect =
                            Rect::at(cursor.round() as i32, bar_y).of_size(width, bar_height);
                        draw_filled_rect_mut(canvas, rect, color);
                    }
                    cursor += (len + 1) as f32 * advance;
                }
            }
        }
    }
}

// ── Drawing ─────────────────────────────────────────────────────────────────

/// Fill the inclusive rectangle `[x0, y0] ..= [x1, y1]`.
fn fill_box(canvas: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    if let Some(rect) = inclusive_rect(x0, y0, x1, y1) {
        draw_filled_rect_mut(canvas, rect, color);
    }
}

fn outline_box(canvas: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    if let Some(rect) = inclusive_rect(x0, y0, x1, y1) {
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

fn inclusive_rect(x0: i64, y0: i64, x1: i64, y1: i64) -> Option<Rect> {
    if x1 < x0 || y1 < y0 {
        return None;
    }
    let width = u32::try_from(x1 - x0 + 1).ok()?;
    let height = u32::try_from(y1 - y0 + 1).ok()?;
    Some(Rect::at(i32::try_from(x0).ok()?, i32::try_from(y0).ok()?).of_size(width, height))
}

fn draw_centered(
    canvas: &mut RgbImage,
    typeface: &Typeface,
    text: &str,
    px: f32,
    y: i64,
    color: Rgb<u8>,
) {
    let x = (canvas.width() as i64 - typeface.measure(text, px) as i64) / 2;
    typeface.draw(canvas, color, x as i32, y as i32, px, text);
}

/// Render the placeholder for `text` at exactly `config.width × config.height`.
pub fn synthesize(text: &str, config: &ThumbnailConfig, typeface: &Typeface) -> RgbImage {
    let (width, height) = (config.width, config.height);
    let mut canvas = RgbImage::from_pixel(width, height, WHITE);
    if width < MIN_LAYOUT_WIDTH || height < MIN_LAYOUT_HEIGHT {
        debug!("Canvas {width}x{height} too small for placeholder layout");
        return canvas;
    }
    let (w, h) = (width as i64, height as i64);
    let text_width = (w - 2 * MARGIN) as u32;

    // paper and shadow
    fill_box(&mut canvas, 2, 2, w, h, SHADOW);
    fill_box(&mut canvas, 0, 0, w - 2, h - 2, WHITE);
    outline_box(&mut canvas, 0, 0, w - 2, h - 2, BORDER);

    let mut y = TOP;

    let title = derive_title(text);
    let title_lines = wrap_words(&title, text_width, |s| typeface.measure(s, TITLE_PX));
    for line in title_lines.iter().take(MAX_TITLE_LINES) {
        let x = (w - typeface.measure(line, TITLE_PX) as i64) / 2;
        for (dx, dy) in [(0, 0), (1, 0), (0, 1)] {
            typeface.draw(
                &mut canvas,
                TITLE_COLOR,
                (x + dx) as i32,
                (y + dy) as i32,
                TITLE_PX,
                line,
            );
        }
        y += TITLE_STEP;
    }
    y += 8;

    draw_centered(&mut canvas, typeface, DEFAULT_AUTHORS, AUTHORS_PX, y, AUTHORS_COLOR);
    y += 20;
    draw_centered(&mut canvas, typeface, DEFAULT_INSTITUTION, TEXT_PX, y, INSTITUTION_COLOR);
    y += 25;
    draw_centered(&mut canvas, typeface, "ABSTRACT", TEXT_PX, y, TITLE_COLOR);
    y += 18;

    let body = abstract_text(text);
    for line in wrap_words(body, text_width, |s| typeface.measure(s, SMALL_PX)) {
        if y > h - 30 {
            break;
        }
        typeface.draw(&mut canvas, BODY_COLOR, MARGIN as i32, y as i32, SMALL_PX, &line);
        y += LINE_HEIGHT;
    }

    let remaining = ((h - y - 20) / LINE_HEIGHT).clamp(0, MAX_FILLER_BARS);
    for i in 0..remaining {
        let bar_width = w - 2 * MARGIN - (i % 3) * 15;
        if bar_width > 0 {
            fill_box(&mut canvas, MARGIN, y + 3, MARGIN + bar_width, y + 4, BAR_COLOR);
        }
        y += LINE_HEIGHT;
    }

    let badge_x = w - 30;
    let badge_y = 8;
    fill_box(&mut canvas, badge_x, badge_y, badge_x + 22, badge_y + 12, BADGE_FILL);
    outline_box(&mut canvas, badge_x, badge_y, badge_x + 22, badge_y + 12, BADGE_OUTLINE);
    typeface.draw(
        &mut canvas,
        WHITE,
        (badge_x + 2) as i32,
        (badge_y + 1) as i32,
        SMALL_PX,
        "PDF",
    );

    canvas
}
