//! Pipeline stages for PDF-to-thumbnail generation.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different rasterizer backend) without
//! touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ detect ──▶ composite ──▶ enhance ──▶ encode
//! (path)    (page 1)   (bbox)     (w × h)       (sharpen)   (JPEG 95)
//!              │
//!              └─ unavailable ──▶ text ──▶ placeholder ──▶ encode
//! ```
//!
//! 1. [`input`]: validate the source path, capture its mtime
//! 2. [`render`]: walk rasterizer strategies until one yields page 1
//! 3. [`detect`]: content bounding box on the luminance plane
//! 4. [`composite`]: scale to width, crop/pad to exact size
//! 5. [`enhance`]: unsharp mask and a mild contrast boost
//! 6. [`text`] and [`placeholder`]: synthetic page when nothing rendered
//! 7. [`encode`]: JPEG encode and atomic write

pub mod composite;
pub mod detect;
pub mod encode;
pub mod enhance;
pub mod input;
pub mod placeholder;
pub mod render;
pub mod text;
