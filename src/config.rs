//! Configuration types for thumbnail generation.
//!
//! Two structs split the knobs by lifetime:
//!
//! * [`ThumbnailConfig`]: what the caller wants *this* thumbnail to look
//!   like (size, quality). Supplied per invocation.
//! * [`PipelineConfig`]: how the generator finds its collaborators
//!   (rasterizer installations, fonts, detector). Supplied once when a
//!   [`crate::ThumbnailGenerator`] is constructed.
//!
//! Neither is global: every generator owns its own copy, so two generators
//! with different installations can run side by side in one process.

use crate::error::ThumbnailError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// JPEG quality used for every encoded thumbnail.
///
/// [`ThumbnailConfig::quality`] is validated and reported but does not
/// change the encoder setting; see `DESIGN.md`.
pub const ENCODE_QUALITY: u8 = 95;

/// Target output for a single thumbnail.
///
/// # Example
/// ```rust
/// use pdfthumb::ThumbnailConfig;
///
/// let config = ThumbnailConfig::builder()
///     .width(800)
///     .height(600)
///     .build()
///     .unwrap();
/// assert_eq!((config.width, config.height), (800, 600));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    /// Output width in pixels. Default: 400.
    pub width: u32,

    /// Output height in pixels. Default: 250.
    pub height: u32,

    /// Requested JPEG quality, 1–100. Default: 85.
    ///
    /// Informational: the encoder always uses [`ENCODE_QUALITY`].
    pub quality: u8,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            width: 400,
            height: 250,
            quality: 85,
        }
    }
}

impl ThumbnailConfig {
    /// Create a new builder for `ThumbnailConfig`.
    pub fn builder() -> ThumbnailConfigBuilder {
        ThumbnailConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check the invariants a hand-built (or deserialised) config must hold.
    pub fn validate(&self) -> Result<(), ThumbnailError> {
        if self.width == 0 || self.height == 0 {
            return Err(ThumbnailError::InvalidConfig(format!(
                "thumbnail size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(ThumbnailError::InvalidConfig(format!(
                "quality must be 1–100, got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

/// Builder for [`ThumbnailConfig`].
#[derive(Debug)]
pub struct ThumbnailConfigBuilder {
    config: ThumbnailConfig,
}

impl ThumbnailConfigBuilder {
    pub fn width(mut self, width: u32) -> Self {
        self.config.width = width;
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.config.height = height;
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.config.quality = quality;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ThumbnailConfig, ThumbnailError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Pipeline configuration ───────────────────────────────────────────────

/// A rasterization/text backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The pdfium shared library, via `pdfium-render`.
    Pdfium,
    /// poppler's `pdftoppm` / `pdftotext` command-line tools.
    Poppler,
}

/// Where a backend should be looked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    /// A directory holding the pdfium library or the poppler binaries.
    Dir(PathBuf),
    /// The platform's default search (dynamic loader path / `PATH`).
    System,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Dir(p) => write!(f, "{}", p.display()),
            Location::System => f.write_str("system default"),
        }
    }
}

/// Bounding-box implementation used for content analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    /// Single pass building row/column content masks (default).
    #[default]
    Vectorized,
    /// Edge-inward pixel scans; slower, same result.
    Naive,
}

/// How the rasterization strategy list is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterizerConfig {
    /// Explicit local installation, tried before anything else.
    pub local_installation: Option<PathBuf>,

    /// Known installation directories, tried in order after the local one.
    pub candidate_paths: Vec<PathBuf>,

    /// Finish with the system search path. Default: true.
    pub use_system_default: bool,

    /// Backends tried at every location, in order. Default: pdfium, poppler.
    pub backends: Vec<Backend>,

    /// Rendering DPI. Range: 72–600. Default: 300.
    pub dpi: u32,

    /// Cap on the longest rendered edge in pixels. Default: 6000.
    ///
    /// An A0 poster at 300 DPI would otherwise allocate ~10k × 14k pixels.
    pub max_rendered_pixels: u32,
}

impl Default for RasterizerConfig {
    fn default() -> Self {
        Self {
            local_installation: None,
            candidate_paths: default_candidate_paths(),
            use_system_default: true,
            backends: vec![Backend::Pdfium, Backend::Poppler],
            dpi: 300,
            max_rendered_pixels: 6000,
        }
    }
}

impl RasterizerConfig {
    /// Read the explicit local installation from the environment.
    ///
    /// `PDFTHUMB_RASTERIZER_PATH` wins; `PDFIUM_LIB_PATH` (a library file or
    /// directory) and `POPPLER_PATH` are honoured as fallbacks.
    pub fn from_env() -> Self {
        let local = ["PDFTHUMB_RASTERIZER_PATH", "PDFIUM_LIB_PATH", "POPPLER_PATH"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.is_empty())
            .map(PathBuf::from);
        Self {
            local_installation: local,
            ..Self::default()
        }
    }

    /// The ordered list of locations the resolver walks.
    pub fn locations(&self) -> Vec<Location> {
        let mut locations: Vec<Location> = Vec::new();
        let dirs = self
            .local_installation
            .iter()
            .chain(self.candidate_paths.iter());
        for dir in dirs {
            let loc = Location::Dir(dir.clone());
            if !locations.contains(&loc) {
                locations.push(loc);
            }
        }
        if self.use_system_default {
            locations.push(Location::System);
        }
        locations
    }
}

/// Built-in installation directories probed after the local installation.
pub fn default_candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("poppler/bin"),
        PathBuf::from("pdfium/lib"),
    ];
    if let Some(cache) = dirs::cache_dir() {
        paths.push(cache.join("pdfthumb").join("pdfium"));
    }
    if cfg!(windows) {
        paths.extend([
            PathBuf::from(r"C:\Program Files\poppler\bin"),
            PathBuf::from(r"C:\Program Files (x86)\poppler\bin"),
            PathBuf::from(r"C:\poppler\bin"),
        ]);
    } else {
        paths.extend([
            PathBuf::from("/opt/homebrew/bin"),
            PathBuf::from("/opt/homebrew/lib"),
            PathBuf::from("/usr/local/bin"),
            PathBuf::from("/usr/local/lib"),
            PathBuf::from("/opt/pdfium/lib"),
        ]);
    }
    paths
}

/// Font files tried, in order, for the placeholder thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontConfig {
    pub candidates: Vec<PathBuf>,
}

impl Default for FontConfig {
    fn default() -> Self {
        let mut candidates = Vec::new();
        let names = [
            "DejaVuSans.ttf",
            "LiberationSans-Regular.ttf",
            "Arial.ttf",
            "arial.ttf",
            "Helvetica.ttc",
        ];
        if let Some(user_fonts) = dirs::font_dir() {
            candidates.extend(names.iter().map(|n| user_fonts.join(n)));
        }
        if cfg!(windows) {
            candidates.push(PathBuf::from(r"C:\Windows\Fonts\arial.ttf"));
        } else {
            candidates.extend([
                PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
                PathBuf::from("/usr/share/fonts/TTF/DejaVuSans.ttf"),
                PathBuf::from("/usr/share/fonts/dejavu/DejaVuSans.ttf"),
                PathBuf::from("/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf"),
                PathBuf::from("/Library/Fonts/Arial.ttf"),
                PathBuf::from("/System/Library/Fonts/Supplemental/Arial.ttf"),
            ]);
        }
        Self { candidates }
    }
}

impl FontConfig {
    /// No font files: the placeholder draws greeked text bars.
    pub fn none() -> Self {
        Self {
            candidates: Vec::new(),
        }
    }
}

/// Generator-wide settings.
///
/// Built via [`PipelineConfig::builder()`] or [`PipelineConfig::default()`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub rasterizer: RasterizerConfig,

    /// Bounding-box implementation. Default: [`DetectorKind::Vectorized`].
    pub detector: DetectorKind,

    pub fonts: FontConfig,

    /// Upper bound on extracted characters fed to the placeholder. Default: 1000.
    pub text_char_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rasterizer: RasterizerConfig::default(),
            detector: DetectorKind::default(),
            fonts: FontConfig::default(),
            text_char_limit: 1000,
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check DPI range and that at least one backend is configured.
    pub fn validate(&self) -> Result<(), ThumbnailError> {
        let r = &self.rasterizer;
        if r.dpi < 72 || r.dpi > 600 {
            return Err(ThumbnailError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                r.dpi
            )));
        }
        if r.backends.is_empty() {
            return Err(ThumbnailError::InvalidConfig(
                "at least one rasterizer backend is required".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn local_installation(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.rasterizer.local_installation = Some(path.into());
        self
    }

    pub fn candidate_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.config.rasterizer.candidate_paths = paths;
        self
    }

    pub fn use_system_default(mut self, v: bool) -> Self {
        self.config.rasterizer.use_system_default = v;
        self
    }

    pub fn backends(mut self, backends: Vec<Backend>) -> Self {
        self.config.rasterizer.backends = backends;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.rasterizer.dpi = dpi;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.rasterizer.max_rendered_pixels = px.max(100);
        self
    }

    pub fn detector(mut self, kind: DetectorKind) -> Self {
        self.config.detector = kind;
        self
    }

    pub fn fonts(mut self, fonts: FontConfig) -> Self {
        self.config.fonts = fonts;
        self
    }

    pub fn text_char_limit(mut self, n: usize) -> Self {
        self.config.text_char_limit = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, ThumbnailError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumbnail_defaults() {
        let c = ThumbnailConfig::default();
        assert_eq!((c.width, c.height, c.quality), (400, 250, 85));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn builder_rejects_zero_size() {
        let err = ThumbnailConfig::builder().width(0).build().unwrap_err();
        assert!(err.to_string().contains("non-zero"), "got: {err}");
    }

    #[test]
    fn builder_rejects_out_of_range_quality() {
        assert!(ThumbnailConfig::builder().quality(0).build().is_err());
        assert!(ThumbnailConfig::builder().quality(101).build().is_err());
        assert!(ThumbnailConfig::builder().quality(100).build().is_ok());
    }

    #[test]
    fn locations_order_local_then_candidates_then_system() {
        let cfg = RasterizerConfig {
            local_installation: Some(PathBuf::from("/opt/local")),
            candidate_paths: vec![PathBuf::from("/a"), PathBuf::from("/opt/local")],
            ..RasterizerConfig::default()
        };
        assert_eq!(
            cfg.locations(),
            vec![
                Location::Dir(PathBuf::from("/opt/local")),
                Location::Dir(PathBuf::from("/a")),
                Location::System,
            ]
        );
    }

    #[test]
    fn locations_without_system_default() {
        let cfg = RasterizerConfig {
            candidate_paths: vec![],
            use_system_default: false,
            ..RasterizerConfig::default()
        };
        assert!(cfg.locations().is_empty());
    }

    #[test]
    fn pipeline_builder_validates_dpi_and_backends() {
        assert!(PipelineConfig::builder().dpi(50).build().is_err());
        assert!(PipelineConfig::builder().backends(vec![]).build().is_err());
        let cfg = PipelineConfig::builder()
            .dpi(150)
            .detector(DetectorKind::Naive)
            .build()
            .unwrap();
        assert_eq!(cfg.rasterizer.dpi, 150);
        assert_eq!(cfg.detector, DetectorKind::Naive);
    }

    #[test]
    fn thumbnail_config_json_roundtrip_shape() {
        let json = serde_json::to_value(ThumbnailConfig::default()).unwrap();
        assert_eq!(json["width"], 400);
        assert_eq!(json["height"], 250);
        assert_eq!(json["quality"], 85);
    }
}
