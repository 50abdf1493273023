//! Rasterization strategy resolution: page 1 → [`RasterFrame`].
//!
//! ## Why an ordered list of strategies?
//!
//! The rasterizer is an optional external capability. It may be bundled next
//! to the service, installed in one of several well-known places, or only
//! reachable through the system search path. Each of those is one
//! [`PageRasterizer`] and the resolver walks them in order until one yields a
//! frame. A strategy that is not installed, crashes, or produces zero pages is
//! just a failed attempt; nothing escapes [`RasterStrategyResolver::resolve`].
//!
//! ## Why cap pixels as well as DPI?
//!
//! Page sizes vary wildly: an A0 poster at 300 DPI would produce a
//! 10,000 × 14,000 px image. `max_rendered_pixels` caps the longest edge
//! regardless of physical size, keeping memory bounded while a letter-size
//! page still renders at full 300 DPI.

use crate::backend::{self, PageRasterizer};
use crate::config::RasterizerConfig;
use crate::error::{Degradation, RasterError};
use crate::frame::RasterFrame;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Only the first page is ever rendered.
pub const FIRST_PAGE: u16 = 1;

/// One failed strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterAttempt {
    pub strategy: String,
    pub error: RasterError,
}

/// Result of walking every strategy.
#[derive(Debug)]
pub enum RasterOutcome {
    /// A strategy produced a frame for page 1.
    Rendered { frame: RasterFrame, strategy: String },
    /// Every strategy failed (or none was configured).
    Unavailable { attempts: Vec<RasterAttempt> },
}

impl RasterOutcome {
    /// The degradation recorded when the placeholder branch is taken.
    pub fn unavailable_degradation(attempts: &[RasterAttempt]) -> Degradation {
        Degradation::RasterizationUnavailable {
            attempts: attempts.len(),
            last_error: attempts
                .last()
                .map(|a| format!("{}: {}", a.strategy, a.error))
                .unwrap_or_else(|| "no rasterizer configured".to_string()),
        }
    }
}

/// Ordered rasterization strategies plus the DPI to render at.
#[derive(Clone)]
pub struct RasterStrategyResolver {
    strategies: Vec<Arc<dyn PageRasterizer>>,
    dpi: u32,
}

impl fmt::Debug for RasterStrategyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterStrategyResolver")
            .field(
                "strategies",
                &self.strategies.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("dpi", &self.dpi)
            .finish()
    }
}

impl RasterStrategyResolver {
    /// Every (location × backend) pair from `config`, location-major.
    pub fn from_config(config: &RasterizerConfig) -> Self {
        Self {
            strategies: backend::rasterizers_from_config(config),
            dpi: config.dpi,
        }
    }

    /// Use exactly these strategies, in this order.
    pub fn with_strategies(strategies: Vec<Arc<dyn PageRasterizer>>, dpi: u32) -> Self {
        Self { strategies, dpi }
    }

    pub fn strategies(&self) -> &[Arc<dyn PageRasterizer>] {
        &self.strategies
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Try each strategy in order; the first frame wins.
    pub fn resolve(&self, pdf_path: &Path) -> RasterOutcome {
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            let name = strategy.name();
            debug!("Trying rasterizer {name} at {} DPI", self.dpi);

            let result = catch_unwind(AssertUnwindSafe(|| {
                strategy.rasterize(pdf_path, FIRST_PAGE, self.dpi)
            }))
            .unwrap_or_else(|_| Err(RasterError::Failed(format!("{name} panicked"))));

            match result {
                Ok(frame) => {
                    info!(
                        "Rasterized page {} with {} ({}x{} px)",
                        FIRST_PAGE,
                        name,
                        frame.width(),
                        frame.height()
                    );
                    return RasterOutcome::Rendered {
                        frame,
                        strategy: name,
                    };
                }
                Err(RasterError::Unavailable(detail)) => {
                    debug!("Rasterizer {name} unavailable: {detail}");
                    attempts.push(RasterAttempt {
                        strategy: name,
                        error: RasterError::Unavailable(detail),
                    });
                }
                Err(error) => {
                    warn!("Rasterizer {name} failed: {error}");
                    attempts.push(RasterAttempt {
                        strategy: name,
                        error,
                    });
                }
            }
        }

        warn!(
            "No rasterizer produced page {} of {} ({} attempts)",
            FIRST_PAGE,
            pdf_path.display(),
            attempts.len()
        );
        RasterOutcome::Unavailable { attempts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        name: &'static str,
        result: Result<(u32, u32), RasterError>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(name: &'static str, result: Result<(u32, u32), RasterError>) -> Arc<Self> {
            Arc::new(Self {
                name,
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl PageRasterizer for Fixed {
        fn name(&self) -> String {
            self.name.to_string()
        }

        fn rasterize(&self, _: &Path, page: u16, dpi: u32) -> Result<RasterFrame, RasterError> {
            assert_eq!(page, FIRST_PAGE);
            assert_eq!(dpi, 300);
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map(|(w, h)| {
                RasterFrame::new(RgbImage::from_pixel(w, h, Rgb([0, 0, 0]))).unwrap()
            })
        }
    }

    struct Panics;

    impl PageRasterizer for Panics {
        fn name(&self) -> String {
            "panics".into()
        }

        fn rasterize(&self, _: &Path, _: u16, _: u32) -> Result<RasterFrame, RasterError> {
            panic!("backend blew up")
        }
    }

    #[test]
    fn first_success_wins_and_later_strategies_are_skipped() {
        let a = Fixed::new("a", Err(RasterError::Unavailable("not installed".into())));
        let b = Fixed::new("b", Ok((10, 20)));
        let c = Fixed::new("c", Ok((30, 40)));
        let resolver = RasterStrategyResolver::with_strategies(
            vec![a.clone(), b.clone(), c.clone()],
            300,
        );

        match resolver.resolve(Path::new("doc.pdf")) {
            RasterOutcome::Rendered { frame, strategy } => {
                assert_eq!(strategy, "b");
                assert_eq!(frame.dimensions(), (10, 20));
            }
            other => panic!("expected a frame, got {other:?}"),
        }
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn zero_pages_is_a_failed_attempt() {
        let a = Fixed::new("a", Err(RasterError::NoPages));
        let b = Fixed::new("b", Ok((5, 5)));
        let resolver = RasterStrategyResolver::with_strategies(vec![a, b], 300);
        assert!(matches!(
            resolver.resolve(Path::new("doc.pdf")),
            RasterOutcome::Rendered { .. }
        ));
    }

    #[test]
    fn all_failures_are_reported_in_order() {
        let resolver = RasterStrategyResolver::with_strategies(
            vec![
                Fixed::new("a", Err(RasterError::Unavailable("x".into()))),
                Arc::new(Panics),
                Fixed::new("c", Err(RasterError::Failed("bad xref".into()))),
            ],
            300,
        );
        let RasterOutcome::Unavailable { attempts } = resolver.resolve(Path::new("doc.pdf"))
        else {
            panic!("expected unavailable");
        };
        let names: Vec<_> = attempts.iter().map(|a| a.strategy.as_str()).collect();
        assert_eq!(names, ["a", "panics", "c"]);
        assert!(matches!(attempts[1].error, RasterError::Failed(_)));

        let degradation = RasterOutcome::unavailable_degradation(&attempts);
        assert_eq!(
            degradation,
            Degradation::RasterizationUnavailable {
                attempts: 3,
                last_error: "c: bad xref".into(),
            }
        );
    }

    #[test]
    fn no_strategies_is_unavailable() {
        let resolver = RasterStrategyResolver::with_strategies(Vec::new(), 300);
        let RasterOutcome::Unavailable { attempts } = resolver.resolve(Path::new("doc.pdf"))
        else {
            panic!("expected unavailable");
        };
        assert!(attempts.is_empty());
        assert!(RasterOutcome::unavailable_degradation(&attempts)
            .to_string()
            .contains("no rasterizer configured"));
    }
}
