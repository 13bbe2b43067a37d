//! Grayscale-to-binary thresholding.
//!
//! In target-transparency mode every frame is solved on its own: a Newton
//! iteration on the empirical exceedance `frac(g > t)` finds the threshold
//! `t` that opens the requested fraction of pixels. Because each frame
//! retargets the same ratio, the open area stays steady even while the noise
//! statistics drift from frame to frame.

use crate::config::{SolverCfg, ThresholdPolicy};
use crate::image::{BinaryImage, GrayImage};

/// Half-width of the central difference used for the slope estimate.
const SLOPE_H: f64 = 0.01;

/// Outcome of one frame's threshold selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    /// Pixels with grayscale strictly above this value are open.
    pub threshold: f64,
    /// Achieved open-pixel fraction at `threshold`.
    pub transparency: f64,
    pub iterations: u32,
    /// False when the solver hit `max_iter`; `threshold` is then the best seen.
    pub converged: bool,
}

/// Threshold policy fixed for a whole generation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdSolver {
    policy: ThresholdPolicy,
    cfg: SolverCfg,
}

impl ThresholdSolver {
    pub fn new(policy: ThresholdPolicy, cfg: SolverCfg) -> Self {
        Self { policy, cfg }
    }

    #[inline]
    pub fn policy(&self) -> ThresholdPolicy {
        self.policy
    }

    pub fn solve(&self, img: &GrayImage) -> Solution {
        match self.policy {
            ThresholdPolicy::Constant(bw) => {
                let threshold = 1.0 - bw;
                Solution {
                    threshold,
                    transparency: img.exceedance(threshold),
                    iterations: 0,
                    converged: true,
                }
            }
            ThresholdPolicy::TargetTransparency(target) => {
                solve_target(|t| img.exceedance(t), target, &self.cfg)
            }
        }
    }

    pub fn binarize(&self, img: &GrayImage) -> (BinaryImage, Solution) {
        let sol = self.solve(img);
        (BinaryImage::from_gray(img, sol.threshold), sol)
    }
}

/// Newton solve of `frac(t) = target` for a non-increasing `frac` on [0, 1].
///
/// The bracket `[lo, hi]` shrinks with every evaluation. Bisection takes over
/// when the slope estimate is flat (or has the wrong sign) or the Newton step
/// would leave the bracket. After `max_iter` evaluations the best threshold
/// seen is returned with `converged = false`.
pub fn solve_target(frac: impl Fn(f64) -> f64, target: f64, cfg: &SolverCfg) -> Solution {
    let mut lo = 0.0f64;
    let mut hi = 1.0f64;
    let mut t = (1.0 - target).clamp(0.0, 1.0);

    let mut best = Solution {
        threshold: t,
        transparency: f64::NAN,
        iterations: 0,
        converged: false,
    };
    let mut best_err = f64::INFINITY;

    for it in 1..=cfg.max_iter.max(1) {
        let f = frac(t);
        let err = f - target;
        if err.abs() < best_err {
            best_err = err.abs();
            best.threshold = t;
            best.transparency = f;
        }
        if err.abs() <= cfg.tolerance {
            return Solution {
                threshold: t,
                transparency: f,
                iterations: it,
                converged: true,
            };
        }

        // Too many open pixels -> the threshold must go up
        if err > 0.0 {
            lo = t;
        } else {
            hi = t;
        }

        let a = (t - SLOPE_H).max(0.0);
        let b = (t + SLOPE_H).min(1.0);
        let slope = if b > a {
            (frac(b) - frac(a)) / (b - a)
        } else {
            0.0
        };

        let newton = if slope < 0.0 { t - err / slope } else { f64::NAN };
        t = if newton > lo && newton < hi {
            newton
        } else {
            0.5 * (lo + hi)
        };
    }

    best.iterations = cfg.max_iter.max(1);
    best
}
