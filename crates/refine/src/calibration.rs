//! Per-pass projection amount calibration.
//!
//! Each remesh pass blends vertices toward the target by the same factor
//! `p`. Repeating that `N` times compounds:
//! ```text
//!   acc_0 = 0
//!   acc_k = p + acc_{k-1} * (1 - p)
//! ```
//! so a requested total amount `A` cannot be split evenly across passes.
//! The calibrator searches a fixed grid of `p` values for the one whose
//! `acc_N` lands closest to `A`.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// First grid value
pub const GRID_START: f64 = -0.1;

/// Grid spacing
pub const GRID_STEP: f64 = 0.005;

/// Number of grid values; the grid covers `[-0.1, 1.1)`
pub const GRID_SAMPLES: usize = 240;

/// Result of a calibration search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassCalibration {
    /// Blend factor to apply on every pass
    pub per_pass_amount: f64,
    /// Total amount reached after all passes with that factor
    pub achieved_amount: f64,
    /// `|achieved_amount - requested|`
    pub error: f64,
}

/// Grid search for the per-pass blend factor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassCalibrator;

impl PassCalibrator {
    pub fn new() -> Self {
        Self
    }

    /// Grid value `i`, computed from the index to avoid accumulated drift
    pub fn grid_value(i: usize) -> f64 {
        GRID_START + GRID_STEP * i as f64
    }

    /// All candidate per-pass factors in ascending order
    pub fn grid() -> impl Iterator<Item = f64> {
        (0..GRID_SAMPLES).map(Self::grid_value)
    }

    /// Total amount after `passes` applications of factor `p`
    pub fn accumulated_amount(p: f64, passes: usize) -> f64 {
        let mut acc = 0.0;
        for _ in 0..passes {
            acc = p + acc * (1.0 - p);
        }
        acc
    }

    /// Pick the grid factor whose accumulation over `passes` is closest to
    /// `total`. The first (lowest) factor wins ties.
    pub fn calibrate(&self, total: f64, passes: usize) -> PassCalibration {
        let mut best_p = Self::grid_value(0);
        let mut best_acc = Self::accumulated_amount(best_p, passes);
        let mut best_error = (best_acc - total).abs();

        for p in Self::grid().skip(1) {
            let acc = Self::accumulated_amount(p, passes);
            let error = (acc - total).abs();
            if error < best_error {
                best_p = p;
                best_acc = acc;
                best_error = error;
            }
        }

        debug!(
            "calibrated per-pass amount {:.3} over {} passes: {:.6} (target {:.6})",
            best_p, passes, best_acc, total
        );

        PassCalibration {
            per_pass_amount: best_p,
            achieved_amount: best_acc,
            error: best_error,
        }
    }
}
