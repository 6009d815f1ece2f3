//! Correlation kernel implementations.

use crate::correlation::ReferencePlan;
use crate::ImageView;

/// Scoring formula used for every candidate shift.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CorrelationMode {
    /// Normalised cross-correlation coefficient (Pearson-style, mean removed).
    #[default]
    Coefficient,
    /// Normalised cross-correlation without mean removal.
    Correlation,
}

/// Kernel trait for scoring reference placements inside a target.
///
/// `x` and `y` are the top-left corner of the reference window inside the
/// target; callers guarantee the window is in bounds.
pub trait Kernel {
    /// Computes the score of a single placement.
    fn score_at(target: ImageView<'_, f32>, plan: &ReferencePlan, x: usize, y: usize) -> f32;

    /// Fills one row of a correlation map: `out[r]` is the score at `(r, s)`.
    fn score_row(target: ImageView<'_, f32>, plan: &ReferencePlan, s: usize, out: &mut [f32]) {
        for (r, slot) in out.iter_mut().enumerate() {
            *slot = Self::score_at(target, plan, r, s);
        }
    }
}

/// Finalises a coefficient score from the window reductions.
#[inline]
pub(crate) fn coefficient_score(
    plan: &ReferencePlan,
    sum: f64,
    sum_square: f64,
    covariance: f64,
) -> f32 {
    let pixels = plan.len() as f64;
    let mean_i = sum / pixels;
    let numerator = covariance - pixels * mean_i * plan.mean();
    let denominator = (sum_square - pixels * mean_i * mean_i).sqrt() * plan.sigma();
    (numerator / denominator) as f32
}

/// Finalises a correlation score; infinite scores are clamped to zero.
#[inline]
pub(crate) fn correlation_score(plan: &ReferencePlan, square_sum: f64, covariance: f64) -> f32 {
    let score = (covariance / (square_sum * plan.square_sum()).sqrt()) as f32;
    if score.is_infinite() {
        0.0
    } else {
        score
    }
}

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;
