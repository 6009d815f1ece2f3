//! SIMD-accelerated kernels using the `wide` crate.
//!
//! The inner reference-row loop is vectorized to process 4 samples at a time
//! using `f64x4`, keeping the double-precision accumulation of the scalar
//! kernels. Reduction order differs from the scalar path, so scores agree to
//! rounding rather than bit-for-bit.

use crate::correlation::ReferencePlan;
use crate::kernel::{coefficient_score, correlation_score, Kernel};
use crate::ImageView;
use wide::f64x4;

const LANES: usize = 4;

#[inline]
fn load_f32x4_as_f64x4(slice: &[f32]) -> f64x4 {
    f64x4::from([
        slice[0] as f64,
        slice[1] as f64,
        slice[2] as f64,
        slice[3] as f64,
    ])
}

#[inline]
fn hsum(v: f64x4) -> f64 {
    let arr = v.to_array();
    arr[0] + arr[1] + arr[2] + arr[3]
}

/// SIMD normalised cross-correlation coefficient kernel.
pub struct CoefficientSimd;

/// SIMD normalised cross-correlation kernel.
pub struct CorrelationSimd;

impl Kernel for CoefficientSimd {
    fn score_at(target: ImageView<'_, f32>, plan: &ReferencePlan, x: usize, y: usize) -> f32 {
        let ref_width = plan.width();
        let reference = plan.data();
        let simd_end = ref_width / LANES * LANES;

        let mut sum_vec = f64x4::ZERO;
        let mut sum_square_vec = f64x4::ZERO;
        let mut covariance_vec = f64x4::ZERO;
        let mut sum = 0.0f64;
        let mut sum_square = 0.0f64;
        let mut covariance = 0.0f64;

        for j in 0..plan.height() {
            let row = &target.as_slice()[(y + j) * target.stride() + x..][..ref_width];
            let ref_row = &reference[j * ref_width..][..ref_width];

            let mut i = 0;
            while i < simd_end {
                let values_i = load_f32x4_as_f64x4(&row[i..]);
                let values_t = load_f32x4_as_f64x4(&ref_row[i..]);
                sum_vec += values_i;
                sum_square_vec += values_i * values_i;
                covariance_vec += values_i * values_t;
                i += LANES;
            }
            while i < ref_width {
                let value_i = row[i] as f64;
                sum += value_i;
                sum_square += value_i * value_i;
                covariance += value_i * ref_row[i] as f64;
                i += 1;
            }
        }

        coefficient_score(
            plan,
            hsum(sum_vec) + sum,
            hsum(sum_square_vec) + sum_square,
            hsum(covariance_vec) + covariance,
        )
    }
}

impl Kernel for CorrelationSimd {
    fn score_at(target: ImageView<'_, f32>, plan: &ReferencePlan, x: usize, y: usize) -> f32 {
        let ref_width = plan.width();
        let reference = plan.data();
        let simd_end = ref_width / LANES * LANES;

        let mut square_sum_vec = f64x4::ZERO;
        let mut covariance_vec = f64x4::ZERO;
        let mut square_sum = 0.0f64;
        let mut covariance = 0.0f64;

        for j in 0..plan.height() {
            let row = &target.as_slice()[(y + j) * target.stride() + x..][..ref_width];
            let ref_row = &reference[j * ref_width..][..ref_width];

            let mut i = 0;
            while i < simd_end {
                let values_i = load_f32x4_as_f64x4(&row[i..]);
                let values_t = load_f32x4_as_f64x4(&ref_row[i..]);
                square_sum_vec += values_i * values_i;
                covariance_vec += values_i * values_t;
                i += LANES;
            }
            while i < ref_width {
                let value_i = row[i] as f64;
                square_sum += value_i * value_i;
                covariance += value_i * ref_row[i] as f64;
                i += 1;
            }
        }

        correlation_score(
            plan,
            hsum(square_sum_vec) + square_sum,
            hsum(covariance_vec) + covariance,
        )
    }
}
