//! Scalar reference kernels for score evaluation.

use crate::correlation::ReferencePlan;
use crate::kernel::{coefficient_score, correlation_score, Kernel};
use crate::ImageView;

/// Scalar normalised cross-correlation coefficient kernel.
pub struct CoefficientScalar;

/// Scalar normalised cross-correlation kernel.
pub struct CorrelationScalar;

impl Kernel for CoefficientScalar {
    fn score_at(target: ImageView<'_, f32>, plan: &ReferencePlan, x: usize, y: usize) -> f32 {
        let ref_width = plan.width();
        let reference = plan.data();

        let mut sum = 0.0f64;
        let mut sum_square = 0.0f64;
        let mut covariance = 0.0f64;
        for j in 0..plan.height() {
            let row = &target.as_slice()[(y + j) * target.stride() + x..][..ref_width];
            let ref_row = &reference[j * ref_width..][..ref_width];
            for (&value_i, &value_t) in row.iter().zip(ref_row) {
                let value_i = value_i as f64;
                sum += value_i;
                sum_square += value_i * value_i;
                covariance += value_i * value_t as f64;
            }
        }

        coefficient_score(plan, sum, sum_square, covariance)
    }
}

impl Kernel for CorrelationScalar {
    fn score_at(target: ImageView<'_, f32>, plan: &ReferencePlan, x: usize, y: usize) -> f32 {
        let ref_width = plan.width();
        let reference = plan.data();

        let mut square_sum = 0.0f64;
        let mut covariance = 0.0f64;
        for j in 0..plan.height() {
            let row = &target.as_slice()[(y + j) * target.stride() + x..][..ref_width];
            let ref_row = &reference[j * ref_width..][..ref_width];
            for (&value_i, &value_t) in row.iter().zip(ref_row) {
                let value_i = value_i as f64;
                covariance += value_i * value_t as f64;
                square_sum += value_i * value_i;
            }
        }

        correlation_score(plan, square_sum, covariance)
    }
}

#[cfg(test)]
mod tests {
    use super::{CoefficientScalar, CorrelationScalar};
    use crate::correlation::ReferencePlan;
    use crate::image::{extract, Rect};
    use crate::kernel::{correlation_score, Kernel};
    use crate::ImageView;

    fn textured(width: usize, height: usize) -> Vec<f32> {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push((((x * 17 + y * 9 + x * y) & 0xFF) as f32) + 1.0);
            }
        }
        data
    }

    #[test]
    fn coefficient_matches_bruteforce_pearson() {
        let (width, height) = (9, 7);
        let image = textured(width, height);
        let view = ImageView::from_slice(&image, width, height).unwrap();
        let reference = extract(view, Rect::new(2, 1, 4, 3)).unwrap();
        let plan = ReferencePlan::from_image(reference.clone());

        let (x, y) = (3, 2);
        let window = extract(view, Rect::new(x as isize, y as isize, 4, 3)).unwrap();
        let n = 12.0f64;
        let mean_i = window.data().iter().map(|&v| v as f64).sum::<f64>() / n;
        let mean_t = reference.data().iter().map(|&v| v as f64).sum::<f64>() / n;
        let mut cov = 0.0;
        let mut var_i = 0.0;
        let mut var_t = 0.0;
        for (&a, &b) in window.data().iter().zip(reference.data()) {
            let (da, db) = (a as f64 - mean_i, b as f64 - mean_t);
            cov += da * db;
            var_i += da * da;
            var_t += db * db;
        }
        let expected = cov / (var_i.sqrt() * var_t.sqrt());

        let score = <CoefficientScalar as Kernel>::score_at(view, &plan, x, y);
        assert!((score as f64 - expected).abs() < 1e-5);
    }

    #[test]
    fn coefficient_self_match_is_one() {
        let (width, height) = (8, 8);
        let image = textured(width, height);
        let view = ImageView::from_slice(&image, width, height).unwrap();
        let plan = ReferencePlan::from_image(extract(view, Rect::new(2, 2, 4, 4)).unwrap());
        let score = <CoefficientScalar as Kernel>::score_at(view, &plan, 2, 2);
        assert!((score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn correlation_clamps_infinite_scores() {
        let reference = vec![1.0f32; 4];
        let plan = ReferencePlan::from_view(ImageView::from_slice(&reference, 2, 2).unwrap()).unwrap();
        assert_eq!(correlation_score(&plan, 0.0, 1.0), 0.0);
        assert_eq!(correlation_score(&plan, 0.0, -1.0), 0.0);
        assert!(correlation_score(&plan, 0.0, 0.0).is_nan());
        assert!((correlation_score(&plan, 4.0, 4.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn correlation_of_scaled_window_is_one() {
        let (width, height) = (6, 6);
        let image = textured(width, height);
        let view = ImageView::from_slice(&image, width, height).unwrap();
        let scaled: Vec<f32> = extract(view, Rect::new(1, 2, 3, 3))
            .unwrap()
            .data()
            .iter()
            .map(|v| v * 2.0)
            .collect();
        let plan = ReferencePlan::from_view(ImageView::from_slice(&scaled, 3, 3).unwrap()).unwrap();
        let score = <CorrelationScalar as Kernel>::score_at(view, &plan, 1, 2);
        assert!((score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn score_row_fills_every_column() {
        let (width, height) = (7, 5);
        let image = textured(width, height);
        let view = ImageView::from_slice(&image, width, height).unwrap();
        let plan = ReferencePlan::from_image(extract(view, Rect::new(1, 1, 3, 3)).unwrap());
        let mut row = vec![0.0f32; 5];
        <CorrelationScalar as Kernel>::score_row(view, &plan, 1, &mut row);
        for (r, &score) in row.iter().enumerate() {
            assert_eq!(score, <CorrelationScalar as Kernel>::score_at(view, &plan, r, 1));
        }
    }
}
