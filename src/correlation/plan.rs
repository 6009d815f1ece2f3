//! Reference patch precomputation for cross-correlation.

use crate::image::{ImageView, OwnedImage};
use crate::util::EftemResult;

/// Reference patch plus the whole-patch reductions every score needs.
///
/// The reductions are computed once per correlation job and shared read-only
/// by all row tasks.
#[derive(Clone, Debug)]
pub struct ReferencePlan {
    patch: OwnedImage,
    mean: f64,
    sigma: f64,
    square_sum: f64,
}

impl ReferencePlan {
    /// Builds a plan from a reference patch.
    pub fn from_view(reference: ImageView<'_, f32>) -> EftemResult<Self> {
        let patch = OwnedImage::from_view(reference)?;
        Ok(Self::from_image(patch))
    }

    /// Builds a plan that takes ownership of an already contiguous patch.
    pub fn from_image(patch: OwnedImage) -> Self {
        let data = patch.data();
        let count = data.len() as f64;

        let mut sum = 0.0f64;
        let mut square_sum = 0.0f64;
        for &value in data {
            let v = value as f64;
            sum += v;
            square_sum += v * v;
        }
        let mean = sum / count;

        let mut deviation_sum = 0.0f64;
        for &value in data {
            let d = value as f64 - mean;
            deviation_sum += d * d;
        }

        Self {
            patch,
            mean,
            sigma: deviation_sum.sqrt(),
            square_sum,
        }
    }

    /// Returns the patch width in pixels.
    pub fn width(&self) -> usize {
        self.patch.width()
    }

    /// Returns the patch height in pixels.
    pub fn height(&self) -> usize {
        self.patch.height()
    }

    /// Number of samples in the patch.
    pub fn len(&self) -> usize {
        self.patch.data().len()
    }

    /// A plan always holds at least one sample.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Mean intensity of the patch.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Square root of the summed squared deviations from the mean.
    ///
    /// This is not divided by the sample count; the coefficient formula
    /// expects the unnormalised value.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Sum of squared samples.
    pub fn square_sum(&self) -> f64 {
        self.square_sum
    }

    /// Row-major patch samples.
    pub fn data(&self) -> &[f32] {
        self.patch.data()
    }

    /// Returns a borrowed view of the patch.
    pub fn view(&self) -> ImageView<'_, f32> {
        self.patch.view()
    }
}

#[cfg(test)]
mod tests {
    use super::ReferencePlan;
    use crate::image::OwnedImage;

    #[test]
    fn plan_matches_known_stats() {
        let patch = OwnedImage::new(vec![0.0, 1.0, 2.0, 3.0], 2, 2).unwrap();
        let plan = ReferencePlan::from_image(patch);
        assert!((plan.mean() - 1.5).abs() < 1e-12);
        assert!((plan.sigma() - 5.0f64.sqrt()).abs() < 1e-12);
        assert!((plan.square_sum() - 14.0).abs() < 1e-12);
        assert_eq!(plan.len(), 4);
    }
}
