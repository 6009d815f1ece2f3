use crate::fit::{FitErrors, FitResult, FitSample, PowerLawFit};
use crate::util::math::ln_values;

/// Closed-form least-squares fit of `ln y = ln a - r ln x`.
///
/// Non-positive counts have no logarithm and end the fit with
/// [`FitErrors::R_NAN`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LseFitter;

impl PowerLawFit for LseFitter {
    fn fit(&self, sample: &FitSample<'_>) -> FitResult {
        let lx = ln_values(sample.x());
        let ly = ln_values(sample.y());
        let n = lx.len() as f64;
        let x_mean = lx.iter().sum::<f64>() / n;
        let y_mean = ly.iter().sum::<f64>() / n;

        let mut covariance = 0.0f64;
        let mut variance = 0.0f64;
        for (x, y) in lx.iter().zip(&ly) {
            covariance += (x - x_mean) * (y - y_mean);
            variance += (x - x_mean) * (x - x_mean);
        }

        let r = -covariance / variance;
        if r.is_nan() {
            return FitResult::failed(FitErrors::R_NAN);
        }
        if r.is_infinite() {
            return FitResult::failed(FitErrors::R_INFINITE);
        }
        let a = (y_mean + r * x_mean).exp();
        if a.is_nan() {
            return FitResult {
                r: f64::NAN,
                a,
                errors: FitErrors::A_NAN,
                converged: false,
            };
        }
        FitResult {
            r,
            a,
            errors: FitErrors::NONE,
            converged: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LseFitter;
    use crate::fit::{FitErrors, FitSample, PowerLawFit};

    #[test]
    fn recovers_exact_power_law() {
        let x = [50.0f32, 60.0, 70.0, 80.0, 90.0];
        let y: Vec<f32> = x.iter().map(|&e| 2.0e7 * e.powf(-2.8)).collect();
        let result = LseFitter.fit(&FitSample::new(&x, &y).unwrap());
        assert_eq!(result.errors, FitErrors::NONE);
        assert!(result.converged);
        assert!((result.r - 2.8).abs() < 1e-4, "r = {}", result.r);
        assert!((result.a / 2.0e7 - 1.0).abs() < 1e-3, "a = {}", result.a);
    }

    #[test]
    fn zero_count_gives_nan_exponent() {
        let x = [50.0f32, 60.0, 70.0];
        let y = [10.0f32, 0.0, 5.0];
        let result = LseFitter.fit(&FitSample::new(&x, &y).unwrap());
        assert_eq!(result.errors, FitErrors::R_NAN);
        assert!(result.r.is_nan() && result.a.is_nan());
    }

    #[test]
    fn repeated_energy_gives_nan_exponent() {
        let x = [50.0f32, 50.0];
        let y = [10.0f32, 10.0];
        let result = LseFitter.fit(&FitSample::new(&x, &y).unwrap());
        assert_eq!(result.errors, FitErrors::R_NAN);
    }
}
