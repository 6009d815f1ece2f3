use crate::fit::{
    FitErrors, FitResult, FitSample, PowerLawFit, StepMonitor, DEFAULT_EPSILON, DEFAULT_R_START,
};
use crate::util::math::ln_values;

/// Iteratively reweighted least-squares fit of `ln y = ln a - r ln x`.
///
/// Each pass solves the weighted regression with weights
/// `w(ln x) = an - rn * ln x` taken from the current iterate. The exponent is
/// updated first and the intercept is then solved with the new exponent in
/// the weights.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WlseFitter {
    start: f64,
    epsilon: f64,
}

impl Default for WlseFitter {
    fn default() -> Self {
        Self::new(DEFAULT_EPSILON)
    }
}

impl WlseFitter {
    /// Fitter with convergence threshold `epsilon` starting at `r = 4`.
    pub fn new(epsilon: f64) -> Self {
        Self {
            start: DEFAULT_R_START,
            epsilon,
        }
    }

    /// Uses `r0` as the starting exponent.
    pub fn with_start(mut self, r0: f64) -> Self {
        self.start = r0;
        self
    }
}

/// Weighted sums `S(1, p, q) = sum(w * lx^p * ly^q)`.
struct Sums {
    s100: f64,
    s101: f64,
    s110: f64,
    s111: f64,
    s120: f64,
}

impl Sums {
    fn new(lx: &[f64], ly: &[f64], an: f64, rn: f64) -> Self {
        let mut sums = Sums {
            s100: 0.0,
            s101: 0.0,
            s110: 0.0,
            s111: 0.0,
            s120: 0.0,
        };
        for (&x, &y) in lx.iter().zip(ly) {
            let w = an - rn * x;
            sums.s100 += w;
            sums.s101 += w * y;
            sums.s110 += w * x;
            sums.s111 += w * x * y;
            sums.s120 += w * x * x;
        }
        sums
    }

    fn determinant(&self) -> f64 {
        self.s120 * self.s100 - self.s110 * self.s110
    }

    fn exponent(&self) -> f64 {
        (self.s101 * self.s110 - self.s100 * self.s111) / self.determinant()
    }

    fn intercept(&self) -> f64 {
        (self.s101 * self.s120 - self.s110 * self.s111) / self.determinant()
    }
}

impl PowerLawFit for WlseFitter {
    fn fit(&self, sample: &FitSample<'_>) -> FitResult {
        let lx = ln_values(sample.x());
        let ly = ln_values(sample.y());

        let mut rn = self.start;
        let mut rn_prev = rn + 2.0 * self.epsilon;
        let mut an = ly[0] + rn * lx[0];
        let mut errors = FitErrors::NONE;
        let mut monitor = StepMonitor::new();
        while (rn_prev - rn).abs() > self.epsilon {
            rn_prev = rn;
            rn = Sums::new(&lx, &ly, an, rn).exponent();
            an = Sums::new(&lx, &ly, an, rn).intercept();

            if rn.is_nan() {
                return FitResult::failed(errors | FitErrors::R_NAN);
            }
            if an.is_nan() {
                errors.insert(FitErrors::A_NAN);
            }
            if rn.is_infinite() {
                return FitResult::failed(errors | FitErrors::R_INFINITE);
            }
            if an.is_infinite() {
                return FitResult::failed(errors | FitErrors::A_INFINITE);
            }
            if !monitor.accept((rn_prev - rn).abs()) {
                return FitResult::failed(errors | FitErrors::CONVERGE);
            }
        }

        let a = an.exp();
        if an.is_nan() {
            errors.insert(FitErrors::A_NAN);
        }
        FitResult {
            r: if errors.is_none() { rn } else { f64::NAN },
            a,
            errors,
            converged: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WlseFitter;
    use crate::fit::{FitErrors, FitSample, PowerLawFit};

    #[test]
    fn recovers_exact_power_law() {
        let x = [150.0f32, 170.0, 190.0, 210.0];
        let y: Vec<f32> = x.iter().map(|&e| 3.0e9 * e.powf(-3.5)).collect();
        let result = WlseFitter::new(1e-9).fit(&FitSample::new(&x, &y).unwrap());
        assert!(result.errors.is_none(), "{:?}", result.errors);
        assert!((result.r - 3.5).abs() < 1e-3, "r = {}", result.r);
        assert!((result.a / 3.0e9 - 1.0).abs() < 1e-2, "a = {}", result.a);
    }

    #[test]
    fn start_value_is_configurable() {
        let x = [150.0f32, 170.0, 190.0, 210.0];
        let y: Vec<f32> = x.iter().map(|&e| 3.0e9 * e.powf(-3.5)).collect();
        let sample = FitSample::new(&x, &y).unwrap();
        let result = WlseFitter::new(1e-9).with_start(3.0).fit(&sample);
        assert!((result.r - 3.5).abs() < 1e-3, "r = {}", result.r);
    }

    #[test]
    fn non_positive_counts_fail_with_nan_exponent() {
        let x = [150.0f32, 170.0, 190.0];
        let y = [4.0f32, -1.0, 2.0];
        let result = WlseFitter::default().fit(&FitSample::new(&x, &y).unwrap());
        assert!(result.errors.contains(FitErrors::R_NAN));
        assert!(!result.converged);
        assert!(result.r.is_nan() && result.a.is_nan());
    }

    #[test]
    fn nan_intercept_is_kept_when_the_exponent_fails_later() {
        // First pass lands on r = 2 exactly, which zeroes the weight of the
        // second point and leaves a singular intercept system.
        let x = [1.0f32, 2.0];
        let y = [4.0f32, 1.0];
        let result = WlseFitter::default().fit(&FitSample::new(&x, &y).unwrap());
        assert_eq!(result.errors, FitErrors::R_NAN | FitErrors::A_NAN);
        assert_eq!(result.errors.bits(), 9);
        assert!(!result.converged);
        assert!(result.r.is_nan() && result.a.is_nan());
    }

    #[test]
    fn infinite_intercept_stops_the_iteration() {
        let x = [2.0f32, 12.0];
        let y = [1.0f32, 2.0];
        let result = WlseFitter::default().fit(&FitSample::new(&x, &y).unwrap());
        assert_eq!(result.errors, FitErrors::A_INFINITE);
        assert!(!result.converged);
        assert!(result.r.is_nan());
    }
}
