use crate::fit::{
    FitErrors, FitResult, FitSample, PowerLawFit, StepMonitor, DEFAULT_EPSILON, DEFAULT_R_START,
};
use crate::util::math::ln_values;

/// Maximum-likelihood fit.
///
/// Newton iteration on the stationarity condition
/// `S1(r) / S0(r) = sum(ln x * y) / sum(y)` with
/// `Sk(r) = sum(ln(x)^k * x^(-r))`, followed by `a = sum(y) / S0(r)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MleFitter {
    start: f64,
    epsilon: f64,
}

impl Default for MleFitter {
    fn default() -> Self {
        Self::new(DEFAULT_EPSILON)
    }
}

impl MleFitter {
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

    /// Starting exponent.
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Convergence threshold.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

impl PowerLawFit for MleFitter {
    fn fit(&self, sample: &FitSample<'_>) -> FitResult {
        let lx = ln_values(sample.x());
        let y: Vec<f64> = sample.y().iter().map(|&v| f64::from(v)).collect();
        let sum_y: f64 = y.iter().sum();
        let weight = if sum_y == 0.0 {
            0.0
        } else {
            lx.iter().zip(&y).map(|(l, v)| l * v).sum::<f64>() / sum_y
        };

        let mut rn = self.start;
        let mut rn_prev = rn + 2.0 * self.epsilon;
        let mut monitor = StepMonitor::new();
        while (rn_prev - rn).abs() > self.epsilon {
            rn_prev = rn;
            let [s0, s1, s2] = exp_sums(&lx, rn);
            let mean = s1 / s0;
            let numerator = mean - weight;
            let denominator = mean * mean - s2 / s0;
            rn = rn_prev - numerator / denominator;

            if rn.is_nan() {
                return FitResult::failed(FitErrors::R_NAN);
            }
            if rn.is_infinite() {
                return FitResult::failed(FitErrors::R_INFINITE);
            }
            if !monitor.accept((rn_prev - rn).abs()) {
                return FitResult::failed(FitErrors::CONVERGE);
            }
        }

        let [s0, _, _] = exp_sums(&lx, rn);
        let a = sum_y / s0;
        let errors = if a.is_nan() {
            FitErrors::A_NAN
        } else {
            FitErrors::NONE
        };
        FitResult {
            r: rn,
            a,
            errors,
            converged: true,
        }
    }
}

/// `[S0, S1, S2]` at exponent `rn`.
fn exp_sums(lx: &[f64], rn: f64) -> [f64; 3] {
    let mut sums = [0.0f64; 3];
    for &l in lx {
        let e = (-rn * l).exp();
        sums[0] += e;
        sums[1] += l * e;
        sums[2] += l * l * e;
    }
    sums
}
