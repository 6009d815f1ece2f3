//! Power-law background fits `y = a * x^(-r)`.
//!
//! Four strategies share one contract. [`MleFitter`] iterates Newton steps on
//! the maximum-likelihood condition and [`LseFitter`] solves the log-log
//! linear regression in closed form. [`WlseFitter`] iterates a reweighted
//! version of that regression, and [`LmaFitter`] runs Levenberg–Marquardt on
//! the raw counts. Each fit is a pure function of its
//! [`FitSample`]; numerical failures come back as [`FitErrors`] flags in the
//! [`FitResult`] rather than as errors.

mod flags;
mod lma;
mod lse;
mod mle;
mod wlse;

pub use flags::FitErrors;
pub use lma::{LmaFitter, LMA_R_START};
pub use lse::LseFitter;
pub use mle::MleFitter;
pub use wlse::WlseFitter;

use crate::util::{EftemError, EftemResult};

/// Starting exponent of the iterative fits.
pub const DEFAULT_R_START: f64 = 4.0;

/// Convergence threshold used when none is given.
pub const DEFAULT_EPSILON: f64 = 1.0e-6;

/// Number of growing steps after which an iteration is declared divergent.
pub(crate) const MAX_GROWING_STEPS: u32 = 25;

/// Hard cap on iterations of a slowly shrinking but non-converging step.
pub(crate) const MAX_ITERATIONS: u32 = 1000;

/// Paired energy losses `x` and counts `y` for one fit.
///
/// `x` must be strictly positive; `y` holds raw counts and may be zero or
/// negative.
#[derive(Clone, Copy, Debug)]
pub struct FitSample<'a> {
    x: &'a [f32],
    y: &'a [f32],
}

impl<'a> FitSample<'a> {
    /// Pairs `x` with `y`; both must have the same non-zero length.
    pub fn new(x: &'a [f32], y: &'a [f32]) -> EftemResult<Self> {
        if x.len() != y.len() {
            return Err(EftemError::LengthMismatch {
                context: "fit sample",
                expected: x.len(),
                got: y.len(),
            });
        }
        if x.is_empty() {
            return Err(EftemError::InvalidParameter("fit sample is empty"));
        }
        Ok(Self { x, y })
    }

    /// Pairs slices whose lengths the caller has already matched.
    pub(crate) fn from_parts(x: &'a [f32], y: &'a [f32]) -> Self {
        debug_assert_eq!(x.len(), y.len());
        Self { x, y }
    }

    /// Energy losses.
    pub fn x(&self) -> &'a [f32] {
        self.x
    }

    /// Counts.
    pub fn y(&self) -> &'a [f32] {
        self.y
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Always `false`; empty samples are rejected by [`FitSample::new`].
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Fitted parameters of one sample.
///
/// When `errors` is not empty, at least one of `r` and `a` is NaN.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitResult {
    /// Power-law exponent.
    pub r: f64,
    /// Power-law prefactor.
    pub a: f64,
    /// Numerical failures raised during the fit.
    pub errors: FitErrors,
    /// `true` if the fit ran to completion.
    pub converged: bool,
}

impl FitResult {
    pub(crate) fn failed(errors: FitErrors) -> Self {
        Self {
            r: f64::NAN,
            a: f64::NAN,
            errors,
            converged: false,
        }
    }

    /// Background `a * x^(-r)` predicted at `x`.
    pub fn background(&self, x: f32) -> f64 {
        self.a * f64::from(x).powf(-self.r)
    }
}

/// A power-law fitting strategy.
pub trait PowerLawFit {
    /// Fits `sample`.
    fn fit(&self, sample: &FitSample<'_>) -> FitResult;
}

/// Selector for the fitting strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FitMethod {
    /// Closed-form least squares on `ln x`, `ln y`.
    Lse,
    /// Maximum-likelihood Newton iteration.
    #[default]
    Mle,
    /// Iteratively reweighted least squares on `ln x`, `ln y`.
    Wlse,
    /// Levenberg–Marquardt least squares on the raw counts.
    Lma,
}

impl FitMethod {
    /// All methods in display order.
    pub const ALL: [FitMethod; 4] = [
        FitMethod::Lse,
        FitMethod::Mle,
        FitMethod::Wlse,
        FitMethod::Lma,
    ];

    /// Short upper-case label.
    pub fn label(self) -> &'static str {
        match self {
            FitMethod::Lse => "LSE",
            FitMethod::Mle => "MLE",
            FitMethod::Wlse => "WLSE",
            FitMethod::Lma => "LMA",
        }
    }

    /// Human-readable method name.
    pub fn full_name(self) -> &'static str {
        match self {
            FitMethod::Lse => "Least squares estimation",
            FitMethod::Mle => "Maximum-likelihood estimation",
            FitMethod::Wlse => "Weighted least squares estimation",
            FitMethod::Lma => "Levenberg-Marquardt algorithm",
        }
    }

    /// Parses a label as produced by [`label`](Self::label), ignoring case.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.label().eq_ignore_ascii_case(label))
    }

    /// Fits `sample` with this method and convergence threshold `epsilon`.
    ///
    /// `epsilon` is ignored by [`FitMethod::Lse`].
    pub fn fit(self, sample: &FitSample<'_>, epsilon: f64) -> FitResult {
        match self {
            FitMethod::Lse => LseFitter.fit(sample),
            FitMethod::Mle => MleFitter::new(epsilon).fit(sample),
            FitMethod::Wlse => WlseFitter::new(epsilon).fit(sample),
            FitMethod::Lma => LmaFitter::new(epsilon).fit(sample),
        }
    }
}

/// Named convergence thresholds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EpsilonPreset {
    /// `1e-3`
    VeryLow,
    /// `1e-6`
    #[default]
    Low,
    /// `1e-9`
    Mid,
    /// `1e-12`
    High,
    /// `1e-15`
    VeryHigh,
}

impl EpsilonPreset {
    /// Threshold value.
    pub fn value(self) -> f64 {
        match self {
            EpsilonPreset::VeryLow => 1.0e-3,
            EpsilonPreset::Low => 1.0e-6,
            EpsilonPreset::Mid => 1.0e-9,
            EpsilonPreset::High => 1.0e-12,
            EpsilonPreset::VeryHigh => 1.0e-15,
        }
    }
}

/// Step bookkeeping shared by the iterative fits.
///
/// Tracks the previous step size and how often a step grew.
pub(crate) struct StepMonitor {
    previous: f64,
    growing: u32,
    steps: u32,
}

impl StepMonitor {
    pub(crate) fn new() -> Self {
        // Large enough that the first step never counts as growing.
        Self {
            previous: 10.0,
            growing: 0,
            steps: 0,
        }
    }

    /// Records a step; returns `false` if the iteration oscillates, diverges
    /// or exceeds [`MAX_ITERATIONS`].
    pub(crate) fn accept(&mut self, step: f64) -> bool {
        if step == self.previous {
            return false;
        }
        if step > self.previous {
            self.growing += 1;
        }
        if self.growing >= MAX_GROWING_STEPS {
            return false;
        }
        self.steps += 1;
        if self.steps > MAX_ITERATIONS {
            return false;
        }
        self.previous = step;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{EpsilonPreset, FitMethod, FitSample, StepMonitor};
    use crate::util::EftemError;

    #[test]
    fn sample_rejects_mismatched_lengths() {
        let err = FitSample::new(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert_eq!(
            err,
            EftemError::LengthMismatch {
                context: "fit sample",
                expected: 2,
                got: 1,
            }
        );
        assert!(FitSample::new(&[], &[]).is_err());
    }

    #[test]
    fn method_labels_round_trip() {
        for method in FitMethod::ALL {
            assert_eq!(FitMethod::from_label(method.label()), Some(method));
        }
        assert_eq!(FitMethod::from_label("wlse"), Some(FitMethod::Wlse));
        assert_eq!(FitMethod::from_label("lma"), Some(FitMethod::Lma));
        assert_eq!(FitMethod::from_label("nlls"), None);
        assert_eq!(FitMethod::Mle.full_name(), "Maximum-likelihood estimation");
    }

    #[test]
    fn epsilon_presets_are_decades_apart() {
        assert_eq!(EpsilonPreset::default().value(), 1.0e-6);
        assert_eq!(EpsilonPreset::VeryLow.value(), 1.0e-3);
        assert_eq!(EpsilonPreset::VeryHigh.value(), 1.0e-15);
    }

    #[test]
    fn step_monitor_flags_repeated_step() {
        let mut monitor = StepMonitor::new();
        assert!(monitor.accept(0.5));
        assert!(!monitor.accept(0.5));
    }

    #[test]
    fn step_monitor_flags_persistent_growth() {
        let mut monitor = StepMonitor::new();
        let mut step = 11.0;
        let mut accepted = 0;
        while monitor.accept(step) {
            accepted += 1;
            step += 1.0;
        }
        assert_eq!(accepted, 24);
    }

    #[test]
    fn step_monitor_caps_iterations() {
        let mut monitor = StepMonitor::new();
        let mut step = 1.0;
        let mut accepted = 0u32;
        while monitor.accept(step) {
            accepted += 1;
            step *= 0.999_999;
        }
        assert_eq!(accepted, super::MAX_ITERATIONS);
    }

    #[test]
    fn every_method_fits_a_clean_power_law() {
        let x = [100.0f32, 120.0, 140.0, 160.0];
        let y: Vec<f32> = x.iter().map(|&e| 1.0e9 * e.powf(-3.0)).collect();
        let sample = FitSample::new(&x, &y).unwrap();
        for method in FitMethod::ALL {
            let result = method.fit(&sample, 1.0e-9);
            assert!(result.errors.is_none(), "{method:?}: {:?}", result.errors);
            assert!((result.r - 3.0).abs() < 1e-3, "{method:?}: r = {}", result.r);
            assert!(
                (result.background(130.0) / (1.0e9 * 130f64.powf(-3.0)) - 1.0).abs() < 1e-3,
                "{method:?}"
            );
        }
    }
}
