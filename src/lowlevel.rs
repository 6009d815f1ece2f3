//! Low-level building blocks for custom pipelines.
//!
//! These items expose the correlation kernels, precomputed reference plans,
//! the individual fitters and the stack-shifting helpers behind the
//! high-level `DriftEstimator` and `ElementalMapping` types.

pub use crate::correlation::ReferencePlan;
pub use crate::drift::{
    centering_shift, optimise_shifts, shift_stack_in_place, translate, Borders, SMALL_NEGATIVE,
};
pub use crate::fit::{
    LmaFitter, LseFitter, MleFitter, WlseFitter, DEFAULT_EPSILON, DEFAULT_R_START, LMA_R_START,
};
pub use crate::image::stack_dimensions;
pub use crate::kernel::scalar::{CoefficientScalar, CorrelationScalar};
#[cfg(feature = "simd")]
pub use crate::kernel::simd::{CoefficientSimd, CorrelationSimd};
pub use crate::kernel::Kernel;
pub use crate::mapping::{exposure_divisors, EdgePrediction, EnergySplit, IonisationEdge};
