//! EFTEM is a CPU library for energy-filtered TEM image stacks.
//!
//! It offers two independent pipelines: drift detection and correction by
//! exhaustive normalised cross-correlation over integer shifts, and
//! elemental mapping by per-pixel power-law background fits. Row tasks run
//! on a reusable worker pool via the `rayon` feature; the `simd` feature
//! enables vectorised correlation kernels.

pub mod correlation;
pub mod drift;
pub mod exec;
pub mod fit;
pub mod image;
pub mod kernel;
pub mod lowlevel;
pub mod mapping;
mod trace;
pub mod util;

pub use correlation::{find_max, CorrelationMap, CrossCorrelation, Shift};
pub use drift::{
    shift_stack, BorderMode, DriftConfig, DriftEstimator, DriftReport, ShiftOptions, ShiftedStack,
};
pub use exec::{CancelToken, JobControl, Progress, WorkerPool, DEFAULT_TIMEOUT};
pub use fit::{EpsilonPreset, FitErrors, FitMethod, FitResult, FitSample, PowerLawFit};
pub use image::{extract, ImageView, OwnedImage, Rect};
pub use kernel::CorrelationMode;
pub use mapping::{
    predict_edge, ElementalMapSet, ElementalMapping, IonisationEdges, MappingConfig,
};
pub use util::{EftemError, EftemResult};
