//! Drift detection and correction for image stacks.
//!
//! Every frame is compared with a reference frame over a region of interest:
//! the reference patch is the ROI of the reference frame, the target is the
//! ROI of the other frame grown by the search radius on each side, and the
//! peak of the cross-correlation map is taken as that frame's drift.
//!
//! A drift `d` means the frame content sits at `d` relative to the reference,
//! i.e. `frame(x + d.dx, y + d.dy) ~ reference(x, y)`. The reference frame has
//! drift `(0, 0)`. Correcting the stack translates each frame by `-d`, which is
//! what [`DriftConfig::invert`] selects.

mod optimise;
mod shift;

pub use optimise::{centering_shift, optimise_shifts};
pub use shift::{
    shift_stack, shift_stack_in_place, translate, BorderMode, Borders, ShiftOptions,
    ShiftedStack, SMALL_NEGATIVE,
};

use crate::correlation::{find_max, CrossCorrelation, Shift};
use crate::exec::{JobControl, Stage, WorkerPool};
use crate::image::{extract, stack_dimensions, OwnedImage, Rect};
use crate::kernel::CorrelationMode;
use crate::trace::{trace_event, trace_span};
use crate::util::{EftemError, EftemResult};
use crate::ImageView;

/// Parameters of drift detection and correction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriftConfig {
    /// Largest tested drift along x; at least 1.
    pub shift_x: usize,
    /// Largest tested drift along y; at least 1.
    pub shift_y: usize,
    /// 1-based index of the reference frame.
    pub reference_index: usize,
    /// Region of interest in frame coordinates.
    pub roi: Rect,
    /// Correlation score.
    pub mode: CorrelationMode,
    /// Apply `-drift` instead of `drift` when correcting.
    pub invert: bool,
    /// Re-center the applied shifts on their midrange.
    pub optimise: bool,
    /// Border treatment of the corrected stack.
    pub border: BorderMode,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            shift_x: 10,
            shift_y: 10,
            reference_index: 1,
            roi: Rect::new(0, 0, 0, 0),
            mode: CorrelationMode::Coefficient,
            invert: true,
            optimise: true,
            border: BorderMode::Crop,
        }
    }
}

impl DriftConfig {
    /// Default configuration for `roi`.
    pub fn with_roi(roi: Rect) -> Self {
        Self {
            roi,
            ..Self::default()
        }
    }

    /// Shift options used by [`DriftEstimator::correct`].
    pub fn shift_options(&self) -> ShiftOptions {
        ShiftOptions {
            border: self.border,
            invert: self.invert,
            optimise: self.optimise,
        }
    }

    /// Checks the configuration against a stack of `frames` frames of the
    /// given size and returns the grown search rectangle.
    pub fn validate(&self, frames: usize, width: usize, height: usize) -> EftemResult<Rect> {
        if self.shift_x == 0 || self.shift_y == 0 {
            return Err(EftemError::InvalidParameter(
                "search radius must be at least one pixel",
            ));
        }
        if self.reference_index == 0 || self.reference_index > frames {
            return Err(EftemError::IndexOutOfBounds {
                index: self.reference_index,
                len: frames,
                context: "reference frame (1-based)",
            });
        }
        self.roi.validate(width, height)?;
        let search = self.roi.expand(self.shift_x, self.shift_y);
        search.validate(width, height)?;
        Ok(search)
    }
}

/// Detected drift and, after correction, the shifted stack.
#[derive(Clone, Debug, PartialEq)]
pub struct DriftReport {
    /// Detected drift per frame; the reference frame has `(0, 0)`.
    pub drift: Vec<Shift>,
    /// Shift applied to each frame.
    pub shift: Vec<Shift>,
    /// Corrected frames.
    pub frames: Vec<OwnedImage>,
}

/// Drift estimator bound to a worker pool.
#[derive(Clone, Debug)]
pub struct DriftEstimator {
    config: DriftConfig,
    pool: WorkerPool,
}

impl DriftEstimator {
    /// Creates an estimator.
    pub fn new(config: DriftConfig, pool: WorkerPool) -> Self {
        Self { config, pool }
    }

    /// Parameters in use.
    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    /// Detects the drift of every frame relative to the reference frame.
    ///
    /// The configuration is validated before any correlation starts. Progress
    /// counts correlation-map rows over all non-reference frames.
    pub fn detect(
        &self,
        frames: &[ImageView<'_, f32>],
        control: &JobControl,
    ) -> EftemResult<Vec<Shift>> {
        let (width, height) = stack_dimensions(frames)?;
        let cfg = &self.config;
        let search = cfg.validate(frames.len(), width, height)?;
        let reference_idx = cfg.reference_index - 1;

        let _span = trace_span!(
            "drift_detection",
            frames = frames.len(),
            reference = cfg.reference_index,
            shift_x = cfg.shift_x,
            shift_y = cfg.shift_y
        )
        .entered();

        let reference = extract(frames[reference_idx], search)?;
        let cc =
            CrossCorrelation::from_expanded(reference.view(), cfg.shift_x, cfg.shift_y, cfg.mode)?;
        let (_, map_height) = cc.map_size();
        let stage = Stage::begin(control, "drift_detection", (frames.len() - 1) * map_height);

        let mut drift = vec![Shift::ZERO; frames.len()];
        for (idx, frame) in frames.iter().enumerate() {
            if idx == reference_idx {
                continue;
            }
            stage.checkpoint()?;
            let target = extract(*frame, search)?;
            let map = cc.compute_in_stage(target.view(), &self.pool, &stage)?;
            stage.check()?;
            drift[idx] = find_max(&map);
            trace_event!(
                "frame_drift",
                frame = idx + 1,
                dx = drift[idx].dx,
                dy = drift[idx].dy
            );
        }
        Ok(drift)
    }

    /// Detects the drift and shifts the stack to compensate it.
    pub fn correct(
        &self,
        frames: &[ImageView<'_, f32>],
        control: &JobControl,
    ) -> EftemResult<DriftReport> {
        let drift = self.detect(frames, control)?;
        let shifted = shift_stack(frames, &drift, self.config.shift_options())?;
        Ok(DriftReport {
            drift,
            shift: shifted.applied,
            frames: shifted.frames,
        })
    }
}
