//! Normalised cross-correlation over a window of integer shifts.
//!
//! A [`CrossCorrelation`] holds a precomputed reference patch and scores every
//! placement of that patch inside a target that is larger by the search
//! radius on each side. Each row of the resulting [`CorrelationMap`] is an
//! independent task on the [`WorkerPool`].

mod map;
mod plan;

pub use map::{find_max, CorrelationMap, Shift};
pub use plan::ReferencePlan;

use crate::exec::{JobControl, Stage, WorkerPool};
use crate::image::{extract, Rect};
use crate::kernel::{CorrelationMode, Kernel};
use crate::trace::trace_span;
use crate::util::{EftemError, EftemResult};
use crate::ImageView;

#[cfg(not(feature = "simd"))]
use crate::kernel::scalar::{CoefficientScalar as Coefficient, CorrelationScalar as Correlation};
#[cfg(feature = "simd")]
use crate::kernel::simd::{CoefficientSimd as Coefficient, CorrelationSimd as Correlation};

/// Cross-correlation job for one reference patch.
#[derive(Clone, Debug)]
pub struct CrossCorrelation {
    plan: ReferencePlan,
    shift_x: usize,
    shift_y: usize,
    mode: CorrelationMode,
}

impl CrossCorrelation {
    /// Prepares a correlation of `reference` (already cropped to the region
    /// of interest) over shifts up to `shift_x` / `shift_y`.
    pub fn new(
        reference: ImageView<'_, f32>,
        shift_x: usize,
        shift_y: usize,
        mode: CorrelationMode,
    ) -> EftemResult<Self> {
        Ok(Self::from_plan(
            ReferencePlan::from_view(reference)?,
            shift_x,
            shift_y,
            mode,
        ))
    }

    /// Prepares a correlation from a reference that still includes the search
    /// margin; the central region is used as the reference patch.
    pub fn from_expanded(
        expanded: ImageView<'_, f32>,
        shift_x: usize,
        shift_y: usize,
        mode: CorrelationMode,
    ) -> EftemResult<Self> {
        let inner_width = expanded.width().saturating_sub(2 * shift_x);
        let inner_height = expanded.height().saturating_sub(2 * shift_y);
        let inner = Rect::new(
            shift_x as isize,
            shift_y as isize,
            inner_width,
            inner_height,
        );
        let patch = extract(expanded, inner)?;
        Ok(Self::from_plan(
            ReferencePlan::from_image(patch),
            shift_x,
            shift_y,
            mode,
        ))
    }

    /// Wraps an existing plan.
    pub fn from_plan(
        plan: ReferencePlan,
        shift_x: usize,
        shift_y: usize,
        mode: CorrelationMode,
    ) -> Self {
        Self {
            plan,
            shift_x,
            shift_y,
            mode,
        }
    }

    /// Switches between coefficient and correlation scoring.
    pub fn with_mode(mut self, mode: CorrelationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Scoring mode in use.
    pub fn mode(&self) -> CorrelationMode {
        self.mode
    }

    /// Precomputed reference statistics.
    pub fn plan(&self) -> &ReferencePlan {
        &self.plan
    }

    /// Map size `(2 * shift_x + 1, 2 * shift_y + 1)`.
    pub fn map_size(&self) -> (usize, usize) {
        (2 * self.shift_x + 1, 2 * self.shift_y + 1)
    }

    /// Required target size `(W + 2 * shift_x, H + 2 * shift_y)`.
    pub fn target_size(&self) -> (usize, usize) {
        (
            self.plan.width() + 2 * self.shift_x,
            self.plan.height() + 2 * self.shift_y,
        )
    }

    /// Computes the full map on `pool` as a stage of its own.
    pub fn compute(
        &self,
        target: ImageView<'_, f32>,
        pool: &WorkerPool,
        control: &JobControl,
    ) -> EftemResult<CorrelationMap> {
        let (_, map_height) = self.map_size();
        let stage = Stage::begin(control, "cross_correlation", map_height);
        let map = self.compute_in_stage(target, pool, &stage)?;
        stage.check()?;
        Ok(map)
    }

    /// Computes the full map on the calling thread.
    pub fn compute_sequential(&self, target: ImageView<'_, f32>) -> EftemResult<CorrelationMap> {
        self.check_target(target)?;
        let mut map = CorrelationMap::zeroed(self.shift_x, self.shift_y);
        let map_width = map.width();
        for (s, row) in map.data_mut().chunks_mut(map_width).enumerate() {
            self.score_row(target, s, row);
        }
        Ok(map)
    }

    pub(crate) fn compute_in_stage(
        &self,
        target: ImageView<'_, f32>,
        pool: &WorkerPool,
        stage: &Stage<'_>,
    ) -> EftemResult<CorrelationMap> {
        self.check_target(target)?;
        let (map_width, map_height) = self.map_size();
        let _span = trace_span!(
            "cross_correlation",
            map_width = map_width,
            map_height = map_height
        )
        .entered();

        let mut map = CorrelationMap::zeroed(self.shift_x, self.shift_y);
        let rows: Vec<&mut [f32]> = map.data_mut().chunks_mut(map_width).collect();
        pool.for_each_row(stage, rows, |s, row| self.score_row(target, s, row));
        Ok(map)
    }

    fn score_row(&self, target: ImageView<'_, f32>, s: usize, row: &mut [f32]) {
        match self.mode {
            CorrelationMode::Coefficient => {
                <Coefficient as Kernel>::score_row(target, &self.plan, s, row)
            }
            CorrelationMode::Correlation => {
                <Correlation as Kernel>::score_row(target, &self.plan, s, row)
            }
        }
    }

    fn check_target(&self, target: ImageView<'_, f32>) -> EftemResult<()> {
        let (expected_width, expected_height) = self.target_size();
        if target.width() != expected_width || target.height() != expected_height {
            return Err(EftemError::TargetSizeMismatch {
                expected_width,
                expected_height,
                got_width: target.width(),
                got_height: target.height(),
            });
        }
        Ok(())
    }
}
