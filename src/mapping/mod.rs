//! Elemental maps from a stack of energy-filtered frames.
//!
//! For every pixel the pre-edge counts are fitted with a power-law
//! background, and the extrapolated background is subtracted from each
//! post-edge frame. Rows of the output are independent tasks on the
//! [`WorkerPool`]; every pixel is fitted from its own sample, so results do
//! not depend on scheduling.

mod edges;
mod energy;

pub use edges::{IonisationEdge, IonisationEdges};
pub use energy::{exposure_divisors, predict_edge, EdgePrediction, EnergySplit};

use crate::exec::{JobControl, Stage, WorkerPool};
use crate::fit::{FitErrors, FitMethod, FitResult, FitSample, DEFAULT_EPSILON};
use crate::image::{stack_dimensions, OwnedImage};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{EftemError, EftemResult};
use crate::ImageView;

/// Parameters of an elemental mapping job.
#[derive(Clone, Debug, PartialEq)]
pub struct MappingConfig {
    /// Frames with a loss below this value (eV) form the fit sample.
    pub edge_energy_loss: f32,
    /// Convergence threshold of the iterative fits.
    pub epsilon: f64,
    /// Fitting strategy.
    pub method: FitMethod,
    /// Optional exposure time per frame, used to normalise counts.
    pub exposures: Option<Vec<f32>>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            edge_energy_loss: 0.0,
            epsilon: DEFAULT_EPSILON,
            method: FitMethod::default(),
            exposures: None,
        }
    }
}

impl MappingConfig {
    /// Default configuration splitting at `edge_energy_loss`.
    pub fn new(edge_energy_loss: f32) -> Self {
        Self {
            edge_energy_loss,
            ..Self::default()
        }
    }
}

/// Output of an elemental mapping job.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementalMapSet {
    r: OwnedImage,
    a: OwnedImage,
    errors: Vec<u8>,
    elemental: Vec<OwnedImage>,
    post_edge_losses: Vec<f32>,
    method: FitMethod,
}

impl ElementalMapSet {
    /// Map width in pixels.
    pub fn width(&self) -> usize {
        self.r.width()
    }

    /// Map height in pixels.
    pub fn height(&self) -> usize {
        self.r.height()
    }

    /// Fitted exponent per pixel; NaN where the fit failed.
    pub fn r_map(&self) -> &OwnedImage {
        &self.r
    }

    /// Fitted prefactor per pixel; NaN where the fit failed.
    pub fn a_map(&self) -> &OwnedImage {
        &self.a
    }

    /// Natural logarithm of the prefactor map, which has a displayable range.
    pub fn ln_a_map(&self) -> OwnedImage {
        let mut ln_a = self.a.clone();
        for value in ln_a.data_mut() {
            *value = value.ln();
        }
        ln_a
    }

    /// [`FitErrors`] bits per pixel, row-major.
    pub fn error_map(&self) -> &[u8] {
        &self.errors
    }

    /// Fit errors at `(x, y)`, or `None` outside the map.
    pub fn errors_at(&self, x: usize, y: usize) -> Option<FitErrors> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some(FitErrors::from_bits(self.errors[y * self.width() + x]))
    }

    /// Number of pixels with at least one fit error.
    pub fn error_pixel_count(&self) -> usize {
        self.errors.iter().filter(|&&bits| bits != 0).count()
    }

    /// Background-subtracted signal, one map per post-edge frame.
    pub fn elemental_maps(&self) -> &[OwnedImage] {
        &self.elemental
    }

    /// Energy losses of the post-edge frames, matching
    /// [`elemental_maps`](Self::elemental_maps).
    pub fn post_edge_losses(&self) -> &[f32] {
        &self.post_edge_losses
    }

    /// Method the maps were fitted with.
    pub fn method(&self) -> FitMethod {
        self.method
    }
}

/// Elemental mapping engine bound to a worker pool.
#[derive(Clone, Debug)]
pub struct ElementalMapping {
    config: MappingConfig,
    pool: WorkerPool,
}

/// Disjoint output rows handed to one task.
struct RowOut<'a> {
    r: &'a mut [f32],
    a: &'a mut [f32],
    errors: &'a mut [u8],
    elemental: Vec<&'a mut [f32]>,
}

impl ElementalMapping {
    /// Creates an engine.
    pub fn new(config: MappingConfig, pool: WorkerPool) -> Self {
        Self { config, pool }
    }

    /// Job parameters.
    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// Computes the maps for `frames`, whose energy losses are `energy_losses`.
    ///
    /// All configuration errors are reported before any row is scheduled.
    pub fn run(
        &self,
        frames: &[ImageView<'_, f32>],
        energy_losses: &[f32],
        control: &JobControl,
    ) -> EftemResult<ElementalMapSet> {
        let (width, height) = stack_dimensions(frames)?;
        if energy_losses.len() != frames.len() {
            return Err(EftemError::LengthMismatch {
                context: "energy losses",
                expected: frames.len(),
                got: energy_losses.len(),
            });
        }
        if energy_losses.iter().any(|&e| !(e > 0.0 && e.is_finite())) {
            return Err(EftemError::InvalidParameter(
                "energy losses must be finite and positive",
            ));
        }
        let epsilon = self.config.epsilon;
        if !(epsilon > 0.0 && epsilon.is_finite()) {
            return Err(EftemError::InvalidParameter(
                "epsilon must be finite and positive",
            ));
        }
        let split = EnergySplit::new(energy_losses, self.config.edge_energy_loss)?;
        let divisors = match &self.config.exposures {
            Some(exposures) => exposure_divisors(exposures, frames.len())?,
            None => None,
        };

        let method = self.config.method;
        let _span = trace_span!(
            "elemental_mapping",
            width = width,
            height = height,
            method = method.label(),
            pre_edge = split.pre_edge().len(),
            post_edge = split.post_edge().len()
        )
        .entered();

        let mut r = OwnedImage::filled(width, height, 0.0)?;
        let mut a = OwnedImage::filled(width, height, 0.0)?;
        let mut errors = vec![0u8; width * height];
        let mut elemental = split
            .post_edge()
            .iter()
            .map(|_| OwnedImage::filled(width, height, f32::NAN))
            .collect::<EftemResult<Vec<_>>>()?;

        let stage = Stage::begin(control, "elemental_mapping", height);
        {
            let mut elemental_rows: Vec<_> = elemental
                .iter_mut()
                .map(|map| map.data_mut().chunks_mut(width))
                .collect();
            let rows: Vec<RowOut<'_>> = r
                .data_mut()
                .chunks_mut(width)
                .zip(a.data_mut().chunks_mut(width))
                .zip(errors.chunks_mut(width))
                .map(|((r, a), errors)| RowOut {
                    r,
                    a,
                    errors,
                    elemental: elemental_rows.iter_mut().filter_map(Iterator::next).collect(),
                })
                .collect();

            let pixel_value = |frame: usize, x: usize, y: usize| -> f32 {
                let value = frames[frame].get(x, y).copied().unwrap_or(f32::NAN);
                match &divisors {
                    Some(d) => value / d[frame],
                    None => value,
                }
            };

            self.pool.for_each_row(&stage, rows, |y, mut row| {
                let mut counts = vec![0.0f32; split.pre_edge().len()];
                for x in 0..width {
                    for (count, &frame) in counts.iter_mut().zip(split.pre_edge()) {
                        *count = pixel_value(frame, x, y);
                    }
                    let sample = FitSample::from_parts(split.pre_edge_losses(), &counts);
                    let result = method.fit(&sample, epsilon);
                    store_pixel(&mut row, x, &result, |k| {
                        let frame = split.post_edge()[k];
                        (split.post_edge_losses()[k], pixel_value(frame, x, y))
                    });
                }
            });
        }
        stage.check()?;

        let maps = ElementalMapSet {
            r,
            a,
            errors,
            elemental,
            post_edge_losses: split.post_edge_losses().to_vec(),
            method,
        };
        let error_pixels = maps.error_pixel_count();
        trace_event!("elemental_mapping_done", error_pixels = error_pixels);
        if error_pixels > 0 {
            trace_warn!("fit_failures", error_pixels = error_pixels);
        }
        Ok(maps)
    }
}

/// Writes one fitted pixel; `post_edge(k)` yields the loss and the
/// normalised count of post-edge frame `k`.
fn store_pixel<P>(row: &mut RowOut<'_>, x: usize, result: &FitResult, post_edge: P)
where
    P: Fn(usize) -> (f32, f32),
{
    if !result.errors.is_none() {
        fail_pixel(row, x, result.errors);
        return;
    }
    let r = result.r as f32;
    if r.is_infinite() {
        fail_pixel(row, x, FitErrors::R_INFINITE);
        return;
    }
    row.r[x] = r;
    let a = result.a as f32;
    if a.is_infinite() {
        fail_pixel(row, x, FitErrors::A_INFINITE);
        return;
    }
    row.a[x] = a;
    for (k, map_row) in row.elemental.iter_mut().enumerate() {
        let (loss, value) = post_edge(k);
        map_row[x] = (f64::from(value) - result.background(loss)) as f32;
    }
}

fn fail_pixel(row: &mut RowOut<'_>, x: usize, errors: FitErrors) {
    row.r[x] = f32::NAN;
    row.a[x] = f32::NAN;
    row.errors[x] = errors.bits();
}

#[cfg(test)]
mod tests {
    use super::{ElementalMapping, MappingConfig};
    use crate::exec::{JobControl, WorkerPool};
    use crate::fit::{FitErrors, FitMethod};
    use crate::util::EftemError;
    use crate::ImageView;

    fn run(
        frames: &[Vec<f32>],
        width: usize,
        height: usize,
        losses: &[f32],
        config: MappingConfig,
    ) -> Result<super::ElementalMapSet, EftemError> {
        let views: Vec<_> = frames
            .iter()
            .map(|f| ImageView::from_slice(f, width, height).unwrap())
            .collect();
        ElementalMapping::new(config, WorkerPool::new(2).unwrap()).run(
            &views,
            losses,
            &JobControl::default(),
        )
    }

    #[test]
    fn subtracts_extrapolated_background() {
        let losses = [200.0f32, 220.0, 240.0, 300.0];
        let frames: Vec<Vec<f32>> = losses
            .iter()
            .map(|&e| {
                let background = 1.0e9 * e.powf(-3.0);
                let signal = if e >= 284.0 { 5.0 } else { 0.0 };
                vec![background + signal; 6]
            })
            .collect();
        let mut config = MappingConfig::new(284.0);
        config.method = FitMethod::Lse;
        let maps = run(&frames, 3, 2, &losses, config).unwrap();

        assert_eq!(maps.error_pixel_count(), 0);
        assert_eq!(maps.elemental_maps().len(), 1);
        assert_eq!(maps.post_edge_losses(), &[300.0]);
        for &v in maps.elemental_maps()[0].data() {
            assert!((v - 5.0).abs() < 0.05, "signal {v}");
        }
        for &r in maps.r_map().data() {
            assert!((r - 3.0).abs() < 1e-3);
        }
        let ln_a = maps.ln_a_map();
        assert!((ln_a.data()[0] - 1.0e9f32.ln()).abs() < 1e-2);
    }

    #[test]
    fn finite_exponent_with_infinite_prefactor_is_flagged() {
        let frames = vec![vec![f32::MAX], vec![1.0], vec![7.0]];
        let mut config = MappingConfig::new(5.0);
        config.method = FitMethod::Lse;
        let maps = run(&frames, 1, 1, &[2.0, 4.0, 8.0], config).unwrap();
        assert_eq!(maps.errors_at(0, 0), Some(FitErrors::A_INFINITE));
        assert!(maps.r_map().data()[0].is_nan());
        assert!(maps.a_map().data()[0].is_nan());
        assert!(maps.elemental_maps()[0].data()[0].is_nan());
    }

    #[test]
    fn fit_errors_are_recorded_per_pixel() {
        // Pixel 1 has a zero pre-edge count, so its log-log fit fails.
        let frames = vec![vec![100.0, 0.0], vec![50.0, 40.0], vec![30.0, 30.0]];
        let mut config = MappingConfig::new(250.0);
        config.method = FitMethod::Lse;
        let maps = run(&frames, 2, 1, &[200.0, 220.0, 260.0], config).unwrap();
        assert_eq!(maps.errors_at(0, 0), Some(FitErrors::NONE));
        assert_eq!(maps.errors_at(1, 0), Some(FitErrors::R_NAN));
        assert!(maps.r_map().data()[1].is_nan());
        assert!(maps.elemental_maps()[0].data()[1].is_nan());
        assert!(maps.elemental_maps()[0].data()[0].is_finite());
        assert_eq!(maps.error_pixel_count(), 1);
    }

    #[test]
    fn varying_exposures_normalise_counts() {
        let losses = [200.0f32, 220.0, 300.0];
        let exposures = [1.0f32, 2.0, 4.0];
        let frames: Vec<Vec<f32>> = losses
            .iter()
            .zip(&exposures)
            .map(|(&e, &t)| vec![t * 1.0e9 * e.powf(-3.0); 1])
            .collect();
        let mut config = MappingConfig::new(250.0);
        config.method = FitMethod::Lse;
        config.exposures = Some(exposures.to_vec());
        let maps = run(&frames, 1, 1, &losses, config).unwrap();
        assert!((maps.r_map().data()[0] - 3.0).abs() < 1e-3);
        assert!(maps.elemental_maps()[0].data()[0].abs() < 1e-2);
    }

    #[test]
    fn configuration_errors_come_first() {
        let frames = vec![vec![1.0f32; 4], vec![1.0; 4]];
        let err = run(&frames, 2, 2, &[100.0], MappingConfig::new(150.0)).unwrap_err();
        assert!(matches!(err, EftemError::LengthMismatch { .. }));

        let err = run(&frames, 2, 2, &[100.0, 120.0], MappingConfig::new(150.0)).unwrap_err();
        assert_eq!(
            err,
            EftemError::NoPostEdgeFrames {
                edge_energy_loss: 150.0
            }
        );

        let mut config = MappingConfig::new(110.0);
        config.epsilon = 0.0;
        let err = run(&frames, 2, 2, &[100.0, 120.0], config).unwrap_err();
        assert!(matches!(err, EftemError::InvalidParameter(_)));
    }

    #[test]
    fn cancelled_job_reports_the_stage() {
        let frames = vec![vec![10.0f32; 4], vec![5.0; 4], vec![4.0; 4]];
        let views: Vec<_> = frames
            .iter()
            .map(|f| ImageView::from_slice(f, 2, 2).unwrap())
            .collect();
        let control = JobControl::default();
        control.cancel.cancel();
        let err = ElementalMapping::new(MappingConfig::new(250.0), WorkerPool::new(1).unwrap())
            .run(&views, &[200.0, 220.0, 260.0], &control)
            .unwrap_err();
        assert_eq!(
            err,
            EftemError::Cancelled {
                stage: "elemental_mapping"
            }
        );
    }
}
