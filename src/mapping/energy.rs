//! Energy-loss bookkeeping: pre/post-edge split, edge prediction and
//! exposure normalisation.

use crate::mapping::edges::{IonisationEdge, IonisationEdges};
use crate::util::math::all_equal;
use crate::util::{EftemError, EftemResult};

/// Frame indices on either side of an ionisation edge, in stack order.
#[derive(Clone, Debug, PartialEq)]
pub struct EnergySplit {
    pre_edge: Vec<usize>,
    post_edge: Vec<usize>,
    pre_losses: Vec<f32>,
    post_losses: Vec<f32>,
}

impl EnergySplit {
    /// Splits frames at `edge_energy_loss`: losses below it are pre-edge,
    /// all others post-edge.
    ///
    /// Both sides must be non-empty.
    pub fn new(energy_losses: &[f32], edge_energy_loss: f32) -> EftemResult<Self> {
        let mut split = Self {
            pre_edge: Vec::new(),
            post_edge: Vec::new(),
            pre_losses: Vec::new(),
            post_losses: Vec::new(),
        };
        for (idx, &loss) in energy_losses.iter().enumerate() {
            if loss < edge_energy_loss {
                split.pre_edge.push(idx);
                split.pre_losses.push(loss);
            } else {
                split.post_edge.push(idx);
                split.post_losses.push(loss);
            }
        }
        if split.pre_edge.is_empty() {
            return Err(EftemError::NoPreEdgeFrames { edge_energy_loss });
        }
        if split.post_edge.is_empty() {
            return Err(EftemError::NoPostEdgeFrames { edge_energy_loss });
        }
        Ok(split)
    }

    /// Stack indices of the pre-edge frames.
    pub fn pre_edge(&self) -> &[usize] {
        &self.pre_edge
    }

    /// Stack indices of the post-edge frames.
    pub fn post_edge(&self) -> &[usize] {
        &self.post_edge
    }

    /// Energy losses of the pre-edge frames.
    pub fn pre_edge_losses(&self) -> &[f32] {
        &self.pre_losses
    }

    /// Energy losses of the post-edge frames.
    pub fn post_edge_losses(&self) -> &[f32] {
        &self.post_losses
    }
}

/// Predicted edge energy for a stack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgePrediction {
    /// Suggested edge energy loss in eV.
    pub energy_loss: f32,
    /// Tabulated edge at that energy, if any.
    pub edge: Option<&'static IonisationEdge>,
}

/// Suggests an edge energy between the two highest energy losses.
///
/// A tabulated edge in `[ceil(low), high)` wins; among several, the one
/// closest to the midpoint is taken, ties keeping the lower energy. Without a
/// tabulated edge the midpoint itself is returned.
pub fn predict_edge(energy_losses: &[f32]) -> EftemResult<EdgePrediction> {
    if energy_losses.len() < 2 {
        return Err(EftemError::LengthMismatch {
            context: "edge prediction needs at least two energy losses",
            expected: 2,
            got: energy_losses.len(),
        });
    }
    let mut sorted = energy_losses.to_vec();
    sorted.sort_by(f32::total_cmp);
    let high = sorted[sorted.len() - 1];
    let low = sorted[sorted.len() - 2];
    let mid = (high + low) / 2.0;

    let candidates = IonisationEdges::edges_in(low, high);
    let mut best: Option<&'static IonisationEdge> = None;
    for candidate in candidates {
        let closer = match best {
            Some(b) => (mid - candidate.energy as f32).abs() < (mid - b.energy as f32).abs(),
            None => true,
        };
        if closer {
            best = Some(candidate);
        }
    }
    Ok(match best {
        Some(edge) => EdgePrediction {
            energy_loss: edge.energy as f32,
            edge: Some(edge),
        },
        None => EdgePrediction {
            energy_loss: mid,
            edge: None,
        },
    })
}

/// Per-frame divisors that bring counts to a common exposure.
///
/// Returns `None` when no rescaling applies: exposures are all equal or any
/// exposure is zero, i.e. unknown.
pub fn exposure_divisors(exposures: &[f32], frames: usize) -> EftemResult<Option<Vec<f32>>> {
    if exposures.len() != frames {
        return Err(EftemError::LengthMismatch {
            context: "exposures",
            expected: frames,
            got: exposures.len(),
        });
    }
    if exposures.iter().any(|e| !e.is_finite() || *e < 0.0) {
        return Err(EftemError::InvalidParameter(
            "exposure times must be finite and non-negative",
        ));
    }
    if exposures.iter().any(|&e| e == 0.0) || all_equal(exposures) {
        return Ok(None);
    }
    Ok(Some(exposures.to_vec()))
}
