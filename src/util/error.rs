//! Error types for eftem.

use std::time::Duration;
use thiserror::Error;

/// Result alias for eftem operations.
pub type EftemResult<T> = std::result::Result<T, EftemError>;

/// Errors that abort a processing stage.
///
/// Numerical problems inside a single power-law fit are not errors in this
/// sense; they are reported per pixel through [`crate::fit::FitErrors`].
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EftemError {
    /// Width or height is zero or overflows.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is shorter than the declared layout.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A rectangle does not fit inside its source image.
    #[error(
        "region {width}x{height} at ({x}, {y}) is out of bounds for image {img_width}x{img_height}"
    )]
    RoiOutOfBounds {
        x: isize,
        y: isize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// The correlation target does not match `reference + 2 * shift`.
    #[error(
        "target must be {expected_width}x{expected_height} for the given reference and shift, got {got_width}x{got_height}"
    )]
    TargetSizeMismatch {
        expected_width: usize,
        expected_height: usize,
        got_width: usize,
        got_height: usize,
    },
    /// Two arrays that must pair up have different lengths.
    #[error("{context}: expected length {expected}, got {got}")]
    LengthMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
    /// Index is outside the valid range.
    #[error("{context} index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
        context: &'static str,
    },
    /// A scalar parameter is outside its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
    /// The stack has no frames.
    #[error("stack contains no frames")]
    EmptyStack,
    /// A frame differs in size from the first frame of its stack.
    #[error("frame {index} is {got_width}x{got_height}, expected {width}x{height}")]
    FrameSizeMismatch {
        index: usize,
        width: usize,
        height: usize,
        got_width: usize,
        got_height: usize,
    },
    /// No frame lies below the edge energy loss.
    #[error("no pre-edge frames below {edge_energy_loss} eV")]
    NoPreEdgeFrames { edge_energy_loss: f32 },
    /// No frame lies at or above the edge energy loss.
    #[error("no post-edge frames at or above {edge_energy_loss} eV")]
    NoPostEdgeFrames { edge_energy_loss: f32 },
    /// The stage did not finish before its deadline.
    #[error("{stage} timed out after {timeout:?}")]
    TimedOut {
        stage: &'static str,
        timeout: Duration,
    },
    /// The stage was cancelled through its cancellation token.
    #[error("{stage} was cancelled")]
    Cancelled { stage: &'static str },
    /// The worker pool could not be created.
    #[error("thread pool: {reason}")]
    ThreadPool { reason: String },
}
