//! Image views, owned frames and rectangular sampling.
//!
//! `ImageView` is a borrowed 2D view into a 1D buffer with an explicit stride.
//! The stride counts elements between the starts of consecutive rows, so a
//! stride larger than the width represents padded rows. ROI slices are zero-copy
//! views into the same backing slice and retain the original stride.

use crate::util::{EftemError, EftemResult};

mod owned;
pub mod rect;

pub use owned::OwnedImage;
pub use rect::{extract, Rect};

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> EftemResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> EftemResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(EftemError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }

    /// Returns a zero-copy ROI view into the same backing buffer.
    pub fn roi(&self, x: usize, y: usize, width: usize, height: usize) -> EftemResult<Self> {
        if width == 0 || height == 0 {
            return Err(EftemError::InvalidDimensions { width, height });
        }

        let out_of_bounds = || EftemError::RoiOutOfBounds {
            x: x as isize,
            y: y as isize,
            width,
            height,
            img_width: self.width,
            img_height: self.height,
        };
        let end_x = x.checked_add(width).ok_or_else(out_of_bounds)?;
        let end_y = y.checked_add(height).ok_or_else(out_of_bounds)?;
        if end_x > self.width || end_y > self.height {
            return Err(out_of_bounds());
        }

        let start = y
            .checked_mul(self.stride)
            .and_then(|v| v.checked_add(x))
            .ok_or(EftemError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })?;
        let data = self.data.get(start..).ok_or(EftemError::BufferTooSmall {
            needed: start.saturating_add(1),
            got: self.data.len(),
        })?;

        ImageView::new(data, width, height, self.stride)
    }
}

/// Common size of a stack of frames.
///
/// Fails with `EmptyStack` for no frames and `FrameSizeMismatch` for the first
/// frame whose size differs from frame 0.
pub fn stack_dimensions<T>(frames: &[ImageView<'_, T>]) -> EftemResult<(usize, usize)> {
    let first = frames.first().ok_or(EftemError::EmptyStack)?;
    let (width, height) = (first.width(), first.height());
    for (index, frame) in frames.iter().enumerate().skip(1) {
        if frame.width() != width || frame.height() != height {
            return Err(EftemError::FrameSizeMismatch {
                index,
                width,
                height,
                got_width: frame.width(),
                got_height: frame.height(),
            });
        }
    }
    Ok((width, height))
}

fn required_len(width: usize, height: usize, stride: usize) -> EftemResult<usize> {
    if width == 0 || height == 0 {
        return Err(EftemError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(EftemError::InvalidStride { width, stride });
    }
    let needed = (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(EftemError::InvalidDimensions { width, height })?;
    Ok(needed)
}
