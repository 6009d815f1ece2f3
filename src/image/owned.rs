//! Owned, contiguous float images.

use crate::image::ImageView;
use crate::util::{EftemError, EftemResult};

/// Owned row-major float image with `stride == width`.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedImage {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl OwnedImage {
    /// Wraps an existing buffer. The buffer length must equal `width * height`.
    pub fn new(data: Vec<f32>, width: usize, height: usize) -> EftemResult<Self> {
        let needed = checked_len(width, height)?;
        if data.len() < needed {
            return Err(EftemError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(EftemError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Creates an image where every sample is `value`.
    pub fn filled(width: usize, height: usize, value: f32) -> EftemResult<Self> {
        let len = checked_len(width, height)?;
        Ok(Self {
            data: vec![value; len],
            width,
            height,
        })
    }

    /// Copies a (possibly strided) view into a contiguous image.
    pub fn from_view(view: ImageView<'_, f32>) -> EftemResult<Self> {
        let width = view.width();
        let height = view.height();
        let mut data = Vec::with_capacity(checked_len(width, height)?);
        for y in 0..height {
            let row = view.row(y).ok_or(EftemError::BufferTooSmall {
                needed: y * view.stride() + width,
                got: view.as_slice().len(),
            })?;
            data.extend_from_slice(row);
        }
        Self::new(data, width, height)
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, f32> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the row-major sample buffer.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Returns the row-major sample buffer for writing.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the image and returns its buffer.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Returns the sample at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Writes the sample at `(x, y)`. Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }
}

fn checked_len(width: usize, height: usize) -> EftemResult<usize> {
    if width == 0 || height == 0 {
        return Err(EftemError::InvalidDimensions { width, height });
    }
    width
        .checked_mul(height)
        .ok_or(EftemError::InvalidDimensions { width, height })
}
