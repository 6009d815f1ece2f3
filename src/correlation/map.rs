//! Correlation maps indexed by candidate shift.

use crate::image::OwnedImage;
use crate::util::EftemResult;

/// Integer pixel shift `(dx, dy)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Shift {
    /// Shift along x (columns).
    pub dx: i32,
    /// Shift along y (rows).
    pub dy: i32,
}

impl Shift {
    /// The zero shift.
    pub const ZERO: Shift = Shift { dx: 0, dy: 0 };

    /// Creates a shift.
    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// Returns the opposite shift.
    pub fn inverted(self) -> Self {
        Self {
            dx: -self.dx,
            dy: -self.dy,
        }
    }
}

/// Scores for every candidate shift in `[-shift_x, shift_x] x [-shift_y, shift_y]`.
///
/// The map is `(2 * shift_x + 1)` wide and `(2 * shift_y + 1)` high; cell
/// `(shift_x + dx, shift_y + dy)` holds the score of shift `(dx, dy)`.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelationMap {
    data: Vec<f32>,
    shift_x: usize,
    shift_y: usize,
}

impl CorrelationMap {
    /// Wraps precomputed scores laid out row-major.
    ///
    /// Returns `None` if `data` does not have the map's size.
    pub fn from_vec(data: Vec<f32>, shift_x: usize, shift_y: usize) -> Option<Self> {
        if data.len() != (2 * shift_x + 1) * (2 * shift_y + 1) {
            return None;
        }
        Some(Self {
            data,
            shift_x,
            shift_y,
        })
    }

    pub(crate) fn zeroed(shift_x: usize, shift_y: usize) -> Self {
        Self {
            data: vec![0.0; (2 * shift_x + 1) * (2 * shift_y + 1)],
            shift_x,
            shift_y,
        }
    }

    /// Map width, `2 * shift_x + 1`.
    pub fn width(&self) -> usize {
        2 * self.shift_x + 1
    }

    /// Map height, `2 * shift_y + 1`.
    pub fn height(&self) -> usize {
        2 * self.shift_y + 1
    }

    /// Largest tested shift along x.
    pub fn shift_x(&self) -> usize {
        self.shift_x
    }

    /// Largest tested shift along y.
    pub fn shift_y(&self) -> usize {
        self.shift_y
    }

    /// Row-major scores.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Score of a candidate shift, or `None` outside the search window.
    pub fn score(&self, shift: Shift) -> Option<f32> {
        let col = shift.dx + self.shift_x as i32;
        let row = shift.dy + self.shift_y as i32;
        if col < 0 || row < 0 || col as usize >= self.width() || row as usize >= self.height() {
            return None;
        }
        self.data.get(row as usize * self.width() + col as usize).copied()
    }

    /// Shift with the highest score.
    ///
    /// Cells are scanned in row-major order starting at cell `(0, 0)`; a cell
    /// replaces the running maximum only if it is strictly greater, so ties
    /// keep the earliest cell and NaN scores never win over a number.
    pub fn find_max(&self) -> Shift {
        let width = self.width();
        let mut best_idx = 0usize;
        let mut best = self.data[0];
        for (idx, &value) in self.data.iter().enumerate().skip(1) {
            if value > best {
                best = value;
                best_idx = idx;
            }
        }
        Shift {
            dx: (best_idx % width) as i32 - self.shift_x as i32,
            dy: (best_idx / width) as i32 - self.shift_y as i32,
        }
    }

    /// Copies the map into an image with the zero shift at its center.
    pub fn to_image(&self) -> EftemResult<OwnedImage> {
        OwnedImage::new(self.data.clone(), self.width(), self.height())
    }
}

/// Shift with the highest score in `map`; see [`CorrelationMap::find_max`].
pub fn find_max(map: &CorrelationMap) -> Shift {
    map.find_max()
}
