//! Integer rectangles and bounds-checked patch extraction.

use crate::image::{ImageView, OwnedImage};
use crate::util::{EftemError, EftemResult};

/// Axis-aligned rectangle in pixel coordinates.
///
/// The origin may be negative so that an expanded search region can be
/// represented before it is validated against an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: isize,
    /// Top edge (inclusive).
    pub y: isize,
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
}

impl Rect {
    /// Creates a rectangle.
    pub fn new(x: isize, y: isize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Grows the rectangle by `dx` columns left and right and `dy` rows above
    /// and below.
    pub fn expand(&self, dx: usize, dy: usize) -> Self {
        Self {
            x: self.x - dx as isize,
            y: self.y - dy as isize,
            width: self.width + 2 * dx,
            height: self.height + 2 * dy,
        }
    }

    /// Returns `true` if the rectangle is non-empty and lies inside an image of
    /// the given size.
    pub fn fits_within(&self, img_width: usize, img_height: usize) -> bool {
        self.width > 0
            && self.height > 0
            && self.x >= 0
            && self.y >= 0
            && self.x as usize + self.width <= img_width
            && self.y as usize + self.height <= img_height
    }

    /// Fails with `RoiOutOfBounds` unless the rectangle fits inside the image.
    pub fn validate(&self, img_width: usize, img_height: usize) -> EftemResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(EftemError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if !self.fits_within(img_width, img_height) {
            return Err(EftemError::RoiOutOfBounds {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
                img_width,
                img_height,
            });
        }
        Ok(())
    }
}

/// Copies the rectangle `rect` out of `image`.
///
/// The rectangle must lie entirely inside the image; there is no clamping.
pub fn extract(image: ImageView<'_, f32>, rect: Rect) -> EftemResult<OwnedImage> {
    rect.validate(image.width(), image.height())?;
    let roi = image.roi(rect.x as usize, rect.y as usize, rect.width, rect.height)?;
    OwnedImage::from_view(roi)
}
