//! Numeric helpers shared by the drift and fit code.

/// Offset that moves the integer range `[min, max]` onto zero.
///
/// The half-width is truncated toward zero, so for odd widths the upper side
/// keeps the extra pixel.
pub(crate) fn centering_offset(min: i32, max: i32) -> i32 {
    (max - min) / 2 + min
}

/// Natural logarithm of each value, widened to `f64`.
pub(crate) fn ln_values(values: &[f32]) -> Vec<f64> {
    values.iter().map(|&v| (v as f64).ln()).collect()
}

/// Returns `true` if the slice is empty or every element equals the first.
pub(crate) fn all_equal(values: &[f32]) -> bool {
    match values.first() {
        Some(&first) => values.iter().all(|&v| v == first),
        None => true,
    }
}
