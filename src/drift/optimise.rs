//! Re-centering of per-frame shifts around their midrange.

use crate::correlation::Shift;
use crate::util::math::centering_offset;

/// Offset that centers `shifts` on their midrange, per axis.
///
/// The range on each axis always includes zero, the shift of the reference
/// frame.
pub fn centering_shift(shifts: &[Shift]) -> Shift {
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (0, 0, 0, 0);
    for shift in shifts {
        min_x = min_x.min(shift.dx);
        max_x = max_x.max(shift.dx);
        min_y = min_y.min(shift.dy);
        max_y = max_y.max(shift.dy);
    }
    Shift::new(centering_offset(min_x, max_x), centering_offset(min_y, max_y))
}

/// Subtracts the centering offset from every shift.
///
/// A stack anchored at its reference frame, e.g. `(0,0), (10,10), (20,20)`,
/// becomes `(-10,-10), (0,0), (10,10)`, so the largest shift in any direction
/// is roughly halved. Applying this to an already centered set is a no-op.
pub fn optimise_shifts(shifts: &[Shift]) -> Vec<Shift> {
    let offset = centering_shift(shifts);
    shifts
        .iter()
        .map(|s| Shift::new(s.dx - offset.dx, s.dy - offset.dy))
        .collect()
}
