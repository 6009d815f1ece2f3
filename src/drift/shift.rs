//! Integer translation of frames and treatment of the uncovered border.

use crate::correlation::Shift;
use crate::drift::optimise::{centering_shift, optimise_shifts};
use crate::image::{stack_dimensions, OwnedImage};
use crate::trace::{trace_event, trace_span};
use crate::util::{EftemError, EftemResult};
use crate::ImageView;

/// Negated smallest positive subnormal float.
pub const SMALL_NEGATIVE: f32 = -1.401_298_5e-45;

/// What happens to pixels that a translation leaves uncovered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BorderMode {
    /// Crop every frame to the region covered in all frames.
    #[default]
    Crop,
    /// Fill each frame's own border with NaN.
    NaN,
    /// Fill the union border of the stack with NaN in every frame.
    NaNEq,
    /// Fill each frame's own border with zero.
    Zero,
    /// Fill the union border of the stack with zero in every frame.
    ZeroEq,
    /// Fill each frame's own border with [`SMALL_NEGATIVE`].
    SmallNegative,
    /// Fill the union border of the stack with [`SMALL_NEGATIVE`].
    SmallNegativeEq,
}

impl BorderMode {
    /// All modes.
    pub const ALL: [BorderMode; 7] = [
        BorderMode::Crop,
        BorderMode::NaN,
        BorderMode::NaNEq,
        BorderMode::Zero,
        BorderMode::ZeroEq,
        BorderMode::SmallNegative,
        BorderMode::SmallNegativeEq,
    ];

    /// Fill value, or `None` for [`BorderMode::Crop`].
    pub fn fill_value(self) -> Option<f32> {
        match self {
            BorderMode::Crop => None,
            BorderMode::NaN | BorderMode::NaNEq => Some(f32::NAN),
            BorderMode::Zero | BorderMode::ZeroEq => Some(0.0),
            BorderMode::SmallNegative | BorderMode::SmallNegativeEq => Some(SMALL_NEGATIVE),
        }
    }

    /// `true` for the modes that fill the same border in every frame.
    pub fn is_uniform(self) -> bool {
        matches!(
            self,
            BorderMode::NaNEq | BorderMode::ZeroEq | BorderMode::SmallNegativeEq
        )
    }

    /// Snake-case name.
    pub fn label(self) -> &'static str {
        match self {
            BorderMode::Crop => "crop",
            BorderMode::NaN => "nan",
            BorderMode::NaNEq => "nan_eq",
            BorderMode::Zero => "zero",
            BorderMode::ZeroEq => "zero_eq",
            BorderMode::SmallNegative => "small_negative",
            BorderMode::SmallNegativeEq => "small_negative_eq",
        }
    }

    /// Parses a name produced by [`label`](Self::label).
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.label() == label)
    }
}

/// How shifts are applied to a stack.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShiftOptions {
    /// Border treatment after translation.
    pub border: BorderMode,
    /// Negate every shift before it is applied.
    pub invert: bool,
    /// Re-center the shifts on their midrange before they are applied.
    pub optimise: bool,
}

/// Translated frames and the shifts that produced them.
#[derive(Clone, Debug, PartialEq)]
pub struct ShiftedStack {
    /// Output frames; cropped when [`BorderMode::Crop`] is used.
    pub frames: Vec<OwnedImage>,
    /// Shift applied to each frame after inversion and optimisation.
    pub applied: Vec<Shift>,
}

/// Pixel widths of the uncovered margins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Borders {
    /// Columns uncovered on the left.
    pub left: usize,
    /// Columns uncovered on the right.
    pub right: usize,
    /// Rows uncovered at the top.
    pub top: usize,
    /// Rows uncovered at the bottom.
    pub bottom: usize,
}

impl Borders {
    /// Margins left by a single translation.
    pub fn of(shift: Shift) -> Self {
        let positive = |v: i32| if v > 0 { v.unsigned_abs() as usize } else { 0 };
        let negative = |v: i32| if v < 0 { v.unsigned_abs() as usize } else { 0 };
        Self {
            left: positive(shift.dx),
            right: negative(shift.dx),
            top: positive(shift.dy),
            bottom: negative(shift.dy),
        }
    }

    /// Largest margin per side over all shifts.
    pub fn union(shifts: &[Shift]) -> Self {
        shifts.iter().fold(Self::default(), |acc, &s| {
            let b = Self::of(s);
            Self {
                left: acc.left.max(b.left),
                right: acc.right.max(b.right),
                top: acc.top.max(b.top),
                bottom: acc.bottom.max(b.bottom),
            }
        })
    }
}

/// Moves the content of `frame` by `shift`; pixels with no source become 0.
pub fn translate(frame: ImageView<'_, f32>, shift: Shift) -> EftemResult<OwnedImage> {
    let (width, height) = (frame.width(), frame.height());
    let mut out = OwnedImage::filled(width, height, 0.0)?;
    let dx = shift.dx as isize;
    let dy = shift.dy as isize;
    let x_start = dx.clamp(0, width as isize) as usize;
    let x_end = (width as isize + dx).clamp(0, width as isize) as usize;
    if x_start >= x_end {
        return Ok(out);
    }
    let src_x = (x_start as isize - dx) as usize;
    let span = x_end - x_start;
    for y in 0..height {
        let src_y = y as isize - dy;
        if src_y < 0 || src_y >= height as isize {
            continue;
        }
        let Some(src) = frame.row(src_y as usize) else {
            continue;
        };
        let dst = &mut out.data_mut()[y * width..(y + 1) * width];
        dst[x_start..x_end].copy_from_slice(&src[src_x..src_x + span]);
    }
    Ok(out)
}

fn fill_border(frame: &mut OwnedImage, borders: Borders, value: f32) {
    let (width, height) = (frame.width(), frame.height());
    let left = borders.left.min(width);
    let right = borders.right.min(width);
    let top = borders.top.min(height);
    let bottom = borders.bottom.min(height);
    for (y, row) in frame.data_mut().chunks_mut(width).enumerate() {
        if y < top || y >= height - bottom {
            row.fill(value);
        } else {
            row[..left].fill(value);
            row[width - right..].fill(value);
        }
    }
}

fn crop(frame: &OwnedImage, borders: Borders) -> EftemResult<OwnedImage> {
    let width = frame.width() - borders.left - borders.right;
    let height = frame.height() - borders.top - borders.bottom;
    let roi = frame
        .view()
        .roi(borders.left, borders.top, width, height)?;
    OwnedImage::from_view(roi)
}

/// Applies `shifts` to `frames` according to `options`.
///
/// Inversion happens before optimisation. Fails before any frame is touched
/// if the lengths differ or, for [`BorderMode::Crop`], if no pixel is covered
/// in every frame.
pub fn shift_stack(
    frames: &[ImageView<'_, f32>],
    shifts: &[Shift],
    options: ShiftOptions,
) -> EftemResult<ShiftedStack> {
    let (width, height) = stack_dimensions(frames)?;
    if shifts.len() != frames.len() {
        return Err(EftemError::LengthMismatch {
            context: "shifts",
            expected: frames.len(),
            got: shifts.len(),
        });
    }

    let mut applied: Vec<Shift> = if options.invert {
        shifts.iter().map(|s| s.inverted()).collect()
    } else {
        shifts.to_vec()
    };
    if options.optimise {
        let offset = centering_shift(&applied);
        trace_event!("optimised_offset", dx = offset.dx, dy = offset.dy);
        applied = optimise_shifts(&applied);
    }

    let union = Borders::union(&applied);
    if options.border == BorderMode::Crop
        && (union.left + union.right >= width || union.top + union.bottom >= height)
    {
        return Err(EftemError::InvalidParameter(
            "shifts leave no region covered by every frame",
        ));
    }

    let _span = trace_span!(
        "shift_stack",
        frames = frames.len(),
        border = options.border.label()
    )
    .entered();
    trace_event!(
        "stack_borders",
        left = union.left,
        right = union.right,
        top = union.top,
        bottom = union.bottom
    );

    let mut out = Vec::with_capacity(frames.len());
    for (frame, &shift) in frames.iter().zip(&applied) {
        let mut moved = translate(*frame, shift)?;
        match options.border.fill_value() {
            None => moved = crop(&moved, union)?,
            Some(value) if options.border.is_uniform() => fill_border(&mut moved, union, value),
            Some(value) => fill_border(&mut moved, Borders::of(shift), value),
        }
        out.push(moved);
    }
    Ok(ShiftedStack {
        frames: out,
        applied,
    })
}

/// Like [`shift_stack`], replacing the frames of `stack`; returns the
/// applied shifts.
pub fn shift_stack_in_place(
    stack: &mut [OwnedImage],
    shifts: &[Shift],
    options: ShiftOptions,
) -> EftemResult<Vec<Shift>> {
    let shifted = {
        let views: Vec<_> = stack.iter().map(OwnedImage::view).collect();
        shift_stack(&views, shifts, options)?
    };
    for (slot, frame) in stack.iter_mut().zip(shifted.frames) {
        *slot = frame;
    }
    Ok(shifted.applied)
}
