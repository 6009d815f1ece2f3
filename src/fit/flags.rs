use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Set of numerical failures raised by a fit.
///
/// The bit values are stable and are what the error map stores per pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FitErrors(u8);

impl FitErrors {
    /// No failure.
    pub const NONE: FitErrors = FitErrors(0);
    /// The exponent became NaN.
    pub const R_NAN: FitErrors = FitErrors(1);
    /// The exponent became infinite.
    pub const R_INFINITE: FitErrors = FitErrors(2);
    /// The iteration oscillated or diverged.
    pub const CONVERGE: FitErrors = FitErrors(4);
    /// The prefactor became NaN.
    pub const A_NAN: FitErrors = FitErrors(8);
    /// The prefactor became infinite.
    pub const A_INFINITE: FitErrors = FitErrors(16);

    const NAMED: [(FitErrors, &'static str); 5] = [
        (FitErrors::R_NAN, "r is NaN"),
        (FitErrors::R_INFINITE, "r is infinite"),
        (FitErrors::CONVERGE, "no convergence"),
        (FitErrors::A_NAN, "a is NaN"),
        (FitErrors::A_INFINITE, "a is infinite"),
    ];

    /// Rebuilds a set from its stored bits; unknown bits are dropped.
    pub fn from_bits(bits: u8) -> Self {
        FitErrors(bits & 0b1_1111)
    }

    /// Raw bit pattern.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// `true` if no flag is set.
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// `true` if every flag of `other` is set.
    pub fn contains(self, other: FitErrors) -> bool {
        self.0 & other.0 == other.0
    }

    /// Adds the flags of `other`.
    pub fn insert(&mut self, other: FitErrors) {
        self.0 |= other.0;
    }

    /// Iterates over the individual flags that are set.
    pub fn iter(self) -> impl Iterator<Item = FitErrors> {
        Self::NAMED
            .into_iter()
            .map(|(flag, _)| flag)
            .filter(move |&flag| self.contains(flag))
    }
}

impl BitOr for FitErrors {
    type Output = FitErrors;

    fn bitor(self, rhs: FitErrors) -> FitErrors {
        FitErrors(self.0 | rhs.0)
    }
}

impl BitOrAssign for FitErrors {
    fn bitor_assign(&mut self, rhs: FitErrors) {
        self.insert(rhs);
    }
}

impl fmt::Display for FitErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("none");
        }
        let mut first = true;
        for (flag, name) in Self::NAMED {
            if self.contains(flag) {
                if !first {
                    f.write_str(", ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}
