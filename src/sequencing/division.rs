use crate::error::{Error, Result};

/// A musical fraction of a measure, kept as an exact n/d ratio.
///
/// `Division::QUARTER` is one quarter of a measure; in 4/4 that is a quarter
/// note. Numerators larger than the denominator reach into later measures
/// (`8/4` is two 4/4 measures).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Division {
    /// Numerator: how many parts
    pub numerator: u32,
    /// Denominator: of what size (4 = quarter, 8 = eighth, etc.)
    pub denominator: u32,
}

impl Division {
    /// The start of the measure
    pub const ZERO: Division = Division {
        numerator: 0,
        denominator: 1,
    };
    pub const WHOLE: Division = Division {
        numerator: 1,
        denominator: 1,
    };
    pub const HALF: Division = Division {
        numerator: 1,
        denominator: 2,
    };
    pub const QUARTER: Division = Division {
        numerator: 1,
        denominator: 4,
    };
    pub const EIGHTH: Division = Division {
        numerator: 1,
        denominator: 8,
    };
    pub const SIXTEENTH: Division = Division {
        numerator: 1,
        denominator: 16,
    };
    pub const THIRTY_SECOND: Division = Division {
        numerator: 1,
        denominator: 32,
    };

    pub const DOTTED_QUARTER: Division = Division::QUARTER.dotted();
    pub const QUARTER_TRIPLET: Division = Division::QUARTER.triplet();
    pub const EIGHTH_TRIPLET: Division = Division::EIGHTH.triplet();

    pub fn new(numerator: u32, denominator: u32) -> Self {
        assert!(denominator > 0, "Division denominator must be > 0");
        Self {
            numerator,
            denominator,
        }
    }

    /// Apply a dot: multiply by 3/2
    pub const fn dotted(self) -> Self {
        Division {
            numerator: self.numerator * 3,
            denominator: self.denominator * 2,
        }
    }

    /// Three in the time of two: multiply by 2/3
    pub const fn triplet(self) -> Self {
        self.tuplet(2, 3)
    }

    /// General tuplet: `played` notes in the time of `in_time_of` notes
    pub const fn tuplet(self, in_time_of: u32, played: u32) -> Self {
        Division {
            numerator: self.numerator * in_time_of,
            denominator: self.denominator * played,
        }
    }

    /// Reduce the fraction to lowest terms
    pub const fn reduce(self) -> Self {
        let gcd = const_gcd(self.numerator, self.denominator);
        if gcd == 0 {
            return self;
        }
        Division {
            numerator: self.numerator / gcd,
            denominator: self.denominator / gcd,
        }
    }

    /// Ticks covered by this fraction of a measure of `ticks_per_measure`.
    ///
    /// Fails with [`Error::InexactDivision`] when the result is not a whole
    /// number of ticks.
    pub fn ticks_in(&self, ticks_per_measure: u64) -> Result<u64> {
        let scaled = self.numerator as u64 * ticks_per_measure;
        let denominator = self.denominator as u64;
        if scaled % denominator != 0 {
            return Err(Error::InexactDivision {
                numerator: self.numerator,
                denominator: self.denominator,
                ticks_per_measure,
            });
        }
        Ok(scaled / denominator)
    }

    /// Like [`Division::ticks_in`] but rounds down instead of failing
    pub fn floor_ticks_in(&self, ticks_per_measure: u64) -> u64 {
        self.numerator as u64 * ticks_per_measure / self.denominator as u64
    }
}

impl From<(u32, u32)> for Division {
    fn from((numerator, denominator): (u32, u32)) -> Self {
        Division::new(numerator, denominator)
    }
}

impl std::fmt::Display for Division {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Euclid; used to reduce fractions to lowest terms
const fn const_gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let temp = b;
        b = a % b;
        a = temp;
    }
    a
}
