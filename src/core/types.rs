use serde::{Deserialize, Serialize};

/// Orientation of a placed segment relative to the signed id it was inserted under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// The segment reads 5' to 3' left to right (inserted with a positive id)
    Forward,
    /// The segment reads 3' to 5' left to right (inserted with a negative id)
    Reverse,
}

impl Orientation {
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }

    /// Sign multiplier used when converting back to a signed side
    #[must_use]
    pub fn sign(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Reverse => -1,
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forward => write!(f, "+"),
            Self::Reverse => write!(f, "-"),
        }
    }
}

/// A segment together with the orientation it occupies in a reference.
///
/// Signed integers are only used at the API boundary: `+i` and `-i` name the two
/// sides of segment `i`. A segment placed as `+i` exposes side `+i` to its
/// predecessor and side `-i` to its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    /// Segment id (always positive)
    pub id: u64,

    /// Orientation within the reference
    pub orientation: Orientation,
}

impl Placement {
    #[must_use]
    pub fn new(id: u64, orientation: Orientation) -> Self {
        Self { id, orientation }
    }

    /// Build a placement from a signed side.
    ///
    /// # Panics
    ///
    /// Panics if `side` is zero, which never names a segment.
    #[must_use]
    pub fn from_signed(side: i64) -> Self {
        assert!(side != 0, "zero is not a valid segment side");
        let orientation = if side > 0 {
            Orientation::Forward
        } else {
            Orientation::Reverse
        };
        Self {
            id: side.unsigned_abs(),
            orientation,
        }
    }

    /// Signed value of this placement, i.e. the side facing the predecessor
    #[must_use]
    pub fn signed(self) -> i64 {
        segment_to_signed(self.id) * self.orientation.sign()
    }

    /// Side facing the predecessor in the reference
    #[must_use]
    pub fn left_side(self) -> i64 {
        self.signed()
    }

    /// Side facing the successor in the reference
    #[must_use]
    pub fn right_side(self) -> i64 {
        -self.signed()
    }

    #[must_use]
    pub fn flipped(self) -> Self {
        Self {
            id: self.id,
            orientation: self.orientation.flipped(),
        }
    }
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.signed())
    }
}

/// Absolute segment id of a signed side.
///
/// # Panics
///
/// Panics on zero.
#[must_use]
pub fn segment_of(side: i64) -> u64 {
    assert!(side != 0, "zero is not a valid segment side");
    side.unsigned_abs()
}

/// Convert a segment id back to a (positive) signed side.
///
/// # Panics
///
/// Panics if the id does not fit in an `i64`, which no reference can hold.
#[must_use]
pub fn segment_to_signed(id: u64) -> i64 {
    i64::try_from(id).expect("segment id exceeds i64::MAX")
}
