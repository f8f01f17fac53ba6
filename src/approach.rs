//! The compass approaches feeding the intersection.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One of the four approaches to the intersection.
///
/// Approaches double as dense array indices via [Approach::index], and
/// [Approach::ALL] fixes the iteration order used throughout the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Approach {
    North,
    South,
    East,
    West,
}

impl Approach {
    /// All approaches in the fixed iteration order.
    pub const ALL: [Approach; 4] = [
        Approach::North,
        Approach::South,
        Approach::East,
        Approach::West,
    ];

    /// Gets the dense index of the approach, matching the order of [Approach::ALL].
    pub const fn index(self) -> usize {
        match self {
            Approach::North => 0,
            Approach::South => 1,
            Approach::East => 2,
            Approach::West => 3,
        }
    }

    /// Returns true if this is one of the north-south approaches.
    pub const fn is_north_south(self) -> bool {
        matches!(self, Approach::North | Approach::South)
    }
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Approach::North => "north",
            Approach::South => "south",
            Approach::East => "east",
            Approach::West => "west",
        };
        f.write_str(label)
    }
}
