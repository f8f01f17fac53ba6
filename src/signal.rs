//! The signal phase state machine.

use crate::approach::Approach;
use crate::plan::SignalTimingPlan;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One phase of the fixed signal rotation.
///
/// Phases always advance in the same order: north-south green, north-south
/// yellow, east-west green, east-west yellow, then a single all-red
/// clearance before the rotation repeats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SignalPhase {
    NorthSouthGreen,
    NorthSouthYellow,
    EastWestGreen,
    EastWestYellow,
    AllRed,
}

impl SignalPhase {
    /// The phase at the start of every cycle.
    pub const INITIAL: SignalPhase = SignalPhase::NorthSouthGreen;

    /// Gets the phase that follows this one.
    pub fn next(self) -> SignalPhase {
        use SignalPhase::*;
        match self {
            NorthSouthGreen => NorthSouthYellow,
            NorthSouthYellow => EastWestGreen,
            EastWestGreen => EastWestYellow,
            EastWestYellow => AllRed,
            AllRed => NorthSouthGreen,
        }
    }

    /// Gets the duration of this phase under the given plan in s.
    pub fn duration(self, plan: &SignalTimingPlan) -> f64 {
        use SignalPhase::*;
        match self {
            NorthSouthGreen => plan.ns_green(),
            EastWestGreen => plan.ew_green(),
            NorthSouthYellow | EastWestYellow => plan.yellow,
            AllRed => plan.all_red,
        }
    }

    /// Returns true if vehicles on the given approach may depart during
    /// this phase.
    pub fn serves(self, approach: Approach) -> bool {
        match self {
            SignalPhase::NorthSouthGreen => approach.is_north_south(),
            SignalPhase::EastWestGreen => !approach.is_north_south(),
            _ => false,
        }
    }

    /// Returns true if this is a green phase.
    pub fn is_green(self) -> bool {
        matches!(self, SignalPhase::NorthSouthGreen | SignalPhase::EastWestGreen)
    }

    /// The approaches served while this phase runs.
    pub fn served_approaches(self) -> &'static [Approach] {
        match self {
            SignalPhase::NorthSouthGreen => &[Approach::North, Approach::South],
            SignalPhase::EastWestGreen => &[Approach::East, Approach::West],
            _ => &[],
        }
    }
}
