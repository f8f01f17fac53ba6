//! Signal timing plans and traffic demand.

use crate::approach::Approach;
use crate::error::ConfigError;
use crate::util::Interval;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The range of permitted cycle lengths in s.
pub const CYCLE_RANGE: Interval = Interval::new(45.0, 120.0);

/// The fixed duration of each yellow interval in s.
pub const YELLOW_TIME: f64 = 3.0; // s

/// The fixed duration of the all-red clearance interval in s.
pub const ALL_RED_TIME: f64 = 2.0; // s

/// The default minimum green time per phase in s.
pub const MIN_GREEN: f64 = 10.0; // s

/// The minimum green time per phase on arterial roads in s.
pub const ARTERIAL_MIN_GREEN: f64 = 15.0; // s

/// Tolerance used when checking that phase times close over the cycle.
pub(crate) const TIMING_TOLERANCE: f64 = 1e-6;

/// A fixed-time signal plan for the intersection.
///
/// The signal rotates through north-south green, yellow, east-west green,
/// yellow and a single all-red clearance, so a feasible plan satisfies
/// `ns_green + ew_green + 2 * yellow + all_red == cycle_length`.
///
/// [SignalTimingPlan::new] always produces a feasible plan. The fields are
/// public so externally derived plans can be written down directly; such
/// plans owe no invariants and are checked with [SignalTimingPlan::is_feasible]
/// where it matters.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SignalTimingPlan {
    /// The total cycle length in s.
    pub cycle_length: f64,
    /// The green time of each approach in s, indexed by [Approach::index].
    pub green: [f64; 4],
    /// The yellow interval after each green phase in s.
    pub yellow: f64,
    /// The all-red clearance interval in s.
    pub all_red: f64,
    /// The minimum green time per phase in s.
    pub min_green: f64,
}

impl SignalTimingPlan {
    /// Creates a plan with the given cycle length and per-approach green times.
    ///
    /// The cycle length is clamped into [CYCLE_RANGE] and the green times
    /// are renormalised so the phases exactly fill the cycle, each phase
    /// receiving at least [MIN_GREEN] seconds. The two approaches of a phase
    /// share its green time; the requested pair values contribute through
    /// their mean.
    pub fn new(cycle_length: f64, green: [f64; 4]) -> Self {
        Self::with_min_green(cycle_length, green, MIN_GREEN)
    }

    /// Creates a plan with a non-default minimum green time.
    ///
    /// Both phases must fit in the shortest cycle, so `min_green` may not
    /// exceed half the green time available after lost time.
    pub fn with_min_green(cycle_length: f64, green: [f64; 4], min_green: f64) -> Self {
        let cycle_length = if cycle_length.is_finite() {
            CYCLE_RANGE.clamp(cycle_length)
        } else {
            CYCLE_RANGE.midpoint()
        };
        let ns = 0.5 * (green[0] + green[1]);
        let ew = 0.5 * (green[2] + green[3]);
        let (ns, ew) = normalise_greens(cycle_length, ns, ew, min_green);
        Self {
            cycle_length,
            green: [ns, ns, ew, ew],
            yellow: YELLOW_TIME,
            all_red: ALL_RED_TIME,
            min_green,
        }
    }

    /// Gets the green time of the given approach in s.
    pub fn green_time(&self, approach: Approach) -> f64 {
        self.green[approach.index()]
    }

    /// Gets the green time of the north-south phase in s.
    pub fn ns_green(&self) -> f64 {
        0.5 * (self.green[0] + self.green[1])
    }

    /// Gets the green time of the east-west phase in s.
    pub fn ew_green(&self) -> f64 {
        0.5 * (self.green[2] + self.green[3])
    }

    /// Gets the lost time per cycle in s: two yellows and one all-red.
    pub fn lost_time(&self) -> f64 {
        2.0 * self.yellow + self.all_red
    }

    /// Returns true if the phase times are within bounds and close over the
    /// cycle.
    pub fn is_feasible(&self) -> bool {
        let times = [self.cycle_length, self.yellow, self.all_red];
        if times.iter().chain(&self.green).any(|t| !t.is_finite()) {
            return false;
        }
        let closes = self.ns_green() + self.ew_green() + self.lost_time() - self.cycle_length;
        CYCLE_RANGE.contains(self.cycle_length)
            && self.yellow > 0.0
            && self.all_red > 0.0
            && self
                .green
                .iter()
                .all(|g| *g >= self.min_green - TIMING_TOLERANCE)
            && closes.abs() <= TIMING_TOLERANCE
    }
}

/// Scales a pair of phase green times to exactly fill the cycle after lost
/// time, respecting the minimum green.
fn normalise_greens(cycle: f64, ns: f64, ew: f64, min_green: f64) -> (f64, f64) {
    let available = cycle - 2.0 * YELLOW_TIME - ALL_RED_TIME;
    assert!(
        2.0 * min_green <= available,
        "minimum green times exceed the available cycle time"
    );
    let total = ns + ew;
    let share = if total > 0.0 { ns / total } else { 0.5 };
    let ns = (share * available).clamp(min_green, available - min_green);
    (ns, available - ns)
}

/// Hourly traffic demand on each approach.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DemandProfile {
    /// Hourly volumes in veh/h, indexed by [Approach::index].
    volumes: [f64; 4],
}

impl DemandProfile {
    /// Creates a demand profile from hourly volumes indexed by
    /// [Approach::index].
    ///
    /// Fails if any volume is negative or not finite.
    pub fn new(volumes: [f64; 4]) -> Result<Self, ConfigError> {
        for approach in Approach::ALL {
            let value = volumes[approach.index()];
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Volume { approach, value });
            }
        }
        Ok(Self { volumes })
    }

    /// Gets the hourly volume of the given approach in veh/h.
    pub fn volume(&self, approach: Approach) -> f64 {
        self.volumes[approach.index()]
    }

    /// Gets the arrival rate of the given approach in veh/s.
    pub fn arrival_rate(&self, approach: Approach) -> f64 {
        self.volume(approach) / 3600.0
    }

    /// Gets the total hourly volume across all approaches in veh/h.
    pub fn total(&self) -> f64 {
        self.volumes.iter().sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn greens_fill_the_declared_cycle() {
        let plan = SignalTimingPlan::new(90.0, [35.0, 35.0, 20.0, 20.0]);
        assert!(plan.is_feasible());
        assert_approx_eq!(
            plan.ns_green() + plan.ew_green() + plan.lost_time(),
            plan.cycle_length
        );
        assert_approx_eq!(plan.ns_green(), 35.0 / 55.0 * 82.0);
        assert_approx_eq!(plan.ew_green(), 20.0 / 55.0 * 82.0);
    }

    #[test]
    fn pair_approaches_share_their_phase_green() {
        let plan = SignalTimingPlan::new(90.0, [40.0, 30.0, 25.0, 15.0]);
        assert_eq!(plan.green_time(Approach::North), plan.green_time(Approach::South));
        assert_eq!(plan.green_time(Approach::East), plan.green_time(Approach::West));
        assert!(plan.is_feasible());
    }

    #[test]
    fn cycle_length_is_clamped() {
        let long = SignalTimingPlan::new(300.0, [30.0, 30.0, 30.0, 30.0]);
        assert_approx_eq!(long.cycle_length, 120.0);
        let short = SignalTimingPlan::new(10.0, [30.0, 30.0, 30.0, 30.0]);
        assert_approx_eq!(short.cycle_length, 45.0);
        assert!(long.is_feasible());
        assert!(short.is_feasible());
    }

    #[test]
    fn lopsided_splits_keep_the_minimum_green() {
        let plan = SignalTimingPlan::new(45.0, [100.0, 100.0, 1.0, 1.0]);
        assert!(plan.ew_green() >= MIN_GREEN);
        assert!(plan.is_feasible());

        let arterial =
            SignalTimingPlan::with_min_green(60.0, [50.0, 50.0, 1.0, 1.0], ARTERIAL_MIN_GREEN);
        assert!(arterial.ew_green() >= ARTERIAL_MIN_GREEN);
        assert!(arterial.is_feasible());
    }

    #[test]
    fn degenerate_greens_fall_back_to_an_even_split() {
        let plan = SignalTimingPlan::new(90.0, [0.0, 0.0, 0.0, 0.0]);
        assert!(plan.is_feasible());
        assert_approx_eq!(plan.ns_green(), plan.ew_green());
    }

    #[test]
    fn hand_built_plans_can_be_infeasible() {
        let plan = SignalTimingPlan {
            cycle_length: 90.0,
            green: [35.0, 35.0, 20.0, 20.0],
            yellow: YELLOW_TIME,
            all_red: ALL_RED_TIME,
            min_green: MIN_GREEN,
        };
        // 35 + 20 + 8 falls well short of 90.
        assert!(!plan.is_feasible());
    }

    #[test]
    fn demand_rejects_bad_volumes() {
        assert!(DemandProfile::new([600.0, 600.0, 400.0, 400.0]).is_ok());
        let err = DemandProfile::new([600.0, -1.0, 400.0, 400.0]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Volume { approach: Approach::South, .. }
        ));
        assert!(DemandProfile::new([f64::NAN, 0.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn arrival_rate_is_per_second() {
        let demand = DemandProfile::new([720.0, 0.0, 0.0, 0.0]).unwrap();
        assert_approx_eq!(demand.arrival_rate(Approach::North), 0.2);
        assert_approx_eq!(demand.total(), 720.0);
    }
}
