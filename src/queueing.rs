//! Analytical queueing estimates for signalised approaches.
//!
//! Implements Webster's uniform delay term with an M/M/1 random component,
//! plus queue length and stop probability estimates and level of service
//! grading. These closed-form figures complement the event simulation: they
//! are exact enough for screening and cross-checks at a fraction of the cost.

use crate::approach::Approach;
use crate::plan::{DemandProfile, SignalTimingPlan};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The default saturation flow rate in veh/h per lane.
pub const SATURATION_FLOW: f64 = 1800.0; // veh/h

/// The default period over which oversaturated queues accumulate in s.
const ANALYSIS_PERIOD: f64 = 900.0; // s

/// Degree of saturation at which the M/M/1 random term is capped.
const RANDOM_DELAY_CAP: f64 = 0.95;

/// Level of service grade, from free flow (A) to breakdown (F).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Los {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Los {
    /// Grades an average control delay in seconds per vehicle.
    ///
    /// Thresholds are inclusive upper bounds: 10, 20, 35, 55 and 80 s.
    pub fn from_delay(delay: f64) -> Los {
        if delay <= 10.0 {
            Los::A
        } else if delay <= 20.0 {
            Los::B
        } else if delay <= 35.0 {
            Los::C
        } else if delay <= 55.0 {
            Los::D
        } else if delay <= 80.0 {
            Los::E
        } else {
            Los::F
        }
    }
}

impl std::fmt::Display for Los {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let grade = match self {
            Los::A => "A",
            Los::B => "B",
            Los::C => "C",
            Los::D => "D",
            Los::E => "E",
            Los::F => "F",
        };
        f.write_str(grade)
    }
}

/// A closed-form delay estimate for one approach.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DelayEstimate {
    /// Delay from the signal's red time assuming uniform arrivals, in s.
    pub uniform: f64,
    /// Additional delay from randomness in the arrival process, in s.
    pub random: f64,
    /// Total estimated delay per vehicle in s.
    pub total: f64,
    /// The degree of saturation (volume over capacity).
    pub saturation: f64,
}

/// An estimate of queue lengths on one approach, in vehicles.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QueueEstimate {
    /// The long-run average queue length.
    pub average: f64,
    /// The expected peak queue length.
    pub max: f64,
}

/// Queue development over one cycle of the fluid approximation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CycleRecord {
    /// The cycle index, starting at zero.
    pub cycle: usize,
    /// Vehicles arriving during the cycle.
    pub arrivals: f64,
    /// Vehicles served during the cycle.
    pub departures: f64,
    /// The queue at the start of the cycle.
    pub start_queue: f64,
    /// The queue carried into the next cycle.
    pub end_queue: f64,
    /// The peak queue during the cycle.
    pub max_queue: f64,
}

/// A whole-plan analytical estimate.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlanEstimate {
    /// The delay estimate of each approach, indexed by [Approach::index].
    pub delays: [DelayEstimate; 4],
    /// The volume-weighted average delay in s.
    pub avg_delay: f64,
    /// The level of service implied by the average delay.
    pub los: Los,
}

/// A closed-form queueing model of a signalised approach.
#[derive(Clone, Copy, Debug)]
pub struct QueueModel {
    /// The saturation flow in veh/h per lane.
    saturation_flow: f64,
    /// The period over which oversaturated queues accumulate, in s.
    analysis_period: f64,
}

impl Default for QueueModel {
    fn default() -> Self {
        Self {
            saturation_flow: SATURATION_FLOW,
            analysis_period: ANALYSIS_PERIOD,
        }
    }
}

impl QueueModel {
    /// Creates a model with the default saturation flow.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a model with a non-default saturation flow.
    pub fn with_saturation_flow(saturation_flow: f64) -> Self {
        Self {
            saturation_flow,
            ..Default::default()
        }
    }

    /// Gets the capacity of an approach in veh/h.
    pub fn capacity(&self, green: f64, cycle: f64) -> f64 {
        self.saturation_flow * green / cycle
    }

    /// Gets the degree of saturation of an approach.
    pub fn degree_of_saturation(&self, volume: f64, green: f64, cycle: f64) -> f64 {
        volume / self.capacity(green, cycle).max(f64::EPSILON)
    }

    /// Estimates the control delay per vehicle on an approach.
    ///
    /// Combines Webster's uniform term with an M/M/1 random term. The random
    /// term caps its saturation input at 0.95, and past saturation a
    /// deterministic overflow term `(T/2)(x - 1)` takes over, so the
    /// estimate stays finite and keeps growing as demand grows.
    pub fn delay(&self, volume: f64, green: f64, cycle: f64) -> DelayEstimate {
        let x = self.degree_of_saturation(volume, green, cycle);
        let ratio = (green / cycle).clamp(0.0, 1.0);

        let uniform = {
            let headroom = 1.0 - ratio * x.min(1.0);
            0.5 * cycle * (1.0 - ratio).powi(2) / headroom.max(f64::EPSILON)
        };

        let arrival_rate = volume / 3600.0; // veh/s
        let random = if arrival_rate > 0.0 {
            let capped = x.min(RANDOM_DELAY_CAP);
            let mm1 = capped * capped / (2.0 * arrival_rate * (1.0 - capped));
            let overflow = if x >= 1.0 {
                0.5 * self.analysis_period * (x - 1.0)
            } else {
                0.0
            };
            mm1 + overflow
        } else {
            0.0
        };

        DelayEstimate {
            uniform,
            random,
            total: uniform + random,
            saturation: x,
        }
    }

    /// Estimates the probability that an arriving vehicle has to stop.
    ///
    /// Uses the red-time ratio, scaled up once the approach runs over 80%
    /// of capacity, and capped at one.
    pub fn stop_probability(&self, volume: f64, green: f64, cycle: f64) -> f64 {
        let x = self.degree_of_saturation(volume, green, cycle);
        let red_ratio = 1.0 - (green / cycle).clamp(0.0, 1.0);
        let pressure = if x > 0.8 { 1.0 + (x - 0.8) } else { 1.0 };
        (red_ratio * pressure).min(1.0)
    }

    /// Estimates queue lengths on an approach.
    ///
    /// Below saturation this is the M/M/1 mean queue with a peak of twice
    /// the mean; past saturation the queue also grows deterministically over
    /// the analysis period.
    pub fn queue_lengths(&self, volume: f64, green: f64, cycle: f64) -> QueueEstimate {
        let x = self.degree_of_saturation(volume, green, cycle);
        if x < 1.0 {
            let rho = x.min(RANDOM_DELAY_CAP);
            let average = rho * rho / (1.0 - rho);
            QueueEstimate {
                average,
                max: 2.0 * average,
            }
        } else {
            let cap = RANDOM_DELAY_CAP;
            let base = cap * cap / (1.0 - cap);
            let surplus = (volume - self.capacity(green, cycle)) / 3600.0; // veh/s
            QueueEstimate {
                average: base + 0.5 * surplus * self.analysis_period,
                max: 2.0 * base + surplus * self.analysis_period,
            }
        }
    }

    /// Traces queue development over consecutive cycles of a fluid
    /// approximation, starting from an empty queue.
    ///
    /// Volumes are hourly; queues are reported as fractional vehicle counts.
    pub fn cycle_evolution(
        &self,
        volume: f64,
        green: f64,
        red: f64,
        cycles: usize,
    ) -> Vec<CycleRecord> {
        let arrival = volume / 3600.0; // veh/s
        let service = self.saturation_flow / 3600.0; // veh/s
        let mut queue = 0.0;
        let mut records = Vec::with_capacity(cycles);
        for cycle in 0..cycles {
            let start_queue = queue;
            let arrivals = arrival * (red + green);
            let departures = (start_queue + arrivals).min(service * green);
            queue = start_queue + arrivals - departures;
            let max_queue = (start_queue + arrival * red).max(queue);
            records.push(CycleRecord {
                cycle,
                arrivals,
                departures,
                start_queue,
                end_queue: queue,
                max_queue,
            });
        }
        records
    }

    /// Estimates delay and level of service for a whole plan.
    ///
    /// Returns per-approach estimates and their volume-weighted average,
    /// the fast counterpart to running the event simulation.
    pub fn plan_estimate(&self, plan: &SignalTimingPlan, demand: &DemandProfile) -> PlanEstimate {
        let delays = Approach::ALL.map(|approach| {
            self.delay(
                demand.volume(approach),
                plan.green_time(approach),
                plan.cycle_length,
            )
        });
        let total_volume = demand.total();
        let avg_delay = if total_volume > 0.0 {
            Approach::ALL
                .iter()
                .map(|a| demand.volume(*a) * delays[a.index()].total)
                .sum::<f64>()
                / total_volume
        } else {
            0.0
        };
        PlanEstimate {
            delays,
            avg_delay,
            los: Los::from_delay(avg_delay),
        }
    }
}

/// Computes the capacity of an approach from its effective green time,
/// accounting for start-up and clearance lost time.
pub fn effective_capacity(saturation_flow: f64, green: f64, cycle: f64, lost_time: f64) -> f64 {
    let effective_green = (green - lost_time).max(0.0);
    saturation_flow * effective_green / cycle
}
