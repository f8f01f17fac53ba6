use crate::approach::Approach;
use crate::plan::{DemandProfile, SignalTimingPlan};
use crate::queueing::{Los, SATURATION_FLOW};
use crate::rng::arrival_stream;
use crate::signal::SignalPhase;
use crate::{VehicleId, VehicleSet};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Phases shorter than this are stretched so the event loop always advances.
const MIN_PHASE_TIME: f64 = 1e-3; // s

/// A vehicle waiting at the intersection.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Vehicle {
    /// The approach the vehicle arrived on.
    pub(crate) approach: Approach,
    /// The time the vehicle joined the back of the queue, in s.
    pub(crate) arrival_time: f64,
}

/// What happens at a scheduled point in simulated time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EventKind {
    /// A vehicle joins the back of an approach queue.
    Arrival(Approach),
    /// The head vehicle of an approach crosses the stop line.
    Departure(Approach),
    /// The signal moves to the next phase.
    PhaseChange,
}

/// A scheduled event, ordered by time and then by scheduling order.
#[derive(Clone, Copy, Debug)]
struct Event {
    /// The simulated time at which the event occurs, in s.
    time: f64,
    /// Tie-breaker between events at equal times.
    seq: u64,
    /// The event's effect.
    kind: EventKind,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

/// A Poisson arrival process for one approach.
struct ArrivalProcess {
    /// The random stream exclusive to this approach.
    rng: ChaCha8Rng,
    /// The distribution of gaps between consecutive arrivals.
    gap: Exp<f64>,
}

/// Per-approach counters gathered while the simulation runs.
#[derive(Clone, Copy, Debug, Default)]
struct ApproachTotals {
    arrived: u64,
    served: u64,
    stopped: u64,
    delay_sum: f64,
    max_queue: usize,
}

/// An event-driven simulation of a single signalised intersection.
///
/// Vehicles arrive on each approach according to a Poisson process, wait in
/// a FIFO queue, and cross the stop line at the saturation headway while
/// their approach has a green signal.
pub struct Simulation {
    /// The signal timing plan under test.
    plan: SignalTimingPlan,
    /// The demand generating arrivals.
    demand: DemandProfile,
    /// The saturation flow in veh/h per approach.
    saturation_flow: f64,
    /// The vehicles currently queued at the intersection.
    vehicles: VehicleSet,
    /// The FIFO queue of each approach.
    queues: [VecDeque<VehicleId>; 4],
    /// The pending events, soonest first.
    events: BinaryHeap<Reverse<Event>>,
    /// The arrival process of each approach, if it has any demand.
    arrivals: [Option<ArrivalProcess>; 4],
    /// The next event sequence number.
    seq: u64,
    /// The current simulated time in s.
    clock: f64,
    /// The active signal phase.
    phase: SignalPhase,
    /// The time the active phase ends, in s.
    phase_ends: f64,
    /// The earliest time each approach's stop line is free again, in s.
    next_free: [f64; 4],
    /// Whether each approach already has a departure scheduled.
    departure_pending: [bool; 4],
    /// Per-approach counters.
    totals: [ApproachTotals; 4],
    /// The largest delay seen by any served vehicle, in s.
    max_delay: f64,
}

impl Simulation {
    /// Creates a simulation of the given plan under the given demand.
    pub fn new(plan: &SignalTimingPlan, demand: &DemandProfile) -> Self {
        Self {
            plan: *plan,
            demand: *demand,
            saturation_flow: SATURATION_FLOW,
            vehicles: VehicleSet::default(),
            queues: Default::default(),
            events: BinaryHeap::new(),
            arrivals: Default::default(),
            seq: 0,
            clock: 0.0,
            phase: SignalPhase::INITIAL,
            phase_ends: 0.0,
            next_free: [0.0; 4],
            departure_pending: [false; 4],
            totals: [ApproachTotals::default(); 4],
            max_delay: 0.0,
        }
    }

    /// Sets a non-default saturation flow in veh/h.
    pub fn with_saturation_flow(mut self, saturation_flow: f64) -> Self {
        self.saturation_flow = saturation_flow;
        self
    }

    /// Simulates a plan for `duration` seconds and collects the results.
    pub fn simulate(
        plan: &SignalTimingPlan,
        demand: &DemandProfile,
        duration: f64,
        seed: u64,
    ) -> SimulationResult {
        Simulation::new(plan, demand).run(duration, seed)
    }

    /// Runs the simulation from an empty intersection at time zero.
    ///
    /// Arrivals are drawn from per-approach streams derived from `seed`, so
    /// identical inputs produce identical results. Vehicles still queued
    /// when the period ends are counted as arrived but not served.
    pub fn run(&mut self, duration: f64, seed: u64) -> SimulationResult {
        self.reset(seed);
        log::trace!("simulating {:.0} s of traffic with seed {}", duration, seed);

        for approach in Approach::ALL {
            self.schedule_next_arrival(approach, duration);
        }
        self.phase_ends = self.phase.duration(&self.plan).max(MIN_PHASE_TIME);
        self.push_event(self.phase_ends, EventKind::PhaseChange);

        while let Some(Reverse(event)) = self.events.pop() {
            if event.time > duration {
                break;
            }
            self.clock = event.time;
            match event.kind {
                EventKind::Arrival(approach) => self.handle_arrival(approach, duration),
                EventKind::Departure(approach) => self.handle_departure(approach),
                EventKind::PhaseChange => self.handle_phase_change(),
            }
        }

        self.collect(duration)
    }

    /// Returns the simulation to an empty intersection at time zero.
    fn reset(&mut self, seed: u64) {
        self.vehicles.clear();
        for queue in &mut self.queues {
            queue.clear();
        }
        self.events.clear();
        self.seq = 0;
        self.clock = 0.0;
        self.phase = SignalPhase::INITIAL;
        self.phase_ends = 0.0;
        self.next_free = [0.0; 4];
        self.departure_pending = [false; 4];
        self.totals = [ApproachTotals::default(); 4];
        self.max_delay = 0.0;
        for approach in Approach::ALL {
            let rate = self.demand.arrival_rate(approach);
            self.arrivals[approach.index()] = (rate > 0.0).then(|| ArrivalProcess {
                rng: arrival_stream(seed, approach),
                gap: Exp::new(rate).expect("arrival rate must be positive"),
            });
        }
    }

    /// Schedules an event, preserving scheduling order between equal times.
    fn push_event(&mut self, time: f64, kind: EventKind) {
        self.events.push(Reverse(Event {
            time,
            seq: self.seq,
            kind,
        }));
        self.seq += 1;
    }

    /// Draws the next arrival gap on an approach and schedules the arrival,
    /// unless it falls beyond the simulated period.
    fn schedule_next_arrival(&mut self, approach: Approach, duration: f64) {
        let process = match self.arrivals[approach.index()].as_mut() {
            Some(process) => process,
            None => return,
        };
        let gap = process.gap.sample(&mut process.rng);
        let time = self.clock + gap;
        if time < duration {
            self.push_event(time, EventKind::Arrival(approach));
        }
    }

    /// A vehicle joins the back of its approach queue.
    fn handle_arrival(&mut self, approach: Approach, duration: f64) {
        let index = approach.index();
        let id = self.vehicles.insert(Vehicle {
            approach,
            arrival_time: self.clock,
        });
        self.queues[index].push_back(id);
        self.totals[index].arrived += 1;
        self.totals[index].max_queue = self.totals[index].max_queue.max(self.queues[index].len());
        self.schedule_next_arrival(approach, duration);
        self.try_serve(approach);
    }

    /// The head vehicle crosses the stop line and leaves the intersection.
    fn handle_departure(&mut self, approach: Approach) {
        let index = approach.index();
        debug_assert!(self.phase.serves(approach));
        self.departure_pending[index] = false;

        let id = self.queues[index]
            .pop_front()
            .expect("departure scheduled on an empty queue");
        let vehicle = self
            .vehicles
            .remove(id)
            .expect("departing vehicle is queued");
        debug_assert_eq!(vehicle.approach, approach);

        // A vehicle stopped if and only if it was delayed at all.
        let delay = self.clock - vehicle.arrival_time;
        let totals = &mut self.totals[index];
        totals.served += 1;
        totals.delay_sum += delay;
        if delay > 0.0 {
            totals.stopped += 1;
        }
        self.max_delay = self.max_delay.max(delay);

        self.next_free[index] = self.clock + self.headway();
        self.try_serve(approach);
    }

    /// Moves the signal to the next phase and schedules the change after it.
    fn handle_phase_change(&mut self) {
        self.phase = self.phase.next();
        let duration = self.phase.duration(&self.plan).max(MIN_PHASE_TIME);
        self.phase_ends = self.clock + duration;
        self.push_event(self.phase_ends, EventKind::PhaseChange);
        for &approach in self.phase.served_approaches() {
            self.try_serve(approach);
        }
    }

    /// Schedules a departure for the head of an approach queue, provided the
    /// approach has a green signal, no departure already scheduled, and the
    /// stop line becomes free before the phase ends.
    fn try_serve(&mut self, approach: Approach) {
        let index = approach.index();
        if self.departure_pending[index] || !self.phase.serves(approach) {
            return;
        }
        if self.queues[index].is_empty() {
            return;
        }
        let time = f64::max(self.clock, self.next_free[index]);
        if time < self.phase_ends {
            self.push_event(time, EventKind::Departure(approach));
            self.departure_pending[index] = true;
        }
    }

    /// The time between consecutive departures on one approach, in s.
    fn headway(&self) -> f64 {
        3600.0 / self.saturation_flow
    }

    /// Gathers the run's counters into a result.
    fn collect(&self, duration: f64) -> SimulationResult {
        let arrived: u64 = self.totals.iter().map(|t| t.arrived).sum();
        let served: u64 = self.totals.iter().map(|t| t.served).sum();
        let stopped: u64 = self.totals.iter().map(|t| t.stopped).sum();
        let delay_sum: f64 = self.totals.iter().map(|t| t.delay_sum).sum();

        let hours = duration / 3600.0;
        let throughput = if hours > 0.0 {
            served as f64 / hours
        } else {
            0.0
        };
        let avg_delay = if served > 0 {
            delay_sum / served as f64
        } else {
            0.0
        };
        let avg_stops = if served > 0 {
            stopped as f64 / served as f64
        } else {
            0.0
        };
        let los = if served > 0 {
            Los::from_delay(avg_delay)
        } else {
            Los::F
        };

        let approaches = Approach::ALL.map(|approach| {
            let totals = &self.totals[approach.index()];
            ApproachMetrics {
                arrived: totals.arrived,
                served: totals.served,
                avg_delay: if totals.served > 0 {
                    totals.delay_sum / totals.served as f64
                } else {
                    0.0
                },
                max_queue: totals.max_queue,
            }
        });

        SimulationResult {
            throughput,
            avg_delay,
            max_delay: self.max_delay,
            avg_stops,
            vehicles_arrived: arrived,
            vehicles_served: served,
            vehicles_stopped: stopped,
            los,
            approaches,
        }
    }
}

/// Aggregate results of one simulation run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationResult {
    /// Vehicles served per hour.
    pub throughput: f64,
    /// Average delay per served vehicle in s.
    pub avg_delay: f64,
    /// The largest delay of any served vehicle in s.
    pub max_delay: f64,
    /// The fraction of served vehicles that had to stop.
    pub avg_stops: f64,
    /// The number of vehicles that arrived.
    pub vehicles_arrived: u64,
    /// The number of vehicles served.
    pub vehicles_served: u64,
    /// The number of served vehicles that stopped.
    pub vehicles_stopped: u64,
    /// The level of service implied by the average delay.
    pub los: Los,
    /// Per-approach metrics, indexed by [Approach::index].
    pub approaches: [ApproachMetrics; 4],
}

impl SimulationResult {
    /// The largest queue observed on any approach, in vehicles.
    pub fn max_queue_length(&self) -> usize {
        self.approaches
            .iter()
            .map(|a| a.max_queue)
            .max()
            .unwrap_or(0)
    }
}

/// Results for a single approach.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ApproachMetrics {
    /// The number of vehicles that arrived.
    pub arrived: u64,
    /// The number of vehicles served.
    pub served: u64,
    /// Average delay per served vehicle in s.
    pub avg_delay: f64,
    /// The largest number of vehicles queued at once.
    pub max_queue: usize,
}
