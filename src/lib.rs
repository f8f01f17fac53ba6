pub use approach::Approach;
pub use error::ConfigError;
pub use fitness::{FitnessEvaluator, ObjectiveWeights, Score, INFEASIBLE_FITNESS};
pub use optimizer::{GaConfig, GenerationStats, OptimizationOutcome, Optimizer, RunHooks};
pub use plan::{
    DemandProfile, SignalTimingPlan, ALL_RED_TIME, ARTERIAL_MIN_GREEN, CYCLE_RANGE, MIN_GREEN,
    YELLOW_TIME,
};
pub use queueing::{
    effective_capacity, CycleRecord, DelayEstimate, Los, PlanEstimate, QueueEstimate, QueueModel,
    SATURATION_FLOW,
};
pub use rng::evaluation_seed;
pub use signal::SignalPhase;
use simulation::Vehicle;
pub use simulation::{ApproachMetrics, Simulation, SimulationResult};
use slotmap::{new_key_type, SlotMap};
pub use util::Interval;

mod approach;
mod error;
mod fitness;
mod optimizer;
mod plan;
mod queueing;
mod rng;
mod signal;
mod simulation;
mod util;

new_key_type! {
    /// Unique ID of a queued vehicle.
    pub struct VehicleId;
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;
