//! Multi-objective scoring of simulated timing plans.

use crate::error::ConfigError;
use crate::plan::SignalTimingPlan;
use crate::simulation::SimulationResult;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Throughput at which the throughput score saturates, in veh/h.
const THROUGHPUT_CEILING: f64 = 3600.0; // veh/h

/// Average delay at which the delay score bottoms out, in s.
const DELAY_CEILING: f64 = 120.0; // s

/// Queue length at which the queue score bottoms out, in vehicles.
const QUEUE_CEILING: f64 = 50.0; // veh

/// The tolerance on the sum of the objective weights.
const WEIGHT_TOLERANCE: f64 = 1e-6;

/// The fitness assigned to plans that violate timing constraints.
///
/// Far below the [0, 1] range of feasible scores, so a feasible plan always
/// outranks an infeasible one.
pub const INFEASIBLE_FITNESS: f64 = -1000.0;

/// The relative importance of each objective. Weights must be non-negative
/// and sum to one.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObjectiveWeights {
    /// Weight on vehicles served per hour.
    pub throughput: f64,
    /// Weight on average delay per vehicle.
    pub delay: f64,
    /// Weight on the fraction of vehicles that stop.
    pub stops: f64,
    /// Weight on the largest observed queue.
    pub queue: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            throughput: 0.35,
            delay: 0.35,
            stops: 0.15,
            queue: 0.15,
        }
    }
}

impl ObjectiveWeights {
    /// Checks that every weight is finite and non-negative and that the
    /// weights sum to one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = [
            ("throughput", self.throughput),
            ("delay", self.delay),
            ("stops", self.stops),
            ("queue", self.queue),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Weight { name, value });
            }
        }
        let total = weights.iter().map(|(_, value)| value).sum::<f64>();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::WeightSum { total });
        }
        Ok(())
    }
}

/// The fitness of one scored plan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Score {
    /// The weighted fitness; in [0, 1] unless the penalty applied.
    pub fitness: f64,
    /// Whether the infeasibility penalty was applied.
    pub penalty_applied: bool,
}

/// Scores simulation results against a set of objective weights.
#[derive(Clone, Copy, Debug)]
pub struct FitnessEvaluator {
    weights: ObjectiveWeights,
}

impl FitnessEvaluator {
    /// Creates an evaluator, validating the weights first.
    pub fn new(weights: ObjectiveWeights) -> Result<Self, ConfigError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    /// The weights in use.
    pub fn weights(&self) -> ObjectiveWeights {
        self.weights
    }

    /// Scores one simulated plan. Higher is better.
    ///
    /// Each metric is normalised against a fixed ceiling and clamped to
    /// [0, 1], so the weighted sum is also in [0, 1]. A plan that violates
    /// its timing constraints scores [INFEASIBLE_FITNESS] regardless of how
    /// it simulated.
    pub fn evaluate(&self, result: &SimulationResult, plan: &SignalTimingPlan) -> Score {
        if !plan.is_feasible() {
            return Score {
                fitness: INFEASIBLE_FITNESS,
                penalty_applied: true,
            };
        }

        let throughput = if result.throughput.is_finite() {
            (result.throughput / THROUGHPUT_CEILING).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let delay = ratio_score(result.avg_delay, DELAY_CEILING);
        let stops = ratio_score(result.avg_stops, 1.0);
        let queue = ratio_score(result.max_queue_length() as f64, QUEUE_CEILING);

        let fitness = self.weights.throughput * throughput
            + self.weights.delay * delay
            + self.weights.stops * stops
            + self.weights.queue * queue;
        Score {
            fitness,
            penalty_applied: false,
        }
    }
}

/// Scores a cost metric as one minus its share of `ceiling`, clamped to
/// [0, 1]. Non-finite values take the worst score.
fn ratio_score(value: f64, ceiling: f64) -> f64 {
    if value.is_finite() {
        1.0 - (value / ceiling).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::queueing::Los;
    use crate::simulation::ApproachMetrics;
    use assert_approx_eq::assert_approx_eq;

    fn plan() -> SignalTimingPlan {
        SignalTimingPlan::new(90.0, [35.0, 35.0, 20.0, 20.0])
    }

    fn result(throughput: f64, delay: f64, stops: f64, max_queue: usize) -> SimulationResult {
        SimulationResult {
            throughput,
            avg_delay: delay,
            max_delay: 2.0 * delay,
            avg_stops: stops,
            vehicles_arrived: 100,
            vehicles_served: 100,
            vehicles_stopped: (100.0 * stops) as u64,
            los: Los::from_delay(delay),
            approaches: [ApproachMetrics {
                arrived: 25,
                served: 25,
                avg_delay: delay,
                max_queue,
            }; 4],
        }
    }

    #[test]
    fn default_weights_validate() {
        assert!(ObjectiveWeights::default().validate().is_ok());
    }

    #[test]
    fn weights_must_sum_to_one() {
        let weights = ObjectiveWeights {
            throughput: 0.5,
            delay: 0.5,
            stops: 0.5,
            queue: 0.5,
        };
        assert!(matches!(
            weights.validate(),
            Err(ConfigError::WeightSum { .. })
        ));
    }

    #[test]
    fn negative_weights_are_rejected() {
        let weights = ObjectiveWeights {
            throughput: 0.6,
            delay: -0.1,
            stops: 0.3,
            queue: 0.2,
        };
        assert!(matches!(
            weights.validate(),
            Err(ConfigError::Weight { name: "delay", .. })
        ));
    }

    #[test]
    fn scores_span_the_unit_interval() {
        let evaluator = FitnessEvaluator::new(ObjectiveWeights::default()).unwrap();
        let best = evaluator.evaluate(&result(3600.0, 0.0, 0.0, 0), &plan());
        let worst = evaluator.evaluate(&result(0.0, 200.0, 1.0, 100), &plan());
        assert_approx_eq!(best.fitness, 1.0);
        assert_approx_eq!(worst.fitness, 0.0);
        assert!(!best.penalty_applied);
    }

    #[test]
    fn better_metrics_score_higher() {
        let evaluator = FitnessEvaluator::new(ObjectiveWeights::default()).unwrap();
        let plan = plan();
        let base = evaluator.evaluate(&result(1800.0, 15.0, 0.4, 5), &plan);
        let slower = evaluator.evaluate(&result(1800.0, 40.0, 0.4, 5), &plan);
        let thinner = evaluator.evaluate(&result(900.0, 15.0, 0.4, 5), &plan);
        let stoppier = evaluator.evaluate(&result(1800.0, 15.0, 0.8, 5), &plan);
        let longer = evaluator.evaluate(&result(1800.0, 15.0, 0.4, 30), &plan);
        assert!(base.fitness > slower.fitness);
        assert!(base.fitness > thinner.fitness);
        assert!(base.fitness > stoppier.fitness);
        assert!(base.fitness > longer.fitness);
    }

    #[test]
    fn infeasible_plans_are_penalised() {
        let infeasible = SignalTimingPlan {
            cycle_length: 90.0,
            green: [35.0, 35.0, 20.0, 20.0],
            yellow: 3.0,
            all_red: 2.0,
            min_green: 10.0,
        };
        assert!(!infeasible.is_feasible());
        let evaluator = FitnessEvaluator::new(ObjectiveWeights::default()).unwrap();
        let score = evaluator.evaluate(&result(1800.0, 15.0, 0.4, 5), &infeasible);
        assert!(score.penalty_applied);
        assert_approx_eq!(score.fitness, INFEASIBLE_FITNESS);
        let worst_feasible = evaluator.evaluate(&result(0.0, 200.0, 1.0, 100), &plan());
        assert!(score.fitness < worst_feasible.fitness);
    }
}
