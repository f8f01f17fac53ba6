//! Tests that exercise the genetic search end to end.

use assert_approx_eq::assert_approx_eq;
use signal_opt::{
    evaluation_seed, ConfigError, DemandProfile, FitnessEvaluator, GaConfig, ObjectiveWeights,
    Optimizer, RunHooks, SignalTimingPlan, Simulation,
};

fn reference_demand() -> DemandProfile {
    DemandProfile::new([600.0, 600.0, 400.0, 400.0]).unwrap()
}

fn baseline() -> SignalTimingPlan {
    SignalTimingPlan::new(90.0, [35.0, 35.0, 20.0, 20.0])
}

fn quick_config() -> GaConfig {
    GaConfig {
        population_size: 20,
        generations: 30,
        sim_duration: 600.0,
        ..Default::default()
    }
}

/// Test that the winner never scores worse than the baseline plan, and that
/// the best fitness never regresses while the search runs.
#[test]
fn optimised_plan_beats_the_baseline() {
    let demand = reference_demand();
    let config = quick_config();
    let optimizer = Optimizer::new(config, ObjectiveWeights::default(), demand).unwrap();
    let outcome = optimizer.run(&baseline());

    let evaluator = FitnessEvaluator::new(ObjectiveWeights::default()).unwrap();
    let baseline_result = Simulation::simulate(
        &baseline(),
        &demand,
        config.sim_duration,
        evaluation_seed(config.seed, 0, 0),
    );
    let baseline_score = evaluator.evaluate(&baseline_result, &baseline());

    assert!(outcome.fitness >= baseline_score.fitness);
    assert!(outcome.plan.is_feasible());
    assert_eq!(outcome.history.len(), outcome.generations_run);
    for pair in outcome.history.windows(2) {
        assert!(pair[1].best_fitness >= pair[0].best_fitness);
    }
}

/// Test that invalid weights are rejected before any simulation runs.
#[test]
fn unbalanced_weights_are_rejected() {
    let weights = ObjectiveWeights {
        throughput: 0.5,
        delay: 0.5,
        stops: 0.5,
        queue: 0.5,
    };
    let result = Optimizer::new(GaConfig::default(), weights, reference_demand());
    assert!(matches!(result, Err(ConfigError::WeightSum { .. })));
}

/// Test that out-of-range parameters are rejected before any simulation runs.
#[test]
fn out_of_range_parameters_are_rejected() {
    let config = GaConfig {
        population_size: 10,
        ..Default::default()
    };
    let result = Optimizer::new(config, ObjectiveWeights::default(), reference_demand());
    assert!(matches!(result, Err(ConfigError::PopulationSize { .. })));
}

/// Test that cancelling after the first generation still returns the best
/// plan seen so far.
#[test]
fn cancellation_returns_the_best_so_far() {
    let config = GaConfig {
        population_size: 20,
        generations: 20,
        sim_duration: 300.0,
        ..Default::default()
    };
    let optimizer = Optimizer::new(config, ObjectiveWeights::default(), reference_demand()).unwrap();

    let mut seen = Vec::new();
    let mut on_generation = |generation: usize, best: f64| seen.push((generation, best));
    let outcome = optimizer.run_with(
        &baseline(),
        RunHooks {
            on_generation: Some(&mut on_generation),
            cancel: Some(&|| true),
        },
    );

    assert_eq!(outcome.generations_run, 1);
    assert_eq!(outcome.history.len(), 1);
    assert_eq!(outcome.converged_generation, None);
    assert!(outcome.fitness.is_finite());
    assert_eq!(seen.len(), 1);
}

/// Test that a landscape with nothing to improve converges as soon as the
/// patience window fills.
#[test]
fn flat_landscape_converges_early() {
    let demand = DemandProfile::new([0.0; 4]).unwrap();
    let config = GaConfig {
        population_size: 20,
        generations: 30,
        patience: 20,
        sim_duration: 600.0,
        ..Default::default()
    };
    let optimizer = Optimizer::new(config, ObjectiveWeights::default(), demand).unwrap();
    let outcome = optimizer.run(&baseline());

    // With no traffic, every plan scores the delay, stops and queue weights.
    assert_approx_eq!(outcome.fitness, 0.65);
    assert_eq!(outcome.converged_generation, Some(20));
    assert_eq!(outcome.generations_run, 21);
}

/// Test that two runs with the same configuration find the same plan.
#[test]
fn the_search_is_deterministic() {
    let demand = reference_demand();
    let config = quick_config();
    let first = Optimizer::new(config, ObjectiveWeights::default(), demand)
        .unwrap()
        .run(&baseline());
    let second = Optimizer::new(config, ObjectiveWeights::default(), demand)
        .unwrap()
        .run(&baseline());

    assert_eq!(first.plan, second.plan);
    assert_eq!(first.fitness, second.fitness);
    assert_eq!(first.history, second.history);
}
