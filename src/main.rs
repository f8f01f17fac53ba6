use signal_opt::{
    DemandProfile, GaConfig, ObjectiveWeights, Optimizer, QueueModel, RunHooks, SignalTimingPlan,
    Simulation,
};

fn main() {
    env_logger::init();

    let demand = DemandProfile::new([600.0, 600.0, 400.0, 400.0]).unwrap();
    let baseline = SignalTimingPlan::new(90.0, [35.0, 35.0, 20.0, 20.0]);

    let result = Simulation::simulate(&baseline, &demand, 3600.0, 42);
    println!(
        "Baseline: {:.0} veh/h, {:.1} s delay, LOS {}",
        result.throughput, result.avg_delay, result.los
    );
    let estimate = QueueModel::new().plan_estimate(&baseline, &demand);
    println!(
        "Analytical check: {:.1} s delay, LOS {}",
        estimate.avg_delay, estimate.los
    );

    println!("Optimising...");
    let optimizer =
        Optimizer::new(GaConfig::default(), ObjectiveWeights::default(), demand).unwrap();
    let mut progress = |generation: usize, best: f64| {
        if generation % 10 == 0 {
            println!("  generation {}: best fitness {:.4}", generation, best);
        }
    };
    let outcome = optimizer.run_with(
        &baseline,
        RunHooks {
            on_generation: Some(&mut progress),
            cancel: None,
        },
    );

    println!(
        "Optimised: {:.1} s cycle ({:.1} s NS / {:.1} s EW green)",
        outcome.plan.cycle_length,
        outcome.plan.ns_green(),
        outcome.plan.ew_green()
    );
    println!(
        "  {:.0} veh/h, {:.1} s delay, LOS {}, fitness {:.4}",
        outcome.result.throughput, outcome.result.avg_delay, outcome.result.los, outcome.fitness
    );
    match outcome.converged_generation {
        Some(generation) => println!("  converged after {} generations", generation),
        None => println!("  ran all {} generations", outcome.generations_run),
    }
}
