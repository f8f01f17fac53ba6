//! A genetic algorithm search over signal timing plans.

mod population;

use crate::error::ConfigError;
use crate::fitness::{FitnessEvaluator, ObjectiveWeights};
use crate::plan::{
    DemandProfile, SignalTimingPlan, ALL_RED_TIME, CYCLE_RANGE, MIN_GREEN, YELLOW_TIME,
};
use crate::rng::{evaluation_seed, operator_stream};
use crate::simulation::{Simulation, SimulationResult};
use population::{cached_fitness, crossover, mutate, tournament, GeneBounds, Individual, Population};
use rand_chacha::ChaCha8Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The number of contenders in each selection tournament.
const TOURNAMENT_SIZE: usize = 3;

/// The least fitness gain that counts as an improvement.
const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// Tunable parameters of the genetic algorithm.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GaConfig {
    /// The number of candidate plans per generation, between 20 and 200.
    pub population_size: usize,
    /// The most generations to run, between 20 and 500.
    pub generations: usize,
    /// The probability that a bred pair exchanges genes.
    pub crossover_rate: f64,
    /// The probability that each gene mutates.
    pub mutation_rate: f64,
    /// The number of fittest individuals copied over unchanged.
    pub elite_count: usize,
    /// Generations without improvement before the search stops.
    pub patience: usize,
    /// The simulated period per evaluation, in s.
    pub sim_duration: f64,
    /// The minimum green time of decoded plans, in s.
    pub min_green: f64,
    /// The seed from which every random stream derives.
    pub seed: u64,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            generations: 100,
            crossover_rate: 0.8,
            mutation_rate: 0.1,
            elite_count: 2,
            patience: 20,
            sim_duration: 3600.0,
            min_green: MIN_GREEN,
            seed: 42,
        }
    }
}

impl GaConfig {
    /// Checks every parameter against its supported range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(20..=200).contains(&self.population_size) {
            return Err(ConfigError::PopulationSize {
                value: self.population_size,
            });
        }
        if !(20..=500).contains(&self.generations) {
            return Err(ConfigError::Generations {
                value: self.generations,
            });
        }
        let probabilities = [
            ("crossover rate", self.crossover_rate),
            ("mutation rate", self.mutation_rate),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Probability { name, value });
            }
        }
        if self.patience == 0 {
            return Err(ConfigError::Patience);
        }
        if 2 * self.elite_count >= self.population_size {
            return Err(ConfigError::EliteCount {
                value: self.elite_count,
                population: self.population_size,
            });
        }
        if !self.min_green.is_finite()
            || self.min_green <= 0.0
            || 2.0 * self.min_green + 2.0 * YELLOW_TIME + ALL_RED_TIME > CYCLE_RANGE.min
        {
            return Err(ConfigError::MinGreen {
                value: self.min_green,
            });
        }
        if !self.sim_duration.is_finite() || self.sim_duration <= 0.0 {
            return Err(ConfigError::Duration {
                value: self.sim_duration,
            });
        }
        Ok(())
    }
}

/// Progress of one generation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GenerationStats {
    /// The generation index, starting at zero.
    pub generation: usize,
    /// The best fitness in the population.
    pub best_fitness: f64,
    /// The mean fitness of the population.
    pub mean_fitness: f64,
}

/// The result of an optimisation run.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimizationOutcome {
    /// The best plan found.
    pub plan: SignalTimingPlan,
    /// The simulation behind the best plan's score.
    pub result: SimulationResult,
    /// The best plan's fitness.
    pub fitness: f64,
    /// Per-generation progress, oldest first.
    pub history: Vec<GenerationStats>,
    /// The generation at which the search converged, if it stopped early.
    pub converged_generation: Option<usize>,
    /// The number of generations actually evaluated.
    pub generations_run: usize,
}

/// Optional callbacks observing a run in progress.
#[derive(Default)]
pub struct RunHooks<'a> {
    /// Called after each generation with its index and best fitness.
    pub on_generation: Option<&'a mut dyn FnMut(usize, f64)>,
    /// Polled between generations; returning true stops the run.
    pub cancel: Option<&'a dyn Fn() -> bool>,
}

/// A genetic algorithm searching for well-performing timing plans.
///
/// Plans are scored by simulating them under a fixed demand profile. The
/// search is fully deterministic for a given configuration: arrivals,
/// operator draws and evaluation seeds all derive from [GaConfig::seed].
pub struct Optimizer {
    /// The algorithm parameters.
    config: GaConfig,
    /// The fitness evaluator.
    evaluator: FitnessEvaluator,
    /// The demand the plans are evaluated under.
    demand: DemandProfile,
    /// The value range of each gene.
    bounds: GeneBounds,
}

impl Optimizer {
    /// Creates an optimiser, validating the configuration and weights.
    pub fn new(
        config: GaConfig,
        weights: ObjectiveWeights,
        demand: DemandProfile,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let evaluator = FitnessEvaluator::new(weights)?;
        Ok(Self {
            config,
            evaluator,
            demand,
            bounds: GeneBounds::new(config.min_green),
        })
    }

    /// Runs the search from the given baseline plan.
    pub fn run(&self, baseline: &SignalTimingPlan) -> OptimizationOutcome {
        self.run_with(baseline, RunHooks::default())
    }

    /// Runs the search, reporting progress through `hooks`.
    ///
    /// The baseline joins the initial population, so the winner never scores
    /// worse than the baseline. The search stops early once the best fitness
    /// has not improved for [GaConfig::patience] generations, or when the
    /// cancel hook fires.
    pub fn run_with(
        &self,
        baseline: &SignalTimingPlan,
        mut hooks: RunHooks<'_>,
    ) -> OptimizationOutcome {
        log::info!(
            "optimising over {} generations of {} plans",
            self.config.generations,
            self.config.population_size
        );
        let mut rng = operator_stream(self.config.seed);
        let mut population = Population::seeded(
            baseline,
            self.config.population_size,
            &self.bounds,
            &mut rng,
        );
        let mut history: Vec<GenerationStats> = Vec::new();
        let mut converged = None;

        for _ in 0..self.config.generations {
            self.evaluate(&mut population);

            let stats = GenerationStats {
                generation: population.generation,
                best_fitness: cached_fitness(&population.individuals[population.best_index()]),
                mean_fitness: population.mean_fitness(),
            };
            history.push(stats);
            log::debug!(
                "generation {}: best fitness {:.4}, mean {:.4}",
                stats.generation,
                stats.best_fitness,
                stats.mean_fitness
            );
            if let Some(on_generation) = hooks.on_generation.as_mut() {
                on_generation(stats.generation, stats.best_fitness);
            }

            if let Some(cancel) = hooks.cancel {
                if cancel() {
                    log::info!("optimisation cancelled at generation {}", stats.generation);
                    break;
                }
            }
            if let Some(at) = converged_at(&history, self.config.patience) {
                converged = Some(at);
                log::info!("optimisation converged at generation {}", at);
                break;
            }
            if population.generation + 1 < self.config.generations {
                self.evolve(&mut population, &mut rng);
            }
        }

        self.outcome(&population, history, converged)
    }

    /// Simulates and scores every individual without a cached fitness.
    ///
    /// Elites keep their cache, so the best fitness never regresses from one
    /// generation to the next.
    fn evaluate(&self, population: &mut Population) {
        let generation = population.generation;
        for (index, individual) in population.individuals.iter_mut().enumerate() {
            if individual.fitness().is_some() {
                continue;
            }
            let plan = individual.decode(&self.bounds);
            let seed = evaluation_seed(self.config.seed, generation, index);
            let result = Simulation::simulate(&plan, &self.demand, self.config.sim_duration, seed);
            let score = self.evaluator.evaluate(&result, &plan);
            individual.record(score.fitness, result);
        }
    }

    /// Breeds the next generation: elites carry over unchanged with their
    /// cached evaluations, and the rest are offspring of tournament winners.
    fn evolve(&self, population: &mut Population, rng: &mut ChaCha8Rng) {
        let size = population.individuals.len();
        let mut next: Vec<Individual> = population
            .elite_indices(self.config.elite_count)
            .into_iter()
            .map(|index| population.individuals[index].clone())
            .collect();
        while next.len() < size {
            let first = tournament(population, TOURNAMENT_SIZE, rng);
            let second = tournament(population, TOURNAMENT_SIZE, rng);
            let mut a = population.individuals[first].clone();
            let mut b = population.individuals[second].clone();
            crossover(&mut a, &mut b, self.config.crossover_rate, rng);
            mutate(&mut a, &self.bounds, self.config.mutation_rate, rng);
            mutate(&mut b, &self.bounds, self.config.mutation_rate, rng);
            next.push(a);
            if next.len() < size {
                next.push(b);
            }
        }
        population.individuals = next;
        population.generation += 1;
    }

    /// Collects the winner and the run statistics.
    fn outcome(
        &self,
        population: &Population,
        history: Vec<GenerationStats>,
        converged_generation: Option<usize>,
    ) -> OptimizationOutcome {
        let best = &population.individuals[population.best_index()];
        let plan = best.decode(&self.bounds);
        let fitness = cached_fitness(best);
        let result = best
            .result()
            .cloned()
            .expect("best individual is evaluated");
        log::info!(
            "best plan: {:.1} s cycle, {:.1} s north-south green, {:.1} s east-west green",
            plan.cycle_length,
            plan.ns_green(),
            plan.ew_green()
        );
        let generations_run = history.len();
        OptimizationOutcome {
            plan,
            result,
            fitness,
            history,
            converged_generation,
            generations_run,
        }
    }
}

/// Reports convergence once the latest generation has gone `patience`
/// generations without improving on the best fitness.
fn converged_at(history: &[GenerationStats], patience: usize) -> Option<usize> {
    if history.len() <= patience {
        return None;
    }
    let current = &history[history.len() - 1];
    let reference = &history[history.len() - 1 - patience];
    (current.best_fitness - reference.best_fitness <= IMPROVEMENT_EPSILON)
        .then(|| current.generation)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(GaConfig::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_parameters_are_rejected() {
        let config = GaConfig {
            population_size: 10,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PopulationSize { value: 10 })
        ));

        let config = GaConfig {
            generations: 1000,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Generations { .. })
        ));

        let config = GaConfig {
            crossover_rate: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Probability { .. })
        ));

        let config = GaConfig {
            mutation_rate: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Probability { .. })
        ));

        let config = GaConfig {
            patience: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Patience)));

        let config = GaConfig {
            elite_count: 25,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EliteCount { .. })
        ));

        let config = GaConfig {
            min_green: 20.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MinGreen { .. })
        ));

        let config = GaConfig {
            sim_duration: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Duration { .. })
        ));
    }

    fn stats(values: &[f64]) -> Vec<GenerationStats> {
        values
            .iter()
            .enumerate()
            .map(|(generation, &best_fitness)| GenerationStats {
                generation,
                best_fitness,
                mean_fitness: best_fitness,
            })
            .collect()
    }

    #[test]
    fn convergence_requires_a_full_patience_window() {
        let history = stats(&[0.5, 0.5, 0.5]);
        assert_eq!(converged_at(&history, 3), None);
        assert_eq!(converged_at(&history, 2), Some(2));
    }

    #[test]
    fn improvement_resets_the_patience_window() {
        let history = stats(&[0.5, 0.5, 0.6]);
        assert_eq!(converged_at(&history, 2), None);
        let history = stats(&[0.5, 0.6, 0.6, 0.6]);
        assert_eq!(converged_at(&history, 2), Some(3));
    }

    #[test]
    fn tiny_gains_do_not_reset_the_window() {
        let mut history = stats(&[0.5; 6]);
        for (index, entry) in history.iter_mut().enumerate() {
            entry.best_fitness += index as f64 * 1e-12;
        }
        assert_eq!(converged_at(&history, 5), Some(5));
    }
}
