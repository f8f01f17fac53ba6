//! Genome encoding and the genetic operators.

use crate::plan::{SignalTimingPlan, CYCLE_RANGE};
use crate::simulation::SimulationResult;
use crate::util::Interval;
use itertools::Itertools;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// The number of genes in a genome: the cycle length and four green times.
pub(crate) const GENE_COUNT: usize = 5;

/// The gene holding the cycle length.
const CYCLE_GENE: usize = 0;

/// The largest green time a gene may encode, in s.
const GREEN_MAX: f64 = 60.0; // s

/// The value range of each gene.
#[derive(Clone, Copy, Debug)]
pub(crate) struct GeneBounds {
    /// The cycle length range in s.
    cycle: Interval,
    /// The green time range in s.
    green: Interval,
    /// The minimum green carried into decoded plans, in s.
    min_green: f64,
}

impl GeneBounds {
    pub(crate) fn new(min_green: f64) -> Self {
        Self {
            cycle: CYCLE_RANGE,
            green: Interval::new(min_green, GREEN_MAX),
            min_green,
        }
    }

    /// The range of the gene at `index`.
    pub(crate) fn gene(&self, index: usize) -> Interval {
        if index == CYCLE_GENE {
            self.cycle
        } else {
            self.green
        }
    }
}

/// A candidate plan together with its cached evaluation.
///
/// The cache is dropped whenever an operator changes the genome, so an
/// individual is re-simulated only when it is actually new.
#[derive(Clone, Debug)]
pub(crate) struct Individual {
    /// The genome: the cycle length followed by the four green times.
    genes: [f64; GENE_COUNT],
    /// The fitness from the last evaluation, if still valid.
    fitness: Option<f64>,
    /// The simulation result from the last evaluation, if still valid.
    result: Option<SimulationResult>,
}

impl Individual {
    /// Encodes an existing plan.
    pub(crate) fn from_plan(plan: &SignalTimingPlan) -> Self {
        Self {
            genes: [
                plan.cycle_length,
                plan.green[0],
                plan.green[1],
                plan.green[2],
                plan.green[3],
            ],
            fitness: None,
            result: None,
        }
    }

    /// Draws a uniformly random genome within bounds.
    pub(crate) fn random(bounds: &GeneBounds, rng: &mut ChaCha8Rng) -> Self {
        let mut genes = [0.0; GENE_COUNT];
        for (index, gene) in genes.iter_mut().enumerate() {
            *gene = bounds.gene(index).lerp(rng.gen());
        }
        Self {
            genes,
            fitness: None,
            result: None,
        }
    }

    /// Decodes the genome into a timing plan.
    ///
    /// Genes are clamped to their bounds first and the plan constructor
    /// renormalises the green times, so every genome decodes to a feasible
    /// plan.
    pub(crate) fn decode(&self, bounds: &GeneBounds) -> SignalTimingPlan {
        let cycle = bounds.gene(CYCLE_GENE).clamp(self.genes[CYCLE_GENE]);
        let mut green = [0.0; 4];
        for (index, value) in green.iter_mut().enumerate() {
            *value = bounds.gene(index + 1).clamp(self.genes[index + 1]);
        }
        SignalTimingPlan::with_min_green(cycle, green, bounds.min_green)
    }

    /// Records an evaluation.
    pub(crate) fn record(&mut self, fitness: f64, result: SimulationResult) {
        self.fitness = Some(fitness);
        self.result = Some(result);
    }

    /// The cached fitness, if the individual has been evaluated.
    pub(crate) fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    /// The cached simulation result, if the individual has been evaluated.
    pub(crate) fn result(&self) -> Option<&SimulationResult> {
        self.result.as_ref()
    }

    /// Drops the cached evaluation after the genome changes.
    fn invalidate(&mut self) {
        self.fitness = None;
        self.result = None;
    }
}

/// The fitness used to rank an individual, treating unevaluated ones as the
/// worst possible.
pub(crate) fn cached_fitness(individual: &Individual) -> f64 {
    individual.fitness.unwrap_or(f64::NEG_INFINITY)
}

/// Picks the best of `size` individuals drawn with replacement.
pub(crate) fn tournament(population: &Population, size: usize, rng: &mut ChaCha8Rng) -> usize {
    let mut best = rng.gen_range(0..population.individuals.len());
    for _ in 1..size {
        let contender = rng.gen_range(0..population.individuals.len());
        if cached_fitness(&population.individuals[contender])
            > cached_fitness(&population.individuals[best])
        {
            best = contender;
        }
    }
    best
}

/// Uniform crossover: with probability `rate` the pair exchanges each gene
/// with even odds. Caches are dropped only if a gene actually moved.
pub(crate) fn crossover(a: &mut Individual, b: &mut Individual, rate: f64, rng: &mut ChaCha8Rng) {
    if !rng.gen_bool(rate) {
        return;
    }
    let mut swapped = false;
    for index in 0..GENE_COUNT {
        if rng.gen_bool(0.5) {
            std::mem::swap(&mut a.genes[index], &mut b.genes[index]);
            swapped = true;
        }
    }
    if swapped {
        a.invalidate();
        b.invalidate();
    }
}

/// Gaussian mutation: each gene moves with probability `rate` by a draw
/// from a normal with a spread of a tenth of the gene's range, then is
/// clamped back into bounds.
pub(crate) fn mutate(
    individual: &mut Individual,
    bounds: &GeneBounds,
    rate: f64,
    rng: &mut ChaCha8Rng,
) {
    let mut changed = false;
    for index in 0..GENE_COUNT {
        if !rng.gen_bool(rate) {
            continue;
        }
        let range = bounds.gene(index);
        let step = Normal::new(0.0, 0.1 * range.length()).expect("mutation spread must be positive");
        individual.genes[index] = range.clamp(individual.genes[index] + step.sample(rng));
        changed = true;
    }
    if changed {
        individual.invalidate();
    }
}

/// The population of candidate plans.
pub(crate) struct Population {
    pub(crate) individuals: Vec<Individual>,
    /// The generation the individuals belong to, starting at zero.
    pub(crate) generation: usize,
}

impl Population {
    /// Creates the initial population: the baseline plan first, then
    /// uniformly random genomes.
    pub(crate) fn seeded(
        baseline: &SignalTimingPlan,
        size: usize,
        bounds: &GeneBounds,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let mut individuals = Vec::with_capacity(size);
        individuals.push(Individual::from_plan(baseline));
        while individuals.len() < size {
            individuals.push(Individual::random(bounds, rng));
        }
        Self {
            individuals,
            generation: 0,
        }
    }

    /// The index of the fittest individual.
    pub(crate) fn best_index(&self) -> usize {
        self.individuals
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| cached_fitness(a).total_cmp(&cached_fitness(b)))
            .map(|(index, _)| index)
            .unwrap_or(0)
    }

    /// The indices of the `count` fittest individuals, fittest first.
    pub(crate) fn elite_indices(&self, count: usize) -> Vec<usize> {
        self.individuals
            .iter()
            .enumerate()
            .sorted_by(|(_, a), (_, b)| cached_fitness(b).total_cmp(&cached_fitness(a)))
            .map(|(index, _)| index)
            .take(count)
            .collect()
    }

    /// The mean fitness over the evaluated individuals.
    pub(crate) fn mean_fitness(&self) -> f64 {
        let evaluated = self
            .individuals
            .iter()
            .filter_map(|individual| individual.fitness)
            .collect::<Vec<_>>();
        if evaluated.is_empty() {
            0.0
        } else {
            evaluated.iter().sum::<f64>() / evaluated.len() as f64
        }
    }
}
