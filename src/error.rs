//! Configuration errors raised before any simulation runs.

use std::error::Error;
use std::fmt;

use crate::approach::Approach;

/// An invalid configuration parameter.
///
/// Construction of evaluators, demand profiles and optimisers fails fast
/// with one of these; once configured, simulation and evolution never error.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The objective weights do not sum to one.
    WeightSum { total: f64 },
    /// An objective weight is negative or not finite.
    Weight { name: &'static str, value: f64 },
    /// The population size is outside the supported range.
    PopulationSize { value: usize },
    /// The generation limit is outside the supported range.
    Generations { value: usize },
    /// A probability parameter lies outside `[0, 1]`.
    Probability { name: &'static str, value: f64 },
    /// The convergence patience is zero.
    Patience,
    /// The elite count leaves no room for offspring.
    EliteCount { value: usize, population: usize },
    /// The minimum green time cannot fit two phases in the shortest cycle.
    MinGreen { value: f64 },
    /// A demand volume is negative or not finite.
    Volume { approach: Approach, value: f64 },
    /// The simulation duration is not positive and finite.
    Duration { value: f64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::WeightSum { total } => {
                write!(f, "objective weights must sum to 1.0, got {}", total)
            }
            ConfigError::Weight { name, value } => {
                write!(
                    f,
                    "objective weight `{}` must be non-negative and finite, got {}",
                    name, value
                )
            }
            ConfigError::PopulationSize { value } => {
                write!(f, "population size must be between 20 and 200, got {}", value)
            }
            ConfigError::Generations { value } => {
                write!(f, "generation limit must be between 20 and 500, got {}", value)
            }
            ConfigError::Probability { name, value } => {
                write!(f, "`{}` must lie in [0, 1], got {}", name, value)
            }
            ConfigError::Patience => {
                write!(f, "patience must be at least one generation")
            }
            ConfigError::EliteCount { value, population } => {
                write!(
                    f,
                    "elite count {} leaves no room for offspring in a population of {}",
                    value, population
                )
            }
            ConfigError::MinGreen { value } => {
                write!(
                    f,
                    "minimum green of {}s cannot fit two phases in the shortest cycle",
                    value
                )
            }
            ConfigError::Volume { approach, value } => {
                write!(
                    f,
                    "demand volume for the {} approach must be non-negative and finite, got {}",
                    approach, value
                )
            }
            ConfigError::Duration { value } => {
                write!(f, "simulation duration must be positive and finite, got {}", value)
            }
        }
    }
}

impl Error for ConfigError {}
