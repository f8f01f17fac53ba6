//! Miscellaneous utility structs and functions.

use std::fmt::Debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A closed interval on the real number line.
#[derive(Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    /// Creates a new interval.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns true if this interval contains the value.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Gets the magnitude of the interval.
    pub fn length(&self) -> f64 {
        self.max - self.min
    }

    /// Returns the centre/mid-point of the interval.
    pub fn midpoint(&self) -> f64 {
        0.5 * (self.min + self.max)
    }

    /// Restricts a value to lie within the interval.
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Linearly interpolates between the interval's end points.
    pub fn lerp(&self, t: f64) -> f64 {
        self.min + t * (self.max - self.min)
    }
}

impl Debug for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interval({:?}, {:?})", &self.min, &self.max)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn clamp_and_contains() {
        let interval = Interval::new(45.0, 120.0);
        assert!(interval.contains(45.0));
        assert!(interval.contains(120.0));
        assert!(!interval.contains(44.9));
        assert_approx_eq!(interval.clamp(300.0), 120.0);
        assert_approx_eq!(interval.clamp(0.0), 45.0);
        assert_approx_eq!(interval.clamp(90.0), 90.0);
    }

    #[test]
    fn lerp_spans_the_interval() {
        let interval = Interval::new(10.0, 60.0);
        assert_approx_eq!(interval.lerp(0.0), 10.0);
        assert_approx_eq!(interval.lerp(1.0), 60.0);
        assert_approx_eq!(interval.lerp(0.5), interval.midpoint());
    }
}
