//! Split rule trait definitions and implementations for decision trees. The
//! module supports sampling split values from a set of candidates and routing
//! observations left or right of the chosen split value.
//!
//! Includes:
//! - `SplitRule`: Trait defining the interface for split rules.
//! - `ContinuousSplit`: Splitting strategy for continuous variables.
//! - `CategoricalSplit`: Splitting strategy for integer-coded categorical variables.
//! - `SplitRuleType`: Enum encapsulating the different split rule types.

use rand::rngs::StdRng;
use rand::Rng;

/// Split rule interface for defining split rule strategies.
pub trait SplitRule {
    /// Samples a split value from the candidate points.
    fn sample_split_value(&self, candidates: &[f64], rng: &mut StdRng) -> Option<f64>;
    /// Whether an observed value is routed to the left child of a split.
    fn goes_left(&self, value: f64, split_value: f64) -> bool;
}

/// Standard continuous split rule. Pick a pivot value and split depending on
/// if the variable is smaller-or-equal or greater than the value picked.
#[derive(Debug, Clone, Copy)]
pub struct ContinuousSplit;

impl SplitRule for ContinuousSplit {
    fn sample_split_value(&self, candidates: &[f64], rng: &mut StdRng) -> Option<f64> {
        if candidates.len() > 1 && !candidates.iter().all(|&x| x == candidates[0]) {
            let idx = rng.gen_range(0..candidates.len());
            Some(candidates[idx])
        } else {
            None
        }
    }

    fn goes_left(&self, value: f64, split_value: f64) -> bool {
        value <= split_value
    }
}

/// Choose a single categorical code and branch on whether the variable is
/// that code or not.
#[derive(Debug, Clone, Copy)]
pub struct CategoricalSplit;

impl SplitRule for CategoricalSplit {
    fn sample_split_value(&self, candidates: &[f64], rng: &mut StdRng) -> Option<f64> {
        if candidates.len() > 1 && !candidates.iter().all(|&x| x == candidates[0]) {
            let idx = rng.gen_range(0..candidates.len());
            Some(candidates[idx])
        } else {
            None
        }
    }

    fn goes_left(&self, value: f64, split_value: f64) -> bool {
        value == split_value
    }
}

/// Holds the split rule strategies as enum variants.
#[derive(Debug, Clone, Copy)]
pub enum SplitRuleType {
    /// Continuous implements the `ContinuousSplit` strategy.
    Continuous(ContinuousSplit),
    /// Categorical implements the `CategoricalSplit` strategy.
    Categorical(CategoricalSplit),
}

impl SplitRuleType {
    /// Samples a split value from the candidate points.
    pub fn sample_split_value(&self, candidates: &[f64], rng: &mut StdRng) -> Option<f64> {
        match self {
            SplitRuleType::Continuous(rule) => rule.sample_split_value(candidates, rng),
            SplitRuleType::Categorical(rule) => rule.sample_split_value(candidates, rng),
        }
    }

    /// Whether an observed value is routed to the left child of a split.
    pub fn goes_left(&self, value: f64, split_value: f64) -> bool {
        match self {
            SplitRuleType::Continuous(rule) => rule.goes_left(value, split_value),
            SplitRuleType::Categorical(rule) => rule.goes_left(value, split_value),
        }
    }
}
