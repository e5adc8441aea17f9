//! Edge-side utility functions over a single outcome space

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use rustc_hash::FxHashMap;

use crate::outcome::{Outcome, OutcomeSpace};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Ranges narrower than this are treated as a single point
pub const EPSILON: f64 = 1e-6;

// ============================================================================
// UTILITY FUNCTION CONTRACT
// ============================================================================

/// Mapping from one outcome (or no agreement) to a real value
pub trait UtilityFunction: Send + Sync + fmt::Debug {
    /// Utility of a concrete outcome
    fn eval_outcome(&self, outcome: &Outcome) -> f64;

    /// Utility received on disagreement
    fn reserved_value(&self) -> f64;

    /// The space this ufun is defined over
    fn outcome_space(&self) -> &OutcomeSpace;

    /// Utility of an outcome or of disagreement (`None`)
    fn eval(&self, outcome: Option<&Outcome>) -> f64 {
        match outcome {
            Some(o) => self.eval_outcome(o),
            None => self.reserved_value(),
        }
    }
}

/// Shared handle to any utility function
pub type Ufun = Arc<dyn UtilityFunction>;

// ============================================================================
// LINEAR ADDITIVE
// ============================================================================

/// Weighted sum of per-issue value tables
#[derive(Clone, Debug)]
pub struct LinearAdditiveUfun {
    outcome_space: OutcomeSpace,
    /// One weight per issue, summing to 1
    weights: Vec<f64>,
    /// `values[issue][value_index]` in `[0, 1]`
    values: Vec<Vec<f64>>,
    reserved_value: f64,
}

impl LinearAdditiveUfun {
    /// Build from explicit weights and value tables.
    ///
    /// Weights are normalized to sum to one.
    pub fn new(
        outcome_space: OutcomeSpace,
        weights: Vec<f64>,
        values: Vec<Vec<f64>>,
        reserved_value: f64,
    ) -> Self {
        Self {
            outcome_space,
            weights: normalize(weights),
            values,
            reserved_value,
        }
    }

    /// Random weights and value tables normalized to `[0, 1]`
    pub fn random<R: Rng + ?Sized>(
        outcome_space: OutcomeSpace,
        reserved_value: f64,
        rng: &mut R,
    ) -> Self {
        let weights = (0..outcome_space.n_issues()).map(|_| rng.gen::<f64>()).collect();
        let values = outcome_space
            .issues
            .iter()
            .map(|issue| {
                let raw: Vec<f64> = (0..issue.cardinality()).map(|_| rng.gen::<f64>()).collect();
                rescale(raw)
            })
            .collect();
        Self::new(outcome_space, weights, values, reserved_value)
    }

    /// Ufun whose per-issue preferences are the reverse of `other`'s
    pub fn opposing<R: Rng + ?Sized>(other: &LinearAdditiveUfun, reserved_value: f64, rng: &mut R) -> Self {
        let weights = (0..other.weights.len()).map(|_| rng.gen::<f64>()).collect();
        let values = other
            .values
            .iter()
            .map(|table| table.iter().map(|v| 1.0 - v).collect())
            .collect();
        Self::new(other.outcome_space.clone(), weights, values, reserved_value)
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn with_reserved_value(mut self, reserved_value: f64) -> Self {
        self.reserved_value = reserved_value;
        self
    }
}

impl UtilityFunction for LinearAdditiveUfun {
    fn eval_outcome(&self, outcome: &Outcome) -> f64 {
        self.outcome_space
            .issues
            .iter()
            .zip(outcome.values())
            .enumerate()
            .map(|(i, (issue, v))| match issue.index_of(v) {
                Some(k) => self.weights[i] * self.values[i][k],
                None => 0.0,
            })
            .sum()
    }

    fn reserved_value(&self) -> f64 {
        self.reserved_value
    }

    fn outcome_space(&self) -> &OutcomeSpace {
        &self.outcome_space
    }
}

// ============================================================================
// MAPPING
// ============================================================================

/// Literal outcome-to-value table with a default for missing outcomes
#[derive(Clone, Debug)]
pub struct MappingUfun {
    outcome_space: OutcomeSpace,
    mapping: FxHashMap<Outcome, f64>,
    default: f64,
    reserved_value: f64,
}

impl MappingUfun {
    pub fn new(
        outcome_space: OutcomeSpace,
        mapping: impl IntoIterator<Item = (Outcome, f64)>,
        default: f64,
        reserved_value: f64,
    ) -> Self {
        Self {
            outcome_space,
            mapping: mapping.into_iter().collect(),
            default,
            reserved_value,
        }
    }
}

impl UtilityFunction for MappingUfun {
    fn eval_outcome(&self, outcome: &Outcome) -> f64 {
        self.mapping.get(outcome).copied().unwrap_or(self.default)
    }

    fn reserved_value(&self) -> f64 {
        self.reserved_value
    }

    fn outcome_space(&self) -> &OutcomeSpace {
        &self.outcome_space
    }
}

// ============================================================================
// UTILITIES
// ============================================================================

/// Sample uniformly in `[min, max]`, or return the midpoint of a degenerate range
pub fn sample_between<R: Rng + ?Sized>(min: f64, max: f64, rng: &mut R) -> f64 {
    if max - min > EPSILON {
        min + (max - min) * rng.gen::<f64>()
    } else {
        (max + min) / 2.0
    }
}

/// Generate an (edge, side) pair of conflicting linear ufuns over one space
pub fn generate_multi_issue_ufuns<R: Rng + ?Sized>(
    name: &str,
    n_issues: usize,
    n_values: usize,
    rng: &mut R,
) -> (LinearAdditiveUfun, LinearAdditiveUfun) {
    let space = OutcomeSpace::integers(name, n_issues, n_values);
    let edge = LinearAdditiveUfun::random(space, 0.0, rng);
    let side = LinearAdditiveUfun::opposing(&edge, 0.0, rng);
    (edge, side)
}

/// Scale values to sum to one (uniform if they sum to zero)
fn normalize(weights: Vec<f64>) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        let n = weights.len().max(1) as f64;
        return vec![1.0 / n; weights.len()];
    }
    weights.into_iter().map(|w| w / total).collect()
}

/// Min-max rescale into `[0, 1]`
fn rescale(values: Vec<f64>) -> Vec<f64> {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max - min <= EPSILON {
        return vec![1.0; values.len()];
    }
    values.into_iter().map(|v| (v - min) / (max - min)).collect()
}
