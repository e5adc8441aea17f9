//! Multi-deal scenarios and scenario generators
//!
//! A scenario fixes the center ufun, one edge ufun per thread and optionally
//! explicit side ufuns. Generators build random scenarios from a seeded rng so
//! a saved tournament description can rebuild them exactly.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::center::{
    CenterUfun, DinnersEvaluator, LambdaCenterUfun, LinearCombinationCenterUfun, MaxCenterUfun,
    MeanSmCenterUfun,
};
use crate::error::{NegotiationError, Result};
use crate::outcome::{Issue, OutcomeSpace};
use crate::ufun::{generate_multi_issue_ufuns, sample_between, LinearAdditiveUfun, Ufun};

// ============================================================================
// SCENARIO
// ============================================================================

/// One center, N edges, one thread per edge
#[derive(Clone, Debug)]
pub struct Scenario {
    pub name: String,
    pub center_ufun: CenterUfun,
    pub edge_ufuns: Vec<Ufun>,
    side_ufuns: Option<Vec<Ufun>>,
}

impl Scenario {
    /// Validate and build a scenario.
    ///
    /// Edge count must match the center ufun. Each edge space, and each
    /// explicit side ufun space, must be compatible with the center's space for
    /// that thread. Explicit side ufuns must number one per thread.
    pub fn new(
        name: &str,
        center_ufun: CenterUfun,
        edge_ufuns: Vec<Ufun>,
        side_ufuns: Option<Vec<Ufun>>,
    ) -> Result<Self> {
        let n = edge_ufuns.len();
        if n != center_ufun.n_edges() {
            return Err(NegotiationError::EdgeCountMismatch {
                edges: n,
                center: center_ufun.n_edges(),
            });
        }

        for (i, (edge, space)) in edge_ufuns.iter().zip(center_ufun.outcome_spaces()).enumerate() {
            if !edge.outcome_space().is_compatible(space) {
                return Err(NegotiationError::IncompatibleOutcomeSpace { thread: i });
            }
        }

        if let Some(sides) = &side_ufuns {
            if sides.len() != n {
                return Err(NegotiationError::SideCountMismatch {
                    expected: n,
                    got: sides.len(),
                });
            }
            for (i, (side, space)) in sides.iter().zip(center_ufun.outcome_spaces()).enumerate() {
                if !side.outcome_space().is_compatible(space) {
                    return Err(NegotiationError::IncompatibleOutcomeSpace { thread: i });
                }
            }
        }

        Ok(Self {
            name: name.to_string(),
            center_ufun,
            edge_ufuns,
            side_ufuns,
        })
    }

    pub fn n_edges(&self) -> usize {
        self.edge_ufuns.len()
    }

    /// Center's per-thread ufuns: explicit ones, or derived from the center ufun
    pub fn side_ufuns(&self) -> Result<Vec<Ufun>> {
        match &self.side_ufuns {
            Some(sides) => Ok(sides.clone()),
            None => self.center_ufun.side_ufuns(self.n_edges()),
        }
    }

    pub fn has_explicit_side_ufuns(&self) -> bool {
        self.side_ufuns.is_some()
    }
}

// ============================================================================
// GENERATED MULTI-DEAL SCENARIOS
// ============================================================================

/// How the center combines its per-thread utilities
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CenterUfunKind {
    #[default]
    Max,
    Linear,
    MeanSm,
}

impl std::str::FromStr for CenterUfunKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "max" => Ok(Self::Max),
            "linear" => Ok(Self::Linear),
            "meansm" | "mean_sm" | "mean-sm" => Ok(Self::MeanSm),
            other => Err(format!("Unknown center ufun kind: {}", other)),
        }
    }
}

/// Parameters of a random multi-deal scenario
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioGenerator {
    pub n_edges: usize,
    pub n_issues: usize,
    pub n_values: usize,
    pub center_rv_min: f64,
    pub center_rv_max: f64,
    pub edge_rv_min: f64,
    pub edge_rv_max: f64,
    pub center_kind: CenterUfunKind,
}

impl Default for ScenarioGenerator {
    fn default() -> Self {
        Self {
            n_edges: 10,
            n_issues: 3,
            n_values: 7,
            center_rv_min: 0.0,
            center_rv_max: 0.0,
            edge_rv_min: 0.1,
            edge_rv_max: 0.4,
            center_kind: CenterUfunKind::Max,
        }
    }
}

impl ScenarioGenerator {
    pub fn with_edges(mut self, n_edges: usize) -> Self {
        self.n_edges = n_edges;
        self
    }

    pub fn with_issues(mut self, n_issues: usize, n_values: usize) -> Self {
        self.n_issues = n_issues;
        self.n_values = n_values;
        self
    }

    pub fn with_center_rv(mut self, min: f64, max: f64) -> Self {
        self.center_rv_min = min;
        self.center_rv_max = max;
        self
    }

    pub fn with_edge_rv(mut self, min: f64, max: f64) -> Self {
        self.edge_rv_min = min;
        self.edge_rv_max = max;
        self
    }

    pub fn with_center_kind(mut self, kind: CenterUfunKind) -> Self {
        self.center_kind = kind;
        self
    }
}

/// Random scenario with conflicting edge and side ufuns on every thread
pub fn make_multideal_scenario<R: Rng + ?Sized>(gen: &ScenarioGenerator, rng: &mut R) -> Result<Scenario> {
    let mut edge_ufuns: Vec<Ufun> = Vec::with_capacity(gen.n_edges);
    let mut side_ufuns: Vec<Ufun> = Vec::with_capacity(gen.n_edges);

    for i in 0..gen.n_edges {
        let (edge, side) = generate_multi_issue_ufuns(&format!("t{}", i), gen.n_issues, gen.n_values, rng);
        let rv = sample_between(gen.edge_rv_min, gen.edge_rv_max, rng);
        edge_ufuns.push(Arc::new(edge.with_reserved_value(rv)));
        side_ufuns.push(Arc::new(side));
    }

    let center_rv = sample_between(gen.center_rv_min, gen.center_rv_max, rng);
    let center_ufun = match gen.center_kind {
        CenterUfunKind::Max => CenterUfun::new(MaxCenterUfun::new(side_ufuns.clone(), center_rv)),
        CenterUfunKind::Linear => {
            let seed = rng.gen::<u64>();
            CenterUfun::new(LinearCombinationCenterUfun::new(
                side_ufuns.clone(),
                center_rv,
                None,
                seed,
            )?)
        }
        CenterUfunKind::MeanSm => {
            let spaces = side_ufuns.iter().map(|u| u.outcome_space().clone()).collect();
            CenterUfun::new(MeanSmCenterUfun::new(spaces, center_rv))
        }
    };

    Scenario::new("multideal", center_ufun, edge_ufuns, Some(side_ufuns))
}

// ============================================================================
// DINNERS
// ============================================================================

/// Parameters of the dinner-invitation scenario
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DinnersConfig {
    pub n_friends: usize,
    pub n_days: usize,
    pub center_reserved_value: f64,
    pub edge_rv_min: f64,
    pub edge_rv_max: f64,
    /// Count vector to value; drawn at random when absent
    pub values: Option<Vec<(Vec<usize>, f64)>>,
}

impl Default for DinnersConfig {
    fn default() -> Self {
        Self {
            n_friends: 3,
            n_days: 3,
            center_reserved_value: 0.0,
            edge_rv_min: 0.0,
            edge_rv_max: 0.5,
            values: None,
        }
    }
}

impl DinnersConfig {
    pub fn with_friends(mut self, n_friends: usize, n_days: usize) -> Self {
        self.n_friends = n_friends;
        self.n_days = n_days;
        self
    }

    pub fn with_values(mut self, values: Vec<(Vec<usize>, f64)>) -> Self {
        self.values = Some(values);
        self
    }

    pub fn with_edge_rv(mut self, min: f64, max: f64) -> Self {
        self.edge_rv_min = min;
        self.edge_rv_max = max;
        self
    }
}

/// A center inviting each friend to dinner on one of `n_days` days
pub fn make_dinners_scenario<R: Rng + ?Sized>(config: &DinnersConfig, rng: &mut R) -> Result<Scenario> {
    let spaces: Vec<OutcomeSpace> = (0..config.n_friends)
        .map(|i| OutcomeSpace::new(&format!("friend{}Day", i + 1), vec![Issue::integer("Day", config.n_days)]))
        .collect();

    let edge_ufuns: Vec<Ufun> = spaces
        .iter()
        .map(|space| {
            let rv = sample_between(config.edge_rv_min, config.edge_rv_max, rng);
            Arc::new(LinearAdditiveUfun::random(space.clone(), rv, rng)) as Ufun
        })
        .collect();

    let values = match &config.values {
        Some(v) => v.clone(),
        None => random_dinner_values(config.n_friends, config.n_days, rng),
    };

    let evaluator = DinnersEvaluator::new(config.n_days, values, config.center_reserved_value);
    let center_ufun = CenterUfun::new(LambdaCenterUfun::new(
        move |agreements| evaluator.evaluate(agreements),
        spaces,
        config.center_reserved_value,
    ));

    Scenario::new("dinners", center_ufun, edge_ufuns, None)
}

/// Random `[0, 1]` value for every possible per-day count vector
fn random_dinner_values<R: Rng + ?Sized>(n_friends: usize, n_days: usize, rng: &mut R) -> Vec<(Vec<usize>, f64)> {
    let vectors = count_vectors(n_friends, n_days);
    let raw: Vec<f64> = vectors.iter().map(|_| rng.gen::<f64>()).collect();
    let min = raw.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = raw.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = if max - min > 0.0 { max - min } else { 1.0 };
    vectors
        .into_iter()
        .zip(raw)
        .map(|(v, r)| (v, (r - min) / span))
        .collect()
}

/// All length-`n_days` vectors of non-negative counts summing to at most `total`
fn count_vectors(total: usize, n_days: usize) -> Vec<Vec<usize>> {
    let mut out = vec![Vec::new()];
    for _ in 0..n_days {
        let mut next = Vec::new();
        for prefix in &out {
            let used: usize = prefix.iter().sum();
            for c in 0..=(total - used) {
                let mut v = prefix.clone();
                v.push(c);
                next.push(v);
            }
        }
        out = next;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Outcome;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_generated_scenario_is_valid() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let gen = ScenarioGenerator::default().with_edges(4).with_issues(2, 3);
        let s = make_multideal_scenario(&gen, &mut rng).unwrap();
        assert_eq!(s.n_edges(), 4);
        assert!(s.has_explicit_side_ufuns());
        for u in &s.edge_ufuns {
            let rv = u.reserved_value();
            assert!((0.1..=0.4).contains(&rv));
            assert_eq!(u.outcome_space().cardinality(), 9);
        }
        assert_eq!(s.center_ufun.reserved_value(), 0.0);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let gen = ScenarioGenerator::default().with_edges(3).with_center_kind(CenterUfunKind::Linear);
        let a = make_multideal_scenario(&gen, &mut ChaCha8Rng::seed_from_u64(5)).unwrap();
        let b = make_multideal_scenario(&gen, &mut ChaCha8Rng::seed_from_u64(5)).unwrap();
        let offer: Vec<Option<Outcome>> = a
            .center_ufun
            .outcome_spaces()
            .iter()
            .map(|s| s.enumerate().into_iter().last())
            .collect();
        assert_eq!(a.center_ufun.eval(&offer), b.center_ufun.eval(&offer));
        for (x, y) in a.edge_ufuns.iter().zip(&b.edge_ufuns) {
            assert_eq!(x.reserved_value(), y.reserved_value());
        }
    }

    #[test]
    fn test_edge_count_mismatch() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let s = make_multideal_scenario(&ScenarioGenerator::default().with_edges(3), &mut rng).unwrap();
        let mut edges = s.edge_ufuns.clone();
        edges.pop();
        let err = Scenario::new("bad", s.center_ufun.clone(), edges, None).unwrap_err();
        assert_eq!(err, NegotiationError::EdgeCountMismatch { edges: 2, center: 3 });
    }

    #[test]
    fn test_incompatible_space() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let s = make_multideal_scenario(&ScenarioGenerator::default().with_edges(2), &mut rng).unwrap();
        let mut edges = s.edge_ufuns.clone();
        edges[1] = Arc::new(LinearAdditiveUfun::random(OutcomeSpace::integers("x", 1, 2), 0.0, &mut rng));
        let err = Scenario::new("bad", s.center_ufun.clone(), edges, None).unwrap_err();
        assert_eq!(err, NegotiationError::IncompatibleOutcomeSpace { thread: 1 });
    }

    #[test]
    fn test_side_count_mismatch() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let s = make_multideal_scenario(&ScenarioGenerator::default().with_edges(2), &mut rng).unwrap();
        let sides = s.side_ufuns().unwrap()[..1].to_vec();
        let err = Scenario::new("bad", s.center_ufun.clone(), s.edge_ufuns.clone(), Some(sides)).unwrap_err();
        assert_eq!(err, NegotiationError::SideCountMismatch { expected: 2, got: 1 });
    }

    #[test]
    fn test_incompatible_side_space() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let s = make_multideal_scenario(&ScenarioGenerator::default().with_edges(2), &mut rng).unwrap();
        let mut sides = s.side_ufuns().unwrap();
        sides[0] = Arc::new(LinearAdditiveUfun::random(OutcomeSpace::integers("x", 1, 2), 0.0, &mut rng));
        let err = Scenario::new("bad", s.center_ufun.clone(), s.edge_ufuns.clone(), Some(sides)).unwrap_err();
        assert_eq!(err, NegotiationError::IncompatibleOutcomeSpace { thread: 0 });
    }

    #[test]
    fn test_dinners_scenario() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let config = DinnersConfig::default().with_values(vec![(vec![1, 1, 1], 1.0)]);
        let s = make_dinners_scenario(&config, &mut rng).unwrap();
        assert_eq!(s.n_edges(), 3);
        assert!(!s.has_explicit_side_ufuns());
        assert_eq!(s.side_ufuns().unwrap().len(), 3);

        let spread = vec![
            Some(Outcome::ints(&[0])),
            Some(Outcome::ints(&[1])),
            Some(Outcome::ints(&[2])),
        ];
        assert_eq!(s.center_ufun.eval(&spread), 1.0);
        let clash = vec![
            Some(Outcome::ints(&[0])),
            Some(Outcome::ints(&[0])),
            Some(Outcome::ints(&[1])),
        ];
        assert_eq!(s.center_ufun.eval(&clash), 0.0);
    }

    #[test]
    fn test_random_dinner_values_cover_counts() {
        let vectors = count_vectors(3, 3);
        // compositions of at most 3 into 3 parts
        assert_eq!(vectors.len(), 20);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let values = random_dinner_values(3, 3, &mut rng);
        assert!(values.iter().all(|(_, v)| (0.0..=1.0).contains(v)));
        assert!(values.iter().any(|(_, v)| *v == 1.0));
    }
}
