//! Center utility functions
//!
//! A center ufun maps the tuple of per-thread agreements (position `i` is
//! always thread `i`, `None` is disagreement) to a single value. Two families:
//!
//! - combining ufuns hold one ufun per thread and reduce their values with a
//!   [`Combine`] rule. Their side ufuns are the stored ufuns themselves.
//! - lambda/global ufuns evaluate the joint tuple directly. Their side ufuns are
//!   [`SideUfun`] wrappers that assume every other thread fails.

use std::fmt;
use std::sync::{Arc, OnceLock};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;

use crate::error::{NegotiationError, Result};
use crate::outcome::{Outcome, OutcomeSpace};
use crate::ufun::{Ufun, UtilityFunction};

// ============================================================================
// CENTER UFUN CONTRACT
// ============================================================================

/// Evaluates a tuple of per-thread agreements to one value
pub trait CenterUtilityFunction: Send + Sync + fmt::Debug {
    /// Utility of the joint outcome. Empty or all-`None` input is disagreement.
    fn eval(&self, offer: &[Option<Outcome>]) -> f64;

    fn reserved_value(&self) -> f64;

    /// One outcome space per thread
    fn outcome_spaces(&self) -> &[OutcomeSpace];

    /// Flattened product of all thread spaces
    fn outcome_space(&self) -> &OutcomeSpace;

    fn n_edges(&self) -> usize {
        self.outcome_spaces().len()
    }

    /// Per-thread ufuns this center ufun is built from, if any.
    ///
    /// `None` means there is no natural decomposition and side ufuns are
    /// derived with the single-agreement assumption.
    fn combining_side_ufuns(&self, _n_edges: usize) -> Option<Result<Vec<Ufun>>> {
        None
    }
}

/// Shared handle to a center ufun
#[derive(Clone, Debug)]
pub struct CenterUfun(Arc<dyn CenterUtilityFunction>);

impl CenterUfun {
    pub fn new<C: CenterUtilityFunction + 'static>(ufun: C) -> Self {
        Self(Arc::new(ufun))
    }

    pub fn from_arc(ufun: Arc<dyn CenterUtilityFunction>) -> Self {
        Self(ufun)
    }

    pub fn eval(&self, offer: &[Option<Outcome>]) -> f64 {
        self.0.eval(offer)
    }

    pub fn reserved_value(&self) -> f64 {
        self.0.reserved_value()
    }

    pub fn outcome_spaces(&self) -> &[OutcomeSpace] {
        self.0.outcome_spaces()
    }

    pub fn outcome_space(&self) -> &OutcomeSpace {
        self.0.outcome_space()
    }

    pub fn n_edges(&self) -> usize {
        self.0.n_edges()
    }

    /// One ufun per thread for the center's side negotiators.
    ///
    /// `n_edges` must equal the arity the ufun was built with.
    pub fn side_ufuns(&self, n_edges: usize) -> Result<Vec<Ufun>> {
        if let Some(ufuns) = self.0.combining_side_ufuns(n_edges) {
            return ufuns;
        }
        if n_edges != self.n_edges() {
            return Err(NegotiationError::ArityMismatch {
                expected: self.n_edges(),
                requested: n_edges,
            });
        }
        Ok((0..n_edges)
            .map(|index| Arc::new(SideUfun::new(self.clone(), index, n_edges)) as Ufun)
            .collect())
    }
}

/// True if no thread reached an agreement
pub fn is_disagreement(offer: &[Option<Outcome>]) -> bool {
    offer.iter().all(Option::is_none)
}

// ============================================================================
// SIDE UFUN
// ============================================================================

/// Utility of thread `index` alone, assuming every other thread disagrees
#[derive(Clone, Debug)]
pub struct SideUfun {
    center: CenterUfun,
    index: usize,
    n_edges: usize,
}

impl SideUfun {
    pub fn new(center: CenterUfun, index: usize, n_edges: usize) -> Self {
        Self {
            center,
            index,
            n_edges,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl UtilityFunction for SideUfun {
    fn eval_outcome(&self, outcome: &Outcome) -> f64 {
        let mut offers: Vec<Option<Outcome>> = vec![None; self.n_edges];
        offers[self.index] = Some(outcome.clone());
        self.center.eval(&offers)
    }

    fn reserved_value(&self) -> f64 {
        self.center.reserved_value()
    }

    fn outcome_space(&self) -> &OutcomeSpace {
        &self.center.outcome_spaces()[self.index]
    }
}

// ============================================================================
// COMBINING CENTER UFUNS
// ============================================================================

/// Reduction of per-thread utilities into one value
pub trait Combine: Send + Sync + fmt::Debug {
    fn combine(&self, values: &[f64]) -> f64;
}

/// Center ufun built from one ufun per thread and a reduction rule
#[derive(Debug)]
pub struct UtilityCombiningCenterUfun<C: Combine> {
    ufuns: Vec<Ufun>,
    outcome_spaces: Vec<OutcomeSpace>,
    outcome_space: OutcomeSpace,
    reserved_value: f64,
    combiner: C,
}

impl<C: Combine> UtilityCombiningCenterUfun<C> {
    /// Thread spaces are taken from the per-thread ufuns
    pub fn with_combiner(ufuns: Vec<Ufun>, reserved_value: f64, combiner: C) -> Self {
        let outcome_spaces: Vec<OutcomeSpace> =
            ufuns.iter().map(|u| u.outcome_space().clone()).collect();
        let outcome_space = OutcomeSpace::product(&outcome_spaces);
        Self {
            ufuns,
            outcome_spaces,
            outcome_space,
            reserved_value,
            combiner,
        }
    }

    pub fn ufuns(&self) -> &[Ufun] {
        &self.ufuns
    }

    pub fn combiner(&self) -> &C {
        &self.combiner
    }

    pub fn combine(&self, values: &[f64]) -> f64 {
        self.combiner.combine(values)
    }
}

impl<C: Combine> CenterUtilityFunction for UtilityCombiningCenterUfun<C> {
    fn eval(&self, offer: &[Option<Outcome>]) -> f64 {
        if is_disagreement(offer) {
            return self.reserved_value;
        }
        // positions past the end of `offer` are disagreements
        let values: Vec<f64> = self
            .ufuns
            .iter()
            .enumerate()
            .map(|(i, u)| u.eval(offer.get(i).and_then(Option::as_ref)))
            .collect();
        self.combiner.combine(&values)
    }

    fn reserved_value(&self) -> f64 {
        self.reserved_value
    }

    fn outcome_spaces(&self) -> &[OutcomeSpace] {
        &self.outcome_spaces
    }

    fn outcome_space(&self) -> &OutcomeSpace {
        &self.outcome_space
    }

    fn combining_side_ufuns(&self, n_edges: usize) -> Option<Result<Vec<Ufun>>> {
        if n_edges != self.ufuns.len() {
            return Some(Err(NegotiationError::ArityMismatch {
                expected: self.ufuns.len(),
                requested: n_edges,
            }));
        }
        Some(Ok(self.ufuns.clone()))
    }
}

/// Best single thread
#[derive(Clone, Copy, Debug, Default)]
pub struct Max;

impl Combine for Max {
    fn combine(&self, values: &[f64]) -> f64 {
        values.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Weighted sum with weights summing to one
#[derive(Debug)]
pub struct LinearCombination {
    weights: OnceLock<Vec<f64>>,
    seed: u64,
}

impl LinearCombination {
    /// Explicit weights, normalized at construction
    pub fn new(weights: Vec<f64>) -> Self {
        Self {
            weights: OnceLock::from(normalize_weights(weights)),
            seed: 0,
        }
    }

    /// Weights drawn from `seed` on the first `combine` call, then fixed
    pub fn random(seed: u64) -> Self {
        Self {
            weights: OnceLock::new(),
            seed,
        }
    }

    /// Current weights, `None` until drawn
    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.get().map(Vec::as_slice)
    }

    fn weights_for(&self, n: usize) -> &[f64] {
        self.weights.get_or_init(|| {
            let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
            normalize_weights((0..n).map(|_| rng.gen::<f64>()).collect())
        })
    }
}

impl Combine for LinearCombination {
    fn combine(&self, values: &[f64]) -> f64 {
        self.weights_for(values.len())
            .iter()
            .zip(values)
            .map(|(w, v)| w * v)
            .sum()
    }
}

/// Caller-supplied reduction
#[derive(Clone)]
pub struct FnCombine(pub Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>);

impl fmt::Debug for FnCombine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnCombine")
    }
}

impl Combine for FnCombine {
    fn combine(&self, values: &[f64]) -> f64 {
        (self.0)(values)
    }
}

pub type MaxCenterUfun = UtilityCombiningCenterUfun<Max>;
pub type LinearCombinationCenterUfun = UtilityCombiningCenterUfun<LinearCombination>;
pub type CombiningCenterUfun = UtilityCombiningCenterUfun<FnCombine>;

impl MaxCenterUfun {
    pub fn new(ufuns: Vec<Ufun>, reserved_value: f64) -> Self {
        Self::with_combiner(ufuns, reserved_value, Max)
    }
}

impl LinearCombinationCenterUfun {
    /// `weights = None` draws random weights from `seed` on first use.
    /// Explicit weights must number one per ufun.
    pub fn new(
        ufuns: Vec<Ufun>,
        reserved_value: f64,
        weights: Option<Vec<f64>>,
        seed: u64,
    ) -> Result<Self> {
        let combiner = match weights {
            Some(w) if w.len() != ufuns.len() => {
                return Err(NegotiationError::WeightCountMismatch {
                    ufuns: ufuns.len(),
                    weights: w.len(),
                })
            }
            Some(w) => LinearCombination::new(w),
            None => LinearCombination::random(seed),
        };
        Ok(Self::with_combiner(ufuns, reserved_value, combiner))
    }
}

impl CombiningCenterUfun {
    pub fn from_fn<F>(ufuns: Vec<Ufun>, reserved_value: f64, combine: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Self::with_combiner(ufuns, reserved_value, FnCombine(Arc::new(combine)))
    }
}

// ============================================================================
// GLOBAL CENTER UFUNS
// ============================================================================

/// Joint evaluator over all thread agreements
pub type Evaluator = Arc<dyn Fn(&[Option<Outcome>]) -> f64 + Send + Sync>;

/// Center ufun defined by an arbitrary joint evaluator
#[derive(Clone)]
pub struct LambdaCenterUfun {
    evaluator: Evaluator,
    outcome_spaces: Vec<OutcomeSpace>,
    outcome_space: OutcomeSpace,
    reserved_value: f64,
}

impl LambdaCenterUfun {
    pub fn new<F>(evaluator: F, outcome_spaces: Vec<OutcomeSpace>, reserved_value: f64) -> Self
    where
        F: Fn(&[Option<Outcome>]) -> f64 + Send + Sync + 'static,
    {
        let outcome_space = OutcomeSpace::product(&outcome_spaces);
        Self {
            evaluator: Arc::new(evaluator),
            outcome_spaces,
            outcome_space,
            reserved_value,
        }
    }
}

impl fmt::Debug for LambdaCenterUfun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LambdaCenterUfun")
            .field("n_edges", &self.outcome_spaces.len())
            .field("reserved_value", &self.reserved_value)
            .finish()
    }
}

impl CenterUtilityFunction for LambdaCenterUfun {
    fn eval(&self, offer: &[Option<Outcome>]) -> f64 {
        if is_disagreement(offer) {
            return self.reserved_value;
        }
        (self.evaluator)(offer)
    }

    fn reserved_value(&self) -> f64 {
        self.reserved_value
    }

    fn outcome_spaces(&self) -> &[OutcomeSpace] {
        &self.outcome_spaces
    }

    fn outcome_space(&self) -> &OutcomeSpace {
        &self.outcome_space
    }
}

/// Mean plus standard deviation of each issue's values across threads,
/// averaged over issues
#[derive(Clone, Debug)]
pub struct MeanSmCenterUfun {
    outcome_spaces: Vec<OutcomeSpace>,
    outcome_space: OutcomeSpace,
    reserved_value: f64,
}

impl MeanSmCenterUfun {
    pub fn new(outcome_spaces: Vec<OutcomeSpace>, reserved_value: f64) -> Self {
        let outcome_space = OutcomeSpace::product(&outcome_spaces);
        Self {
            outcome_spaces,
            outcome_space,
            reserved_value,
        }
    }
}

impl CenterUtilityFunction for MeanSmCenterUfun {
    fn eval(&self, offer: &[Option<Outcome>]) -> f64 {
        if is_disagreement(offer) {
            return self.reserved_value;
        }

        let n_edges = offer.len();
        let n_issues = offer.iter().flatten().map(Outcome::len).max().unwrap_or(0);
        if n_issues == 0 {
            return self.reserved_value;
        }

        // columns[issue][thread]; missing agreements contribute zero
        let mut columns = vec![vec![0.0; n_edges]; n_issues];
        for (e, outcome) in offer.iter().enumerate() {
            let Some(outcome) = outcome else { continue };
            for (i, v) in outcome.values().iter().enumerate() {
                columns[i][e] = v.as_f64().unwrap_or(0.0);
            }
        }

        let total: f64 = columns
            .iter()
            .map(|col| {
                let n = col.len() as f64;
                let mean = col.iter().sum::<f64>() / n;
                let var = col.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
                mean + var.sqrt()
            })
            .sum();
        total / n_issues as f64
    }

    fn reserved_value(&self) -> f64 {
        self.reserved_value
    }

    fn outcome_spaces(&self) -> &[OutcomeSpace] {
        &self.outcome_spaces
    }

    fn outcome_space(&self) -> &OutcomeSpace {
        &self.outcome_space
    }
}

/// Dinner invitations: value of how many friends go out on each day
#[derive(Clone, Debug)]
pub struct DinnersEvaluator {
    n_days: usize,
    values: FxHashMap<Vec<usize>, f64>,
    reserved_value: f64,
}

impl DinnersEvaluator {
    /// `values` maps a per-day count vector (length `n_days`) to a utility
    pub fn new(
        n_days: usize,
        values: impl IntoIterator<Item = (Vec<usize>, f64)>,
        reserved_value: f64,
    ) -> Self {
        Self {
            n_days,
            values: values.into_iter().collect(),
            reserved_value,
        }
    }

    pub fn n_days(&self) -> usize {
        self.n_days
    }

    /// Number of agreements on each day
    pub fn outings(&self, agreements: &[Option<Outcome>]) -> Vec<usize> {
        let mut outings = vec![0usize; self.n_days];
        for agreement in agreements.iter().flatten() {
            // the single issue of a thread is the chosen day
            if let Some(day) = agreement.get(0).and_then(|v| v.as_f64()) {
                let day = day as usize;
                if day < self.n_days {
                    outings[day] += 1;
                }
            }
        }
        outings
    }

    pub fn evaluate(&self, agreements: &[Option<Outcome>]) -> f64 {
        if agreements.is_empty() {
            return self.reserved_value;
        }
        let outings = self.outings(agreements);
        self.values.get(&outings).copied().unwrap_or(self.reserved_value)
    }
}

fn normalize_weights(weights: Vec<f64>) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        let n = weights.len().max(1) as f64;
        return vec![1.0 / n; weights.len()];
    }
    weights.into_iter().map(|w| w / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ufun::{LinearAdditiveUfun, MappingUfun};

    fn thread_ufuns() -> Vec<Ufun> {
        (0..3)
            .map(|i| {
                let space = OutcomeSpace::integers(&format!("t{}", i), 1, 3);
                let table = (0..3).map(|v| (Outcome::ints(&[v]), v as f64 / 2.0));
                Arc::new(MappingUfun::new(space, table, 0.0, 0.1 * i as f64)) as Ufun
            })
            .collect()
    }

    fn dinners_table() -> Vec<(Vec<usize>, f64)> {
        vec![(vec![1, 1, 1], 1.0), (vec![3, 0, 0], 0.2)]
    }

    fn dinners_center() -> CenterUfun {
        let spaces: Vec<OutcomeSpace> =
            (0..3).map(|i| OutcomeSpace::integers(&format!("f{}", i), 1, 3)).collect();
        let evaluator = DinnersEvaluator::new(3, dinners_table(), 0.0);
        CenterUfun::new(LambdaCenterUfun::new(
            move |agreements| evaluator.evaluate(agreements),
            spaces,
            0.0,
        ))
    }

    #[test]
    fn test_reserved_value_on_disagreement() {
        let max = CenterUfun::new(MaxCenterUfun::new(thread_ufuns(), 0.3));
        assert_eq!(max.eval(&[]), 0.3);
        assert_eq!(max.eval(&[None, None, None]), 0.3);

        let dinners = dinners_center();
        assert_eq!(dinners.eval(&[None, None, None]), dinners.reserved_value());

        let mean = CenterUfun::new(MeanSmCenterUfun::new(
            vec![OutcomeSpace::integers("a", 2, 3); 2],
            0.05,
        ));
        assert_eq!(mean.eval(&[None, None]), 0.05);
    }

    #[test]
    fn test_combining_side_ufuns_are_identical() {
        let ufuns = thread_ufuns();
        let center = CenterUfun::new(MaxCenterUfun::new(ufuns.clone(), 0.0));
        let sides = center.side_ufuns(3).unwrap();
        assert_eq!(sides.len(), 3);
        for (side, original) in sides.iter().zip(&ufuns) {
            assert!(Arc::ptr_eq(side, original));
        }
    }

    #[test]
    fn test_combining_side_ufuns_arity_mismatch() {
        let center = CenterUfun::new(MaxCenterUfun::new(thread_ufuns(), 0.0));
        let err = center.side_ufuns(2).unwrap_err();
        assert_eq!(
            err,
            NegotiationError::ArityMismatch {
                expected: 3,
                requested: 2
            }
        );
    }

    #[test]
    fn test_lambda_side_ufuns_arity_mismatch() {
        let center = dinners_center();
        assert_eq!(
            center.side_ufuns(5).unwrap_err(),
            NegotiationError::ArityMismatch {
                expected: 3,
                requested: 5
            }
        );
        let mean = CenterUfun::new(MeanSmCenterUfun::new(
            vec![OutcomeSpace::integers("a", 1, 3); 2],
            0.0,
        ));
        assert!(matches!(
            mean.side_ufuns(1),
            Err(NegotiationError::ArityMismatch { expected: 2, requested: 1 })
        ));
        assert_eq!(mean.side_ufuns(2).unwrap().len(), 2);
    }

    #[test]
    fn test_single_agreement_consistency() {
        let center = dinners_center();
        let sides = center.side_ufuns(3).unwrap();
        for (i, side) in sides.iter().enumerate() {
            for o in center.outcome_spaces()[i].enumerate() {
                let mut offer = vec![None; 3];
                offer[i] = Some(o.clone());
                assert_eq!(side.eval(Some(&o)), center.eval(&offer));
            }
            assert_eq!(side.eval(None), center.reserved_value());
            assert!(side.outcome_space().is_compatible(&center.outcome_spaces()[i]));
        }
    }

    #[test]
    fn test_max_is_monotone() {
        let ufuns = thread_ufuns();
        let center = MaxCenterUfun::new(ufuns, 0.0);
        let values: Vec<i64> = (0..3).collect();
        for a in &values {
            for b in &values {
                for c in &values {
                    let offer: Vec<Option<Outcome>> =
                        [*a, *b, *c].iter().map(|v| Some(Outcome::ints(&[*v]))).collect();
                    let base = center.eval(&offer);
                    for thread in 0..3 {
                        let current = offer[thread].as_ref().unwrap();
                        let own = center.ufuns()[thread].eval(Some(current));
                        // every outcome worth less to this thread, and disagreement
                        let mut lower: Vec<Option<Outcome>> = values
                            .iter()
                            .map(|v| Some(Outcome::ints(&[*v])))
                            .filter(|o| center.ufuns()[thread].eval(o.as_ref()) < own)
                            .collect();
                        if center.ufuns()[thread].reserved_value() < own {
                            lower.push(None);
                        }
                        for replacement in lower {
                            let mut lowered = offer.clone();
                            lowered[thread] = replacement;
                            assert!(
                                base >= center.eval(&lowered),
                                "lowering thread {} of {:?} raised the center value",
                                thread,
                                offer
                            );
                        }
                    }
                }
            }
        }
        assert_eq!(center.combine(&[0.2, 0.7, 0.1]), 0.7);
    }

    #[test]
    fn test_linear_combination_weights() {
        let explicit = LinearCombination::new(vec![2.0, 2.0]);
        assert_eq!(explicit.weights(), Some(&[0.5, 0.5][..]));
        assert!((explicit.combine(&[1.0, 0.0]) - 0.5).abs() < 1e-9);

        let lazy = LinearCombination::random(9);
        assert!(lazy.weights().is_none());
        let first = lazy.combine(&[1.0, 1.0, 1.0]);
        assert!((first - 1.0).abs() < 1e-9);
        let w = lazy.weights().unwrap().to_vec();
        assert_eq!(w.len(), 3);
        lazy.combine(&[0.0, 1.0, 0.0]);
        assert_eq!(lazy.weights().unwrap(), &w[..]);
    }

    #[test]
    fn test_linear_center_weight_count() {
        let err = LinearCombinationCenterUfun::new(thread_ufuns(), 0.0, Some(vec![1.0]), 0).unwrap_err();
        assert_eq!(err, NegotiationError::WeightCountMismatch { ufuns: 3, weights: 1 });

        let center =
            LinearCombinationCenterUfun::new(thread_ufuns(), 0.0, Some(vec![1.0, 1.0, 2.0]), 0).unwrap();
        let offer = vec![
            Some(Outcome::ints(&[0])),
            Some(Outcome::ints(&[2])),
            Some(Outcome::ints(&[2])),
        ];
        // 0.25 * 0.0 + 0.25 * 1.0 + 0.5 * 1.0
        assert!((center.eval(&offer) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_lazy_weights_cover_every_thread() {
        let center = LinearCombinationCenterUfun::new(thread_ufuns(), 0.0, None, 4).unwrap();
        // a short tuple still draws one weight per ufun
        center.eval(&[Some(Outcome::ints(&[2]))]);
        assert_eq!(center.combiner().weights().map(<[f64]>::len), Some(3));
    }

    #[test]
    fn test_fn_combine_center() {
        let center = CombiningCenterUfun::from_fn(thread_ufuns(), 0.0, |v| v.iter().sum());
        let offer = vec![Some(Outcome::ints(&[2])), None, Some(Outcome::ints(&[1]))];
        // 1.0 + reserved(0.1) + 0.5
        assert!((center.eval(&offer) - 1.6).abs() < 1e-9);
    }

    #[test]
    fn test_dinners_evaluator() {
        let center = dinners_center();
        let unique = vec![
            Some(Outcome::ints(&[0])),
            Some(Outcome::ints(&[1])),
            Some(Outcome::ints(&[2])),
        ];
        assert_eq!(center.eval(&unique), 1.0);
        let clash = vec![
            Some(Outcome::ints(&[0])),
            Some(Outcome::ints(&[0])),
            Some(Outcome::ints(&[1])),
        ];
        assert_eq!(center.eval(&clash), 0.0);
    }

    #[test]
    fn test_mean_sm() {
        let spaces = vec![OutcomeSpace::integers("a", 1, 5); 2];
        let center = MeanSmCenterUfun::new(spaces, 0.0);
        let offer = vec![Some(Outcome::ints(&[1])), Some(Outcome::ints(&[3]))];
        // mean 2, std 1
        assert!((center.eval(&offer) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_product_space() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let ufuns: Vec<Ufun> = (0..3)
            .map(|i| {
                Arc::new(LinearAdditiveUfun::random(
                    OutcomeSpace::integers(&format!("t{}", i), 2, 3),
                    0.0,
                    &mut rng,
                )) as Ufun
            })
            .collect();
        let center = CenterUfun::new(MaxCenterUfun::new(ufuns, 0.0));
        assert_eq!(center.n_edges(), 3);
        assert_eq!(center.outcome_space().n_issues(), 6);
        assert_eq!(center.outcome_space().cardinality(), 729);
    }
}
