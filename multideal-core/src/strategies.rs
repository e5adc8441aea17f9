//! Built-in strategies, the strategy registry and competitors
//!
//! Level 4 of the core. `Random` samples offers; the time-based family
//! concedes from the best outcome towards the reserved value with
//! `target(t) = rv + (max - rv) * (1 - t^e)`.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};

use crate::error::{NegotiationError, Result};
use crate::mechanism::{ResponseType, SaoState};
use crate::negotiator::{Strategy, ThreadContext};
use crate::outcome::Outcome;

// ============================================================================
// RANDOM
// ============================================================================

/// Uniform random offers, mostly rejecting
pub struct RandomStrategy {
    rng: ChaCha8Rng,
    p_end: f64,
    p_reject: f64,
}

impl RandomStrategy {
    pub const P_END: f64 = 0.03;
    pub const P_REJECT: f64 = 0.999;

    pub fn new(seed: u64) -> Self {
        Self::with_probabilities(seed, Self::P_END, Self::P_REJECT)
    }

    pub fn with_probabilities(seed: u64, p_end: f64, p_reject: f64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            p_end,
            p_reject,
        }
    }
}

impl Strategy for RandomStrategy {
    fn name(&self) -> &str {
        "Random"
    }

    fn propose(&mut self, ctx: &ThreadContext, _state: &SaoState) -> Option<Outcome> {
        ctx.outcome_space.sample(&mut self.rng)
    }

    fn respond(&mut self, ctx: &ThreadContext, _state: &SaoState, offer: &Outcome) -> ResponseType {
        if self.rng.gen::<f64>() < self.p_end {
            return ResponseType::EndNegotiation;
        }
        let below_reserved = ctx
            .ufun
            .as_ref()
            .map(|u| u.eval(Some(offer)) < u.reserved_value())
            .unwrap_or(false);
        if self.rng.gen::<f64>() < self.p_reject || below_reserved {
            return ResponseType::Reject;
        }
        ResponseType::Accept
    }
}

// ============================================================================
// TIME-BASED
// ============================================================================

/// Aspiration strategy with a fixed concession exponent
pub struct TimeBasedStrategy {
    name: String,
    exponent: f64,
    /// Outcomes of each thread, best first
    ranked: FxHashMap<usize, Vec<(f64, Outcome)>>,
}

impl TimeBasedStrategy {
    pub fn new(name: &str, exponent: f64) -> Self {
        Self {
            name: name.to_string(),
            exponent,
            ranked: FxHashMap::default(),
        }
    }

    /// Concedes late
    pub fn boulware() -> Self {
        Self::new("Boulware", 4.0)
    }

    pub fn linear() -> Self {
        Self::new("Linear", 1.0)
    }

    /// Concedes early
    pub fn conceder() -> Self {
        Self::new("Conceder", 0.25)
    }

    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    fn ranked(&mut self, ctx: &ThreadContext) -> &[(f64, Outcome)] {
        self.ranked.entry(ctx.thread).or_insert_with(|| rank_outcomes(ctx))
    }

    fn target(&self, ctx: &ThreadContext, state: &SaoState, best: f64) -> f64 {
        let rv = ctx.ufun.as_ref().map(|u| u.reserved_value()).unwrap_or(0.0);
        if best <= rv {
            return rv;
        }
        let t = state.relative_time.clamp(0.0, 1.0);
        rv + (best - rv) * (1.0 - t.powf(self.exponent))
    }
}

impl Strategy for TimeBasedStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, threads: &[ThreadContext]) {
        for ctx in threads {
            self.ranked.insert(ctx.thread, rank_outcomes(ctx));
        }
    }

    fn propose(&mut self, ctx: &ThreadContext, state: &SaoState) -> Option<Outcome> {
        let best = self.ranked(ctx).first()?.0;
        let target = self.target(ctx, state, best);
        let ranked = self.ranked(ctx);
        let k = ranked.partition_point(|(u, _)| *u >= target);
        let idx = k.saturating_sub(1);
        ranked.get(idx).map(|(_, o)| o.clone())
    }

    fn respond(&mut self, ctx: &ThreadContext, state: &SaoState, offer: &Outcome) -> ResponseType {
        let Some(ufun) = ctx.ufun.as_ref() else {
            return ResponseType::Accept;
        };
        let best = self.ranked(ctx).first().map(|(u, _)| *u).unwrap_or(0.0);
        let target = self.target(ctx, state, best);
        let u = ufun.eval(Some(offer));
        if u >= target && u >= ufun.reserved_value() {
            ResponseType::Accept
        } else {
            ResponseType::Reject
        }
    }
}

/// All outcomes of the thread sorted by decreasing utility
fn rank_outcomes(ctx: &ThreadContext) -> Vec<(f64, Outcome)> {
    let mut ranked: Vec<(f64, Outcome)> = ctx
        .outcome_space
        .enumerate()
        .into_iter()
        .map(|o| {
            let u = ctx.ufun.as_ref().map(|f| f.eval(Some(&o))).unwrap_or(0.0);
            (u, o)
        })
        .collect();
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

// ============================================================================
// REGISTRY
// ============================================================================

pub type StrategyParams = BTreeMap<String, f64>;

/// Builds a strategy from its parameters and a seed
pub type StrategyFactory = Arc<dyn Fn(&StrategyParams, u64) -> Result<Box<dyn Strategy>> + Send + Sync>;

/// Name to factory lookup
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    factories: BTreeMap<String, StrategyFactory>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `Random`, `Boulware`, `Linear`, `Conceder` and `TimeBased`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("Random", |params, seed| {
            let p_end = probability(params, "p_end", RandomStrategy::P_END)?;
            let p_reject = probability(params, "p_reject", RandomStrategy::P_REJECT)?;
            Ok(Box::new(RandomStrategy::with_probabilities(seed, p_end, p_reject)))
        });
        registry.register("Boulware", |_, _| Ok(Box::new(TimeBasedStrategy::boulware())));
        registry.register("Linear", |_, _| Ok(Box::new(TimeBasedStrategy::linear())));
        registry.register("Conceder", |_, _| Ok(Box::new(TimeBasedStrategy::conceder())));
        registry.register("TimeBased", |params, _| {
            let e = params.get("exponent").copied().unwrap_or(1.0);
            if !(e > 0.0) {
                return Err(NegotiationError::InvalidParameter {
                    name: "exponent".to_string(),
                    value: e,
                });
            }
            Ok(Box::new(TimeBasedStrategy::new("TimeBased", e)))
        });
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&StrategyParams, u64) -> Result<Box<dyn Strategy>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn create(&self, name: &str, params: &StrategyParams, seed: u64) -> Result<Box<dyn Strategy>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| NegotiationError::UnknownStrategy(name.to_string()))?;
        factory(params, seed)
    }

    pub fn create_competitor(&self, competitor: &Competitor, seed: u64) -> Result<Box<dyn Strategy>> {
        self.create(&competitor.strategy, &competitor.params, seed)
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

fn probability(params: &StrategyParams, name: &str, default: f64) -> Result<f64> {
    let p = params.get(name).copied().unwrap_or(default);
    if !(0.0..=1.0).contains(&p) {
        return Err(NegotiationError::InvalidParameter {
            name: name.to_string(),
            value: p,
        });
    }
    Ok(p)
}

// ============================================================================
// COMPETITORS
// ============================================================================

/// A strategy name plus its construction parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    pub strategy: String,
    #[serde(default)]
    pub params: StrategyParams,
}

impl Competitor {
    pub fn new(strategy: &str) -> Self {
        Self {
            strategy: strategy.to_string(),
            params: StrategyParams::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: f64) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    /// Stable identity used as the score key
    pub fn agent_id(&self) -> String {
        if self.params.is_empty() {
            return self.strategy.clone();
        }
        let canonical = serde_json::to_string(&self.params).unwrap_or_default();
        let mut hasher = FxHasher::default();
        canonical.hash(&mut hasher);
        format!("{}_{:x}", self.strategy, hasher.finish())
    }
}

impl fmt::Display for Competitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.agent_id())
    }
}
