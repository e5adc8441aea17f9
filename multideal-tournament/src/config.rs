//! Configuration types for sessions and tournaments
//!
//! Level 4 - Utilities and configuration

use std::path::PathBuf;

use multideal_core::{Competitor, SchedulingMethod};
use serde::{Deserialize, Serialize};

/// How every session of a run drives its threads
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    /// Step budget per thread
    pub n_steps: usize,
    /// Keep thread order fixed instead of randomizing it
    pub keep_order: bool,
    /// Give each negotiator its partner's ufun
    pub share_opponent_ufuns: bool,
    /// One offer per mechanism step instead of a full round
    pub atomic_offers: bool,
    pub scheduling_method: SchedulingMethod,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            n_steps: 100,
            keep_order: false,
            share_opponent_ufuns: false,
            atomic_offers: false,
            scheduling_method: SchedulingMethod::Sequential,
        }
    }
}

impl RunParams {
    pub fn with_steps(mut self, n_steps: usize) -> Self {
        self.n_steps = n_steps;
        self
    }

    pub fn with_keep_order(mut self, keep_order: bool) -> Self {
        self.keep_order = keep_order;
        self
    }

    pub fn with_shared_ufuns(mut self, share: bool) -> Self {
        self.share_opponent_ufuns = share;
        self
    }

    pub fn with_atomic_offers(mut self, atomic: bool) -> Self {
        self.atomic_offers = atomic;
        self
    }

    pub fn with_scheduling(mut self, method: SchedulingMethod) -> Self {
        self.scheduling_method = method;
        self
    }
}

/// Which edge slots of a session contribute score records
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeCounting {
    /// Every edge slot, fillers included
    All,
    /// Only slots filled by the rotation, never padding
    #[default]
    GenuineOnly,
    /// The first `n` edge slots in thread order
    First(usize),
}

impl EdgeCounting {
    /// Whether the edge at `position` (a `genuine` slot or padding) is scored
    pub fn counts(self, position: usize, genuine: bool) -> bool {
        match self {
            EdgeCounting::All => true,
            EdgeCounting::GenuineOnly => genuine,
            EdgeCounting::First(n) => position < n,
        }
    }
}

/// How many sessions run at once
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Parallelism {
    Serial,
    AllCores,
    /// Share of the available cores
    Fraction(f64),
    Workers(usize),
}

impl Default for Parallelism {
    fn default() -> Self {
        Parallelism::AllCores
    }
}

impl Parallelism {
    /// Interpret an `n_jobs` style count.
    ///
    /// `None` or negative is serial, `0` is all cores, a value below one is a
    /// share of the cores and anything else is a rounded worker count.
    pub fn from_n_jobs(n_jobs: Option<f64>) -> Self {
        match n_jobs {
            None => Parallelism::Serial,
            Some(n) if n < 0.0 => Parallelism::Serial,
            Some(n) if n == 0.0 => Parallelism::AllCores,
            Some(n) if n < 1.0 => Parallelism::Fraction(n),
            Some(n) => Parallelism::Workers(n.round() as usize),
        }
    }

    pub fn is_serial(self) -> bool {
        matches!(self, Parallelism::Serial)
    }

    /// Worker count, at least one
    pub fn n_workers(self) -> usize {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        match self {
            Parallelism::Serial => 1,
            Parallelism::AllCores => cores,
            Parallelism::Fraction(f) => ((cores as f64) * f).round().max(1.0) as usize,
            Parallelism::Workers(n) => n.max(1),
        }
    }
}

/// Tournament configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TournamentConfig {
    pub n_repetitions: usize,
    pub edge_counting: EdgeCounting,
    /// Filler strategies used to pad edge slots; never scored as competitors
    pub non_competitors: Vec<Competitor>,
    pub parallelism: Parallelism,
    /// Center score multiplier (None = number of edges)
    pub center_multiplier: Option<f64>,
    pub edge_multiplier: f64,
    /// Assign and build sessions without running them
    pub dry: bool,
    /// Directory for session traces
    pub output: Option<PathBuf>,
    /// Random seed for reproducibility (None = random)
    pub seed: Option<u64>,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            n_repetitions: 1,
            edge_counting: EdgeCounting::GenuineOnly,
            non_competitors: Vec::new(),
            parallelism: Parallelism::AllCores,
            center_multiplier: None,
            edge_multiplier: 1.0,
            dry: false,
            output: None,
            seed: None,
        }
    }
}

impl TournamentConfig {
    pub fn with_repetitions(mut self, n_repetitions: usize) -> Self {
        self.n_repetitions = n_repetitions;
        self
    }

    pub fn with_edge_counting(mut self, counting: EdgeCounting) -> Self {
        self.edge_counting = counting;
        self
    }

    pub fn with_non_competitors(mut self, fillers: Vec<Competitor>) -> Self {
        self.non_competitors = fillers;
        self
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_multipliers(mut self, center: Option<f64>, edge: f64) -> Self {
        self.center_multiplier = center;
        self.edge_multiplier = edge;
        self
    }

    pub fn with_dry(mut self, dry: bool) -> Self {
        self.dry = dry;
        self
    }

    pub fn with_output(mut self, output: PathBuf) -> Self {
        self.output = Some(output);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
