//! Tournament execution - rotation assignment, job execution and scoring
//!
//! Level 1 - Orchestration and Level 2 - Phases

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use multideal_core::{
    make_multideal_scenario, Competitor, Scenario, ScenarioGenerator, StrategyParams,
    StrategyRegistry,
};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{RunParams, TournamentConfig};
use crate::error::{Result, TournamentError};
use crate::runner::{AssignedScenario, SessionOptions, SessionResults};
use crate::scoring::{aggregate, TournamentResults};

/// One edge seat of a job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeSlot {
    pub competitor: Competitor,
    /// Whether this seat produces a score record
    pub counted: bool,
}

/// A fully assigned (scenario, repetition, rotation) session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    pub scenario_index: usize,
    pub scenario_name: String,
    pub repetition: usize,
    pub rotation: usize,
    pub center: Competitor,
    pub edges: Vec<EdgeSlot>,
    pub seed: u64,
    pub name: String,
    pub output: Option<PathBuf>,
}

/// A job together with what its session produced
#[derive(Clone, Debug, Serialize)]
pub struct SessionInfo {
    pub job: JobInfo,
    pub results: SessionResults,
}

/// A job that errored or panicked
#[derive(Clone, Debug, Serialize)]
pub struct JobFailure {
    pub job: JobInfo,
    pub error: String,
}

/// Competitors, scenarios and the run params shared by every session
#[derive(Clone, Debug)]
pub struct Tournament {
    pub competitors: Vec<Competitor>,
    pub scenarios: Vec<Scenario>,
    pub run_params: RunParams,
}

/// Create RNG from optional seed
fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

impl Tournament {
    pub fn new(competitors: Vec<Competitor>, scenarios: Vec<Scenario>, run_params: RunParams) -> Self {
        Self {
            competitors,
            scenarios,
            run_params,
        }
    }

    /// Predefined scenarios followed by `n_generated` random ones
    pub fn from_scenarios<R: Rng + ?Sized>(
        competitors: Vec<Competitor>,
        mut scenarios: Vec<Scenario>,
        n_generated: usize,
        generator: &ScenarioGenerator,
        run_params: RunParams,
        rng: &mut R,
    ) -> Result<Self> {
        for _ in 0..n_generated {
            scenarios.push(make_multideal_scenario(generator, rng)?);
        }
        Ok(Self::new(competitors, scenarios, run_params))
    }

    /// Identity strings of all competitors, in competitor order
    pub fn agent_ids(&self) -> Vec<String> {
        self.competitors.iter().map(Competitor::agent_id).collect()
    }

    // ========================================================================
    // Level 1 - Orchestration
    // ========================================================================

    /// Run the tournament
    ///
    /// # Arguments
    /// * `config` - Tournament configuration
    /// * `registry` - Strategy lookup for competitors and fillers
    ///
    /// # Returns
    /// Aggregated scores, every session result and every failed job
    pub fn run(&self, config: &TournamentConfig, registry: &StrategyRegistry) -> Result<TournamentResults> {
        self.run_with_progress(config, registry, |_| {})
    }

    /// Like `run`, calling `on_done` after each finished job
    pub fn run_with_progress<F>(
        &self,
        config: &TournamentConfig,
        registry: &StrategyRegistry,
        on_done: F,
    ) -> Result<TournamentResults>
    where
        F: Fn(&JobInfo) + Sync,
    {
        self.validate(config, registry)?;

        let mut rng = create_rng(config.seed);
        let jobs = self.assign_jobs(config, &mut rng)?;
        info!(
            competitors = self.competitors.len(),
            scenarios = self.scenarios.len(),
            repetitions = config.n_repetitions,
            jobs = jobs.len(),
            "starting tournament"
        );

        let outcomes = self.execute_jobs(&jobs, config, registry, &on_done)?;

        let mut sessions = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(info) => sessions.push(info),
                Err(failure) => failures.push(failure),
            }
        }

        let results = aggregate(&self.agent_ids(), sessions, failures, config);
        info!(
            sessions = results.session_results.len(),
            failures = results.failures.len(),
            "tournament finished"
        );
        Ok(results)
    }

    // ========================================================================
    // Level 2 - Phases
    // ========================================================================

    /// Setup errors are fatal before any job is assigned
    fn validate(&self, config: &TournamentConfig, registry: &StrategyRegistry) -> Result<()> {
        if self.competitors.is_empty() {
            return Err(TournamentError::NoCompetitors);
        }
        if self.scenarios.is_empty() {
            return Err(TournamentError::NoScenarios);
        }
        for c in self.competitors.iter().chain(&config.non_competitors) {
            if !registry.contains(&c.strategy) {
                return Err(TournamentError::UnknownStrategy(c.strategy.clone()));
            }
        }
        Ok(())
    }

    /// Build every job of the tournament.
    ///
    /// Per repetition and scenario the competitors are shuffled once. Rotation
    /// `j` seats `order[j]` as center and the next `min(K - 1, N)` competitors
    /// (cyclically) as genuine edges; remaining seats are padding. Every
    /// competitor is center exactly once per scenario and repetition.
    pub fn assign_jobs<R: Rng + ?Sized>(&self, config: &TournamentConfig, rng: &mut R) -> Result<Vec<JobInfo>> {
        if self.competitors.is_empty() {
            return Err(TournamentError::NoCompetitors);
        }
        if self.scenarios.is_empty() {
            return Err(TournamentError::NoScenarios);
        }

        let k = self.competitors.len();
        let mut jobs = Vec::with_capacity(config.n_repetitions * self.scenarios.len() * k);

        for repetition in 0..config.n_repetitions {
            for (scenario_index, scenario) in self.scenarios.iter().enumerate() {
                let n = scenario.n_edges();
                let label = format!("{}{:03}", scenario.name, scenario_index);

                let mut order = self.competitors.clone();
                order.shuffle(rng);

                for rotation in 0..k {
                    let center = order[rotation].clone();
                    let genuine = (k - 1).min(n);

                    let mut slots: Vec<(Competitor, bool)> = (1..=genuine)
                        .map(|offset| (order[(rotation + offset) % k].clone(), true))
                        .collect();
                    for _ in genuine..n {
                        slots.push((self.filler(config, rng), false));
                    }
                    slots.shuffle(rng);

                    let edges = slots
                        .into_iter()
                        .enumerate()
                        .map(|(position, (competitor, is_genuine))| EdgeSlot {
                            competitor,
                            counted: config.edge_counting.counts(position, is_genuine),
                        })
                        .collect();

                    let output = config.output.as_ref().map(|p| {
                        p.join("results")
                            .join(&label)
                            .join(format!("r{:03}t{:03}", repetition, rotation))
                    });

                    jobs.push(JobInfo {
                        scenario_index,
                        scenario_name: scenario.name.clone(),
                        repetition,
                        rotation,
                        center,
                        edges,
                        seed: rng.gen(),
                        name: format!("{}_{}_{}", label, repetition, rotation),
                        output,
                    });
                }
            }
        }
        Ok(jobs)
    }

    /// Run jobs serially or on a dedicated pool, results in job order
    fn execute_jobs<F>(
        &self,
        jobs: &[JobInfo],
        config: &TournamentConfig,
        registry: &StrategyRegistry,
        on_done: &F,
    ) -> Result<Vec<std::result::Result<SessionInfo, JobFailure>>>
    where
        F: Fn(&JobInfo) + Sync,
    {
        let run_one = |job: &JobInfo| {
            let outcome = self.run_job(job, config, registry);
            on_done(job);
            outcome
        };

        if config.parallelism.is_serial() {
            return Ok(jobs.iter().map(run_one).collect());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallelism.n_workers())
            .build()?;
        Ok(pool.install(|| jobs.par_iter().map(run_one).collect()))
    }

    // ========================================================================
    // Level 3 - Steps
    // ========================================================================

    /// One session; errors and panics become a `JobFailure`
    fn run_job(
        &self,
        job: &JobInfo,
        config: &TournamentConfig,
        registry: &StrategyRegistry,
    ) -> std::result::Result<SessionInfo, JobFailure> {
        debug!(job = %job.name, center = %job.center, "running job");

        let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
            let scenario = self.scenarios[job.scenario_index].clone();
            let mut rng = ChaCha8Rng::seed_from_u64(job.seed);
            let edges: Vec<Competitor> = job.edges.iter().map(|s| s.competitor.clone()).collect();
            let assigned = AssignedScenario::new(
                scenario,
                self.run_params.clone(),
                &job.center,
                &edges,
                registry,
                &mut rng,
            )?;
            assigned.run(&SessionOptions {
                name: job.name.clone(),
                output: job.output.clone(),
                dry: config.dry,
                seed: rng.gen(),
            })
        }));

        let error = match attempt {
            Ok(Ok(results)) => {
                return Ok(SessionInfo {
                    job: job.clone(),
                    results,
                })
            }
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };
        warn!(job = %job.name, %error, "job failed");
        Err(JobFailure {
            job: job.clone(),
            error,
        })
    }

    /// A padding competitor: a filler if any are configured, else a resampled competitor
    fn filler<R: Rng + ?Sized>(&self, config: &TournamentConfig, rng: &mut R) -> Competitor {
        let pool = if config.non_competitors.is_empty() {
            &self.competitors
        } else {
            &config.non_competitors
        };
        pool.choose(rng)
            .cloned()
            .unwrap_or_else(|| Competitor {
                strategy: "Random".to_string(),
                params: StrategyParams::new(),
            })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic".to_string()
    }
}
