//! Session runner - one center negotiating with all of its edges
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run_session() - generate, assign and run in one call
//! - Level 2: AssignedScenario::run() - build threads, init agents, drive, score
//! - Level 3: build_threads(), export_traces()
//! - Level 4: SessionOptions, result records

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use multideal_core::{
    make_multideal_scenario, run_all, Agent, AgentSummary, AgentUfun, Competitor, MechanismConfig,
    Outcome, SaoMechanism, SaoState, Scenario, ScenarioGenerator, SharedAgent, StrategyRegistry,
    ThreadContext, Ufun,
};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RunParams;
use crate::error::{Result, TournamentError};

// ============================================================================
// RECORDS (Level 4)
// ============================================================================

/// Per-session knobs that are not part of the run params
#[derive(Clone, Debug, Default)]
pub struct SessionOptions {
    pub name: String,
    /// Traces go to `<output>/<name>/log/`
    pub output: Option<PathBuf>,
    pub dry: bool,
    pub seed: u64,
}

/// Final state of one thread
#[derive(Clone, Debug, Serialize)]
pub struct ThreadRecord {
    pub name: String,
    pub state: SaoState,
}

/// Everything a finished session produced
#[derive(Clone, Debug, Serialize)]
pub struct SessionResults {
    pub threads: Vec<ThreadRecord>,
    pub center: AgentSummary,
    pub edges: Vec<AgentSummary>,
    pub agreements: Vec<Option<Outcome>>,
    pub center_utility: f64,
    /// NaN for edges without a ufun
    pub edge_utilities: Vec<f64>,
}

impl SessionResults {
    pub fn n_agreements(&self) -> usize {
        self.agreements.iter().filter(|a| a.is_some()).count()
    }
}

/// How edge competitors are drawn when there are fewer of them than threads
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeAssignment {
    /// `edges[i % len]`
    #[default]
    Cycle,
    /// Uniform choice per thread
    Sample,
}

// ============================================================================
// ASSIGNED SCENARIO (Level 2)
// ============================================================================

/// A scenario with a concrete agent on every seat
pub struct AssignedScenario {
    pub scenario: Scenario,
    pub run_params: RunParams,
    pub center: SharedAgent,
    pub edges: Vec<SharedAgent>,
}

impl AssignedScenario {
    /// Seat `center` and exactly one competitor per thread
    pub fn new<R: Rng + ?Sized>(
        scenario: Scenario,
        run_params: RunParams,
        center: &Competitor,
        edges: &[Competitor],
        registry: &StrategyRegistry,
        rng: &mut R,
    ) -> Result<Self> {
        if edges.len() != scenario.n_edges() {
            return Err(TournamentError::Session(
                multideal_core::NegotiationError::EdgeCountMismatch {
                    edges: edges.len(),
                    center: scenario.n_edges(),
                },
            ));
        }

        let strategy = registry.create_competitor(center, rng.gen())?;
        let center_agent = SharedAgent::new(Agent::new(
            "center",
            strategy,
            Some(AgentUfun::Center(scenario.center_ufun.clone())),
        ));

        let edge_agents = edges
            .iter()
            .zip(&scenario.edge_ufuns)
            .enumerate()
            .map(|(i, (competitor, ufun))| {
                let strategy = registry.create_competitor(competitor, rng.gen())?;
                Ok::<_, TournamentError>(SharedAgent::new(Agent::new(
                    &format!("edge{}", i),
                    strategy,
                    Some(AgentUfun::Edge(ufun.clone())),
                )))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            scenario,
            run_params,
            center: center_agent,
            edges: edge_agents,
        })
    }

    /// Run every thread of the session to completion.
    ///
    /// All threads are built and registered before any agent is initialized,
    /// so `init` always sees the full set of threads.
    pub fn run(self, options: &SessionOptions) -> Result<SessionResults> {
        let mut mechanisms = self.build_threads()?;

        self.center.init();
        for edge in &self.edges {
            edge.init();
        }

        let n = mechanisms.len();
        if options.dry {
            debug!(session = %options.name, "dry run");
            return Ok(self.collect(&mechanisms, vec![None; n], 0.0, vec![0.0; n]));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
        run_all(
            &mut mechanisms,
            self.run_params.scheduling_method,
            self.run_params.keep_order,
            &mut rng,
        )?;

        if let Some(output) = &options.output {
            export_traces(&output.join(&options.name).join("log"), &mechanisms)?;
        }

        let agreements: Vec<Option<Outcome>> =
            mechanisms.iter().map(|m| m.agreement().cloned()).collect();
        let center_utility = self.scenario.center_ufun.eval(&agreements);
        let edge_utilities: Vec<f64> = self
            .edges
            .iter()
            .zip(&agreements)
            .map(|(edge, agreement)| {
                edge.edge_ufun()
                    .map(|u| u.eval(agreement.as_ref()))
                    .unwrap_or(f64::NAN)
            })
            .collect();

        for (m, u) in mechanisms.iter().zip(&edge_utilities) {
            debug!(
                thread = m.name(),
                status = ?m.state().status,
                agreement = ?m.agreement(),
                edge_utility = u,
                "thread finished"
            );
        }
        info!(
            session = %options.name,
            agreements = agreements.iter().filter(|a| a.is_some()).count(),
            center_utility,
            "session finished"
        );

        Ok(self.collect(&mechanisms, agreements, center_utility, edge_utilities))
    }

    // ------------------------------------------------------------------------
    // Level 3 - Steps
    // ------------------------------------------------------------------------

    /// One mechanism per thread with the center endpoint first
    fn build_threads(&self) -> Result<Vec<SaoMechanism>> {
        let side_ufuns = self.scenario.side_ufuns()?;
        let params = &self.run_params;
        let share = params.share_opponent_ufuns;

        let mut mechanisms = Vec::with_capacity(self.scenario.n_edges());
        for (i, (edge, side)) in self.edges.iter().zip(&side_ufuns).enumerate() {
            let edge_ufun: Option<Ufun> = edge.edge_ufun();
            let outcome_space = self.scenario.edge_ufuns[i].outcome_space().clone();

            let mut mechanism = SaoMechanism::new(MechanismConfig {
                name: format!("n{}", i),
                outcome_space: outcome_space.clone(),
                n_steps: params.n_steps,
                one_offer_per_step: params.atomic_offers,
            });

            mechanism.add(self.center.create_negotiator(ThreadContext {
                thread: i,
                negotiator_id: format!("s{}", i),
                is_center: true,
                ufun: Some(side.clone()),
                opponent_ufun: if share { edge_ufun.clone() } else { None },
                outcome_space: outcome_space.clone(),
                n_steps: params.n_steps,
            }))?;
            mechanism.add(edge.create_negotiator(ThreadContext {
                thread: i,
                negotiator_id: format!("e{}", i),
                is_center: false,
                ufun: edge_ufun,
                opponent_ufun: if share { Some(side.clone()) } else { None },
                outcome_space,
                n_steps: params.n_steps,
            }))?;

            mechanisms.push(mechanism);
        }
        Ok(mechanisms)
    }

    fn collect(
        &self,
        mechanisms: &[SaoMechanism],
        agreements: Vec<Option<Outcome>>,
        center_utility: f64,
        edge_utilities: Vec<f64>,
    ) -> SessionResults {
        SessionResults {
            threads: mechanisms
                .iter()
                .map(|m| ThreadRecord {
                    name: m.name().to_string(),
                    state: m.state().clone(),
                })
                .collect(),
            center: self.center.summary(),
            edges: self.edges.iter().map(SharedAgent::summary).collect(),
            agreements,
            center_utility,
            edge_utilities,
        }
    }
}

/// Write each thread's trace as `<dir>/<thread>.json`
fn export_traces(dir: &Path, mechanisms: &[SaoMechanism]) -> Result<()> {
    fs::create_dir_all(dir)?;
    for m in mechanisms {
        let file = File::create(dir.join(format!("{}.json", m.name())))?;
        serde_json::to_writer_pretty(BufWriter::new(file), m.trace())?;
    }
    Ok(())
}

// ============================================================================
// ASSIGNMENT (Level 1)
// ============================================================================

/// Seat a center competitor and fill every thread from `edges`
pub fn assign_scenario<R: Rng + ?Sized>(
    scenario: Scenario,
    run_params: RunParams,
    center: &Competitor,
    edges: &[Competitor],
    registry: &StrategyRegistry,
    assignment: EdgeAssignment,
    rng: &mut R,
) -> Result<AssignedScenario> {
    if edges.is_empty() {
        return Err(TournamentError::NoCompetitors);
    }
    let seats: Vec<Competitor> = (0..scenario.n_edges())
        .map(|i| match assignment {
            EdgeAssignment::Cycle => edges[i % edges.len()].clone(),
            EdgeAssignment::Sample => edges.choose(rng).cloned().unwrap_or_else(|| edges[0].clone()),
        })
        .collect();
    AssignedScenario::new(scenario, run_params, center, &seats, registry, rng)
}

/// A generated scenario plus everything needed to run it once
#[derive(Clone, Debug)]
pub struct SessionSpec {
    pub name: String,
    pub generator: ScenarioGenerator,
    pub center: Competitor,
    pub edges: Vec<Competitor>,
    pub assignment: EdgeAssignment,
    pub run_params: RunParams,
    pub output: Option<PathBuf>,
    pub dry: bool,
}

impl Default for SessionSpec {
    fn default() -> Self {
        Self {
            name: "session".to_string(),
            generator: ScenarioGenerator::default(),
            center: Competitor::new("Boulware"),
            edges: vec![
                Competitor::new("Boulware"),
                Competitor::new("Random"),
                Competitor::new("Linear"),
                Competitor::new("Conceder"),
            ],
            assignment: EdgeAssignment::Cycle,
            run_params: RunParams::default(),
            output: None,
            dry: false,
        }
    }
}

/// Generate a scenario, seat the competitors and run the session
pub fn run_session<R: Rng + ?Sized>(
    spec: &SessionSpec,
    registry: &StrategyRegistry,
    rng: &mut R,
) -> Result<SessionResults> {
    let scenario = make_multideal_scenario(&spec.generator, rng)?;
    info!(
        session = %spec.name,
        edges = scenario.n_edges(),
        center = %spec.center,
        "starting session"
    );
    let assigned = assign_scenario(
        scenario,
        spec.run_params.clone(),
        &spec.center,
        &spec.edges,
        registry,
        spec.assignment,
        rng,
    )?;
    let options = SessionOptions {
        name: spec.name.clone(),
        output: spec.output.clone(),
        dry: spec.dry,
        seed: rng.gen(),
    };
    assigned.run(&options)
}
