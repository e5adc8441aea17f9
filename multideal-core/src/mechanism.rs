//! Bilateral alternating-offers mechanism and multi-thread scheduling
//!
//! Level 2 of the core: drives one thread between exactly two negotiators,
//! and `run_all` drives a set of threads under a scheduling policy.
//!
//! Protocol: the first negotiator opens. On its turn a negotiator first
//! responds to the standing opponent offer (accept ends in agreement, end
//! ends in disagreement, reject obliges it to counter-propose).

use std::time::Instant;

use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{NegotiationError, Result};
use crate::outcome::{Outcome, OutcomeSpace};

// ============================================================================
// PROTOCOL TYPES
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    Accept,
    Reject,
    EndNegotiation,
}

/// Lifecycle of one thread
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadStatus {
    #[default]
    NotStarted,
    Running,
    Agreement,
    Disagreement,
    TimedOut,
}

impl ThreadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Agreement | Self::Disagreement | Self::TimedOut)
    }
}

/// Observable state of a thread
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SaoState {
    pub step: usize,
    pub n_steps: usize,
    pub relative_time: f64,
    pub status: ThreadStatus,
    pub current_offer: Option<Outcome>,
    pub current_proposer: Option<String>,
    pub agreement: Option<Outcome>,
    pub n_offers: usize,
}

/// One negotiator action
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Seconds since the thread started
    pub time: f64,
    pub relative_time: f64,
    pub step: usize,
    pub negotiator: String,
    pub offer: Option<Outcome>,
    pub response: Option<ResponseType>,
    pub status: ThreadStatus,
}

/// A party to one thread
pub trait SaoNegotiator: Send {
    fn id(&self) -> &str;

    fn on_negotiation_start(&mut self, _state: &SaoState) {}

    /// Next offer; `None` violates the protocol
    fn propose(&mut self, state: &SaoState) -> Option<Outcome>;

    fn respond(&mut self, state: &SaoState, offer: &Outcome) -> ResponseType;

    fn on_negotiation_end(&mut self, _state: &SaoState) {}
}

// ============================================================================
// MECHANISM
// ============================================================================

#[derive(Clone, Debug)]
pub struct MechanismConfig {
    pub name: String,
    pub outcome_space: OutcomeSpace,
    pub n_steps: usize,
    /// One action per step instead of a full round
    pub one_offer_per_step: bool,
}

pub struct SaoMechanism {
    config: MechanismConfig,
    negotiators: Vec<Box<dyn SaoNegotiator>>,
    state: SaoState,
    turn: usize,
    trace: Vec<TraceEntry>,
    started: Option<Instant>,
}

impl SaoMechanism {
    pub fn new(config: MechanismConfig) -> Self {
        let state = SaoState {
            n_steps: config.n_steps,
            ..SaoState::default()
        };
        Self {
            config,
            negotiators: Vec::with_capacity(2),
            state,
            turn: 0,
            trace: Vec::new(),
            started: None,
        }
    }

    /// Attach a negotiator; the first one added opens
    pub fn add(&mut self, negotiator: Box<dyn SaoNegotiator>) -> Result<()> {
        if self.negotiators.len() >= 2 {
            return Err(NegotiationError::TooManyNegotiators {
                mechanism: self.config.name.clone(),
            });
        }
        self.negotiators.push(negotiator);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn outcome_space(&self) -> &OutcomeSpace {
        &self.config.outcome_space
    }

    pub fn negotiator_ids(&self) -> Vec<String> {
        self.negotiators.iter().map(|n| n.id().to_string()).collect()
    }

    pub fn state(&self) -> &SaoState {
        &self.state
    }

    pub fn agreement(&self) -> Option<&Outcome> {
        self.state.agreement.as_ref()
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    pub fn is_finished(&self) -> bool {
        self.state.status.is_terminal()
    }

    /// Advance by one step (one action or one full round)
    pub fn step(&mut self) -> Result<ThreadStatus> {
        if self.state.status.is_terminal() {
            return Ok(self.state.status);
        }
        if self.negotiators.len() != 2 {
            return Err(NegotiationError::MissingNegotiators {
                mechanism: self.config.name.clone(),
                count: self.negotiators.len(),
            });
        }

        if self.state.status == ThreadStatus::NotStarted {
            self.state.status = ThreadStatus::Running;
            self.started = Some(Instant::now());
            for n in self.negotiators.iter_mut() {
                n.on_negotiation_start(&self.state);
            }
        }

        if self.state.step >= self.config.n_steps {
            self.finish(ThreadStatus::TimedOut);
            return Ok(self.state.status);
        }

        let actions = if self.config.one_offer_per_step { 1 } else { 2 };
        for _ in 0..actions {
            self.act()?;
            if self.state.status.is_terminal() {
                break;
            }
        }

        self.state.step += 1;
        self.state.relative_time = self.state.step as f64 / self.config.n_steps as f64;
        if !self.state.status.is_terminal() && self.state.step >= self.config.n_steps {
            self.finish(ThreadStatus::TimedOut);
        }
        Ok(self.state.status)
    }

    /// Step until a terminal state
    pub fn run(&mut self) -> Result<ThreadStatus> {
        loop {
            let status = self.step()?;
            if status.is_terminal() {
                return Ok(status);
            }
        }
    }

    /// One negotiator's turn: respond to the standing offer, then propose
    fn act(&mut self) -> Result<()> {
        let idx = self.turn;
        let id = self.negotiators[idx].id().to_string();

        let mut response = None;
        let standing = match (&self.state.current_offer, &self.state.current_proposer) {
            (Some(offer), Some(proposer)) if *proposer != id => Some(offer.clone()),
            _ => None,
        };

        if let Some(offer) = standing {
            let r = self.negotiators[idx].respond(&self.state, &offer);
            response = Some(r);
            match r {
                ResponseType::Accept => {
                    self.state.agreement = Some(offer.clone());
                    self.record(&id, Some(offer), response);
                    self.finish(ThreadStatus::Agreement);
                    return Ok(());
                }
                ResponseType::EndNegotiation => {
                    self.record(&id, None, response);
                    self.finish(ThreadStatus::Disagreement);
                    return Ok(());
                }
                ResponseType::Reject => {}
            }
        }

        let proposal = self.negotiators[idx].propose(&self.state).ok_or_else(|| {
            NegotiationError::MissingOffer {
                mechanism: self.config.name.clone(),
                negotiator: id.clone(),
            }
        })?;
        if !self.config.outcome_space.contains(&proposal) {
            return Err(NegotiationError::InvalidOffer {
                mechanism: self.config.name.clone(),
                negotiator: id,
                offer: proposal,
            });
        }

        self.state.current_offer = Some(proposal.clone());
        self.state.current_proposer = Some(id.clone());
        self.state.n_offers += 1;
        self.record(&id, Some(proposal), response);
        self.turn = 1 - idx;
        Ok(())
    }

    fn record(&mut self, negotiator: &str, offer: Option<Outcome>, response: Option<ResponseType>) {
        let time = self.started.map(|t| t.elapsed().as_secs_f64()).unwrap_or(0.0);
        trace!(
            mechanism = %self.config.name,
            negotiator,
            step = self.state.step,
            ?response,
            "action"
        );
        self.trace.push(TraceEntry {
            time,
            relative_time: self.state.relative_time,
            step: self.state.step,
            negotiator: negotiator.to_string(),
            offer,
            response,
            status: self.state.status,
        });
    }

    fn finish(&mut self, status: ThreadStatus) {
        self.state.status = status;
        if status != ThreadStatus::Agreement {
            self.state.agreement = None;
        }
        if status == ThreadStatus::TimedOut {
            self.state.relative_time = 1.0;
        }
        for n in self.negotiators.iter_mut() {
            n.on_negotiation_end(&self.state);
        }
    }
}

// ============================================================================
// SCHEDULING
// ============================================================================

/// How the threads of one session are interleaved
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulingMethod {
    /// Run each thread to completion before the next
    #[default]
    Sequential,
    /// Lockstep: every tick advances each unfinished thread by one step
    Ordered,
    ParallelThreads,
    /// Served by the same worker pool as `ParallelThreads`
    ParallelProcesses,
}

impl std::str::FromStr for SchedulingMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" | "serial" => Ok(Self::Sequential),
            "ordered" => Ok(Self::Ordered),
            "threads" | "parallel-threads" => Ok(Self::ParallelThreads),
            "processes" | "parallel-processes" => Ok(Self::ParallelProcesses),
            other => Err(format!("Unknown scheduling method: {}", other)),
        }
    }
}

/// Drive every mechanism to a terminal state.
///
/// `keep_order = false` randomizes thread order (once for `Sequential`, every
/// tick for `Ordered`). Parallel methods with `keep_order = true` fall back to
/// index-order lockstep.
pub fn run_all<R: Rng + ?Sized>(
    mechanisms: &mut [SaoMechanism],
    method: SchedulingMethod,
    keep_order: bool,
    rng: &mut R,
) -> Result<()> {
    match method {
        SchedulingMethod::Sequential => {
            let mut order: Vec<usize> = (0..mechanisms.len()).collect();
            if !keep_order {
                order.shuffle(rng);
            }
            for i in order {
                mechanisms[i].run()?;
            }
            Ok(())
        }
        SchedulingMethod::Ordered => run_lockstep(mechanisms, keep_order, rng),
        SchedulingMethod::ParallelThreads | SchedulingMethod::ParallelProcesses => {
            if keep_order {
                return run_lockstep(mechanisms, true, rng);
            }
            mechanisms
                .par_iter_mut()
                .map(|m| m.run().map(|_| ()))
                .collect::<Result<Vec<()>>>()?;
            Ok(())
        }
    }
}

fn run_lockstep<R: Rng + ?Sized>(mechanisms: &mut [SaoMechanism], keep_order: bool, rng: &mut R) -> Result<()> {
    loop {
        let mut order: Vec<usize> = (0..mechanisms.len())
            .filter(|&i| !mechanisms[i].is_finished())
            .collect();
        if order.is_empty() {
            return Ok(());
        }
        if !keep_order {
            order.shuffle(rng);
        }
        for i in order {
            mechanisms[i].step()?;
        }
    }
}
