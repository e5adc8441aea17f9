//! Agents, strategies and per-thread negotiator endpoints
//!
//! Level 3 of the core: an `Agent` owns one `Strategy` and takes part in one
//! or more threads. Each thread gets its own `ControlledNegotiator` endpoint
//! that forwards protocol calls to the shared agent together with the
//! thread's `ThreadContext`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::center::CenterUfun;
use crate::mechanism::{ResponseType, SaoNegotiator, SaoState};
use crate::outcome::{Outcome, OutcomeSpace};
use crate::ufun::Ufun;

// ============================================================================
// STRATEGY CONTRACT
// ============================================================================

/// What an agent knows about one of its threads
#[derive(Clone, Debug)]
pub struct ThreadContext {
    pub thread: usize,
    /// Endpoint id inside the thread (`s{i}` for the center, `e{i}` for edges)
    pub negotiator_id: String,
    pub is_center: bool,
    /// Ufun used on this thread (side ufun for the center)
    pub ufun: Option<Ufun>,
    /// Partner's ufun, only when ufuns are shared
    pub opponent_ufun: Option<Ufun>,
    pub outcome_space: OutcomeSpace,
    pub n_steps: usize,
}

/// Decision logic of an agent across all of its threads
pub trait Strategy: Send {
    fn name(&self) -> &str;

    /// Called once, after every thread of the session exists
    fn init(&mut self, _threads: &[ThreadContext]) {}

    fn on_negotiation_start(&mut self, _ctx: &ThreadContext, _state: &SaoState) {}

    fn propose(&mut self, ctx: &ThreadContext, state: &SaoState) -> Option<Outcome>;

    fn respond(&mut self, ctx: &ThreadContext, state: &SaoState, offer: &Outcome) -> ResponseType;

    fn on_negotiation_end(&mut self, _ctx: &ThreadContext, _state: &SaoState) {}
}

// ============================================================================
// AGENTS
// ============================================================================

/// The agent's own view of value
#[derive(Clone, Debug)]
pub enum AgentUfun {
    Center(CenterUfun),
    Edge(Ufun),
}

pub struct Agent {
    pub id: String,
    pub strategy: Box<dyn Strategy>,
    pub ufun: Option<AgentUfun>,
    pub threads: Vec<ThreadContext>,
}

impl Agent {
    pub fn new(id: &str, strategy: Box<dyn Strategy>, ufun: Option<AgentUfun>) -> Self {
        Self {
            id: id.to_string(),
            strategy,
            ufun,
            threads: Vec::new(),
        }
    }
}

/// Compact, serializable description of an agent after a session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: String,
    pub strategy: String,
    pub is_center: bool,
    pub n_threads: usize,
}

/// Agent shared by all of its thread endpoints
#[derive(Clone)]
pub struct SharedAgent(Arc<Mutex<Agent>>);

impl SharedAgent {
    pub fn new(agent: Agent) -> Self {
        Self(Arc::new(Mutex::new(agent)))
    }

    fn lock(&self) -> MutexGuard<'_, Agent> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> String {
        self.lock().id.clone()
    }

    pub fn strategy_name(&self) -> String {
        self.lock().strategy.name().to_string()
    }

    pub fn ufun(&self) -> Option<AgentUfun> {
        self.lock().ufun.clone()
    }

    /// Edge ufun, if this agent has one
    pub fn edge_ufun(&self) -> Option<Ufun> {
        match self.lock().ufun.as_ref() {
            Some(AgentUfun::Edge(u)) => Some(u.clone()),
            _ => None,
        }
    }

    pub fn n_threads(&self) -> usize {
        self.lock().threads.len()
    }

    /// Register a thread and return the endpoint to attach to its mechanism
    pub fn create_negotiator(&self, context: ThreadContext) -> Box<dyn SaoNegotiator> {
        let id = context.negotiator_id.clone();
        let slot = {
            let mut agent = self.lock();
            agent.threads.push(context);
            agent.threads.len() - 1
        };
        Box::new(ControlledNegotiator {
            id,
            slot,
            agent: self.clone(),
        })
    }

    /// Hand every registered thread to the strategy
    pub fn init(&self) {
        let mut guard = self.lock();
        let Agent { strategy, threads, .. } = &mut *guard;
        strategy.init(threads);
    }

    pub fn summary(&self) -> AgentSummary {
        let agent = self.lock();
        AgentSummary {
            id: agent.id.clone(),
            strategy: agent.strategy.name().to_string(),
            is_center: matches!(agent.ufun, Some(AgentUfun::Center(_))),
            n_threads: agent.threads.len(),
        }
    }
}

// ============================================================================
// ENDPOINT
// ============================================================================

/// Per-thread endpoint forwarding to its agent
pub struct ControlledNegotiator {
    id: String,
    slot: usize,
    agent: SharedAgent,
}

impl SaoNegotiator for ControlledNegotiator {
    fn id(&self) -> &str {
        &self.id
    }

    fn on_negotiation_start(&mut self, state: &SaoState) {
        let mut guard = self.agent.lock();
        let Agent { strategy, threads, .. } = &mut *guard;
        strategy.on_negotiation_start(&threads[self.slot], state);
    }

    fn propose(&mut self, state: &SaoState) -> Option<Outcome> {
        let mut guard = self.agent.lock();
        let Agent { strategy, threads, .. } = &mut *guard;
        strategy.propose(&threads[self.slot], state)
    }

    fn respond(&mut self, state: &SaoState, offer: &Outcome) -> ResponseType {
        let mut guard = self.agent.lock();
        let Agent { strategy, threads, .. } = &mut *guard;
        strategy.respond(&threads[self.slot], state, offer)
    }

    fn on_negotiation_end(&mut self, state: &SaoState) {
        let mut guard = self.agent.lock();
        let Agent { strategy, threads, .. } = &mut *guard;
        strategy.on_negotiation_end(&threads[self.slot], state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mechanism::{MechanismConfig, SaoMechanism, ThreadStatus};

    #[derive(Default)]
    struct Recorder {
        seen_threads: usize,
        proposals: Vec<usize>,
        ends: usize,
    }

    impl Strategy for Recorder {
        fn name(&self) -> &str {
            "Recorder"
        }

        fn init(&mut self, threads: &[ThreadContext]) {
            self.seen_threads = threads.len();
        }

        fn propose(&mut self, ctx: &ThreadContext, _state: &SaoState) -> Option<Outcome> {
            self.proposals.push(ctx.thread);
            Some(Outcome::ints(&[ctx.thread as i64]))
        }

        fn respond(&mut self, ctx: &ThreadContext, _state: &SaoState, _offer: &Outcome) -> ResponseType {
            if ctx.is_center {
                ResponseType::Reject
            } else {
                ResponseType::Accept
            }
        }

        fn on_negotiation_end(&mut self, _ctx: &ThreadContext, _state: &SaoState) {
            self.ends += 1;
        }
    }

    fn context(thread: usize, id: &str, is_center: bool) -> ThreadContext {
        ThreadContext {
            thread,
            negotiator_id: id.to_string(),
            is_center,
            ufun: None,
            opponent_ufun: None,
            outcome_space: OutcomeSpace::integers("os", 1, 4),
            n_steps: 10,
        }
    }

    #[test]
    fn test_endpoints_share_one_agent() {
        let center = SharedAgent::new(Agent::new("center", Box::new(Recorder::default()), None));
        let mut mechs = Vec::new();
        for i in 0..3 {
            let mut m = SaoMechanism::new(MechanismConfig {
                name: format!("n{}", i),
                outcome_space: OutcomeSpace::integers("os", 1, 4),
                n_steps: 10,
                one_offer_per_step: false,
            });
            m.add(center.create_negotiator(context(i, &format!("s{}", i), true))).unwrap();
            let edge = SharedAgent::new(Agent::new(&format!("e{}", i), Box::new(Recorder::default()), None));
            m.add(edge.create_negotiator(context(i, &format!("e{}", i), false))).unwrap();
            mechs.push(m);
        }
        center.init();
        assert_eq!(center.n_threads(), 3);

        for m in mechs.iter_mut() {
            assert_eq!(m.run().unwrap(), ThreadStatus::Agreement);
        }
        for (i, m) in mechs.iter().enumerate() {
            // the center opens with the thread index and the edge accepts it
            assert_eq!(m.agreement(), Some(&Outcome::ints(&[i as i64])));
        }
        let summary = center.summary();
        assert_eq!(summary.n_threads, 3);
        assert_eq!(summary.strategy, "Recorder");
        assert!(!summary.is_center);
    }

    #[test]
    fn test_init_sees_all_threads() {
        struct Probe(Arc<Mutex<usize>>);
        impl Strategy for Probe {
            fn name(&self) -> &str {
                "Probe"
            }
            fn init(&mut self, threads: &[ThreadContext]) {
                *self.0.lock().unwrap() = threads.len();
            }
            fn propose(&mut self, _ctx: &ThreadContext, _state: &SaoState) -> Option<Outcome> {
                None
            }
            fn respond(&mut self, _ctx: &ThreadContext, _state: &SaoState, _offer: &Outcome) -> ResponseType {
                ResponseType::Reject
            }
        }

        let seen = Arc::new(Mutex::new(0));
        let agent = SharedAgent::new(Agent::new("a", Box::new(Probe(seen.clone())), None));
        for i in 0..5 {
            let _ = agent.create_negotiator(context(i, &format!("s{}", i), true));
        }
        agent.init();
        assert_eq!(*seen.lock().unwrap(), 5);
    }

    #[test]
    fn test_poisoned_agent_still_usable() {
        let agent = SharedAgent::new(Agent::new("a", Box::new(Recorder::default()), None));
        let clone = agent.clone();
        let _ = std::thread::spawn(move || {
            let _guard = clone.0.lock().unwrap();
            panic!("poison");
        })
        .join();
        assert_eq!(agent.id(), "a");
    }
}
