//! MULTIDEAL Core - One-to-many negotiation model
//!
//! This crate provides the core negotiation model:
//! - Outcomes and discrete outcome spaces
//! - Edge ufuns and center ufuns with derived side ufuns
//! - Scenario construction and random scenario generators
//! - Alternating-offers mechanism with multi-thread scheduling
//! - Agents, strategies and the strategy registry

pub mod outcome;
pub mod error;
pub mod ufun;
pub mod center;
pub mod scenario;
pub mod mechanism;
pub mod negotiator;
pub mod strategies;

// Re-exports for convenient access
pub use outcome::{Issue, Outcome, OutcomeSpace, Value};
pub use error::{NegotiationError, Result};
pub use ufun::{LinearAdditiveUfun, MappingUfun, Ufun, UtilityFunction, EPSILON};
pub use center::{
    CenterUfun, CenterUtilityFunction, CombiningCenterUfun, DinnersEvaluator, LambdaCenterUfun,
    LinearCombinationCenterUfun, MaxCenterUfun, MeanSmCenterUfun, SideUfun,
};
pub use scenario::{
    make_dinners_scenario, make_multideal_scenario, CenterUfunKind, DinnersConfig, Scenario,
    ScenarioGenerator,
};
pub use mechanism::{
    run_all, MechanismConfig, ResponseType, SaoMechanism, SaoNegotiator, SaoState, SchedulingMethod,
    ThreadStatus, TraceEntry,
};
pub use negotiator::{Agent, AgentSummary, AgentUfun, SharedAgent, Strategy, ThreadContext};
pub use strategies::{Competitor, RandomStrategy, StrategyParams, StrategyRegistry, TimeBasedStrategy};
