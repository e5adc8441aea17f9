//! MULTIDEAL Tournament - Sessions, rotations and scoring
//!
//! This crate provides tournament infrastructure:
//! - Running one center against all of its edges (a session)
//! - Rotating competitors through center and edge seats
//! - Serial or parallel job execution with failure isolation
//! - Score aggregation and persisted tournament descriptions
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: Tournament::run, run_session (orchestration)
//! - Level 2: assign_jobs, AssignedScenario::run (phases)
//! - Level 3: run_job, score_session (steps)
//! - Level 4: utilities, configuration

mod config;
mod description;
mod error;
mod runner;
mod scoring;
mod tournament;

pub use config::{EdgeCounting, Parallelism, RunParams, TournamentConfig};
pub use description::{ScenarioSpec, TournamentDescription};
pub use error::{Result, TournamentError};
pub use runner::{
    assign_scenario, run_session, AssignedScenario, EdgeAssignment, SessionOptions, SessionResults,
    SessionSpec, ThreadRecord,
};
pub use scoring::{aggregate, score_session, Role, ScoreRecord, TournamentResults};
pub use tournament::{EdgeSlot, JobFailure, JobInfo, SessionInfo, Tournament};
