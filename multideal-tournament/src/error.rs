//! Tournament error types
//!
//! Level 4 - Utilities and configuration

use multideal_core::NegotiationError;

/// Errors that stop a session or a whole tournament
#[derive(Debug, thiserror::Error)]
pub enum TournamentError {
    #[error("Tournament has no competitors")]
    NoCompetitors,

    #[error("Tournament has no scenarios")]
    NoScenarios,

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("Session failed: {0}")]
    Session(#[from] NegotiationError),

    #[error("Failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TournamentError>;
