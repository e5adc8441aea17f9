//! Error types for scenario construction and negotiation

use crate::outcome::Outcome;

/// Errors raised by ufuns, scenarios, mechanisms and strategies
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NegotiationError {
    #[error("Initialized with {expected} ufuns but asked for side ufuns of {requested} side negotiators")]
    ArityMismatch { expected: usize, requested: usize },

    #[error("Linear combination of {ufuns} ufuns given {weights} weights")]
    WeightCountMismatch { ufuns: usize, weights: usize },

    #[error("Scenario has {edges} edge ufuns but its center ufun expects {center} edges")]
    EdgeCountMismatch { edges: usize, center: usize },

    #[error("Scenario has {got} side ufuns for {expected} threads")]
    SideCountMismatch { expected: usize, got: usize },

    #[error("Outcome space of edge {thread} is incompatible with the center's space for that thread")]
    IncompatibleOutcomeSpace { thread: usize },

    #[error("Mechanism {mechanism} already has two negotiators")]
    TooManyNegotiators { mechanism: String },

    #[error("Mechanism {mechanism} needs exactly two negotiators to start, has {count}")]
    MissingNegotiators { mechanism: String, count: usize },

    #[error("Negotiator {negotiator} proposed {offer} which is outside the outcome space of {mechanism}")]
    InvalidOffer {
        mechanism: String,
        negotiator: String,
        offer: Outcome,
    },

    #[error("Negotiator {negotiator} made no proposal in {mechanism}")]
    MissingOffer { mechanism: String, negotiator: String },

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("Invalid parameter {name} = {value}")]
    InvalidParameter { name: String, value: f64 },
}

pub type Result<T> = std::result::Result<T, NegotiationError>;
