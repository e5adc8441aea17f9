//! Session command - one center against generated edges
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: build_spec(), run_session(), report_results()
//! - Level 4: formatting utilities

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use multideal_core::{CenterUfunKind, Competitor, ScenarioGenerator, SchedulingMethod, StrategyRegistry};
use multideal_tournament::{run_session, EdgeAssignment, RunParams, SessionResults, SessionSpec};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct SessionArgs {
    /// Number of edges (threads)
    #[arg(long, default_value = "10")]
    pub edges: usize,

    /// Issues per thread
    #[arg(long, default_value = "3")]
    pub issues: usize,

    /// Values per issue
    #[arg(long, default_value = "7")]
    pub values: usize,

    #[arg(long, default_value = "0.0")]
    pub center_rv_min: f64,

    #[arg(long, default_value = "0.0")]
    pub center_rv_max: f64,

    #[arg(long, default_value = "0.1")]
    pub edge_rv_min: f64,

    #[arg(long, default_value = "0.4")]
    pub edge_rv_max: f64,

    /// Center ufun: max, linear or meansm
    #[arg(long, default_value = "max")]
    pub center_ufun: CenterUfunKind,

    /// Center strategy
    #[arg(long, default_value = "Boulware")]
    pub center: String,

    /// Edge strategies, cycled over the threads
    #[arg(long, value_delimiter = ',', default_value = "Boulware,Random,Linear,Conceder")]
    pub edge_types: Vec<String>,

    /// Sample edge strategies instead of cycling them
    #[arg(long)]
    pub sample_edges: bool,

    /// Step budget per thread
    #[arg(long, default_value = "100")]
    pub steps: usize,

    /// Do not randomize thread order
    #[arg(long)]
    pub keep_order: bool,

    /// Give negotiators their partner's ufun
    #[arg(long)]
    pub share_ufuns: bool,

    /// One offer per step
    #[arg(long)]
    pub atomic: bool,

    /// Scheduling: sequential, ordered, threads or processes
    #[arg(long, default_value = "sequential")]
    pub method: SchedulingMethod,

    /// Build the session without running it
    #[arg(long)]
    pub dry: bool,

    /// Directory for thread traces
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Session name
    #[arg(long, default_value = "session")]
    pub name: String,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run session command
pub fn run(args: SessionArgs, seed: Option<u64>) -> Result<()> {
    let spec = build_spec(&args);
    let registry = StrategyRegistry::with_builtins();
    let mut rng = match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    };

    tracing::info!(
        "Starting session {}: {} edges, {} issues x {} values, center={}",
        spec.name,
        args.edges,
        args.issues,
        args.values,
        spec.center
    );

    let results = run_session(&spec, &registry, &mut rng)
        .with_context(|| format!("Session {} failed", spec.name))?;

    report_results(&results, &args)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn build_spec(args: &SessionArgs) -> SessionSpec {
    SessionSpec {
        name: args.name.clone(),
        generator: ScenarioGenerator::default()
            .with_edges(args.edges)
            .with_issues(args.issues, args.values)
            .with_center_rv(args.center_rv_min, args.center_rv_max)
            .with_edge_rv(args.edge_rv_min, args.edge_rv_max)
            .with_center_kind(args.center_ufun),
        center: Competitor::new(&args.center),
        edges: args.edge_types.iter().map(|s| Competitor::new(s)).collect(),
        assignment: if args.sample_edges {
            EdgeAssignment::Sample
        } else {
            EdgeAssignment::Cycle
        },
        run_params: RunParams::default()
            .with_steps(args.steps)
            .with_keep_order(args.keep_order)
            .with_shared_ufuns(args.share_ufuns)
            .with_atomic_offers(args.atomic)
            .with_scheduling(args.method),
        output: args.output.clone(),
        dry: args.dry,
    }
}

fn report_results(results: &SessionResults, args: &SessionArgs) -> Result<()> {
    if args.json {
        let json = serde_json::to_string_pretty(results).context("Failed to serialize results")?;
        println!("{}", json);
    } else {
        print_text_results(results);
    }
    Ok(())
}

// ============================================================================
// LEVEL 4 - FORMATTING
// ============================================================================

fn print_text_results(results: &SessionResults) {
    println!("\n=== Session Results ===");
    println!("{:<6} {:<14} {:<12} {:<24} {:>8}", "thread", "edge", "status", "agreement", "utility");
    for ((thread, edge), utility) in results
        .threads
        .iter()
        .zip(&results.edges)
        .zip(&results.edge_utilities)
    {
        let agreement = thread
            .state
            .agreement
            .as_ref()
            .map(|o| o.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<14} {:<12} {:<24} {:>8.3}",
            thread.name,
            edge.strategy,
            format!("{:?}", thread.state.status),
            agreement,
            utility
        );
    }
    println!(
        "Agreements:     {}/{}",
        results.n_agreements(),
        results.agreements.len()
    );
    println!("Center utility: {:.4} ({})", results.center_utility, results.center.strategy);
}
