//! Tournament and rerun commands
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run(), rerun() - orchestration
//! - Level 2: build_description(), execute(), save_outputs(), report_results()
//! - Level 4: argument parsing and formatting utilities

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use multideal_core::{CenterUfunKind, Competitor, DinnersConfig, ScenarioGenerator, SchedulingMethod, StrategyRegistry};
use multideal_tournament::{
    EdgeCounting, Parallelism, RunParams, ScenarioSpec, TournamentConfig, TournamentDescription,
    TournamentResults,
};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct TournamentArgs {
    /// Competing strategies
    #[arg(long, value_delimiter = ',', default_value = "Boulware,Linear,Conceder,Random")]
    pub competitors: Vec<String>,

    /// Filler strategies used to pad edge seats (never scored)
    #[arg(long, value_delimiter = ',')]
    pub fillers: Vec<String>,

    #[arg(long, default_value = "1")]
    pub repetitions: usize,

    /// Number of generated scenarios
    #[arg(long, default_value = "2")]
    pub scenarios: usize,

    /// Add the dinners scenario
    #[arg(long)]
    pub dinners: bool,

    /// Edges per generated scenario
    #[arg(long, default_value = "3")]
    pub edges: usize,

    #[arg(long, default_value = "2")]
    pub issues: usize,

    #[arg(long, default_value = "5")]
    pub values: usize,

    #[arg(long, default_value = "max")]
    pub center_ufun: CenterUfunKind,

    /// Which edge seats are scored: genuine, all or first:N
    #[arg(long, default_value = "genuine", value_parser = parse_edge_counting)]
    pub edge_counting: EdgeCounting,

    /// Center score multiplier (default: number of edges)
    #[arg(long)]
    pub center_multiplier: Option<f64>,

    #[arg(long, default_value = "1.0")]
    pub edge_multiplier: f64,

    /// Parallel jobs: omit or negative for serial, 0 for all cores, <1 for a share
    #[arg(long, allow_hyphen_values = true)]
    pub jobs: Option<f64>,

    #[arg(long, default_value = "100")]
    pub steps: usize,

    #[arg(long, default_value = "sequential")]
    pub method: SchedulingMethod,

    #[arg(long)]
    pub keep_order: bool,

    /// Assign sessions without running them
    #[arg(long)]
    pub dry: bool,

    /// Also write per-thread traces
    #[arg(long)]
    pub traces: bool,

    /// Output directory (default: timestamped under multideal_output/)
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Output scores as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct RerunArgs {
    /// Saved description.json
    #[arg(long, value_name = "FILE")]
    pub description: PathBuf,

    /// Output directory (default: timestamped next to the description)
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub json: bool,
}

/// Score tables written to scores.json
#[derive(Serialize)]
struct ScoreSummary<'a> {
    final_scores: &'a BTreeMap<String, f64>,
    final_scores_center: &'a BTreeMap<String, f64>,
    final_scores_edge: &'a BTreeMap<String, f64>,
    center_count: &'a BTreeMap<String, usize>,
    edge_count: &'a BTreeMap<String, usize>,
    weighted_average: &'a BTreeMap<String, f64>,
    n_sessions: usize,
    n_failures: usize,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run tournament command
///
/// 1. Build and save the description
/// 2. Run every job
/// 3. Save and report scores
pub fn run(args: TournamentArgs, seed: Option<u64>) -> Result<()> {
    let mut rng = match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    };

    let dir = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from("multideal_output").join(timestamped("tournament")));
    let description = build_description(&args, &dir, &mut rng)?;

    let path = dir.join("description.json");
    description
        .save(&path)
        .with_context(|| format!("Failed to save description: {}", path.display()))?;
    tracing::info!("Saved description to {}", path.display());

    let results = execute(&description)?;
    save_outputs(&results, &dir)?;
    report_results(&results, args.json)
}

/// Run rerun command
pub fn rerun(args: RerunArgs) -> Result<()> {
    let mut description = TournamentDescription::load(&args.description)
        .with_context(|| format!("Failed to load description: {}", args.description.display()))?;

    let dir = args.output.clone().unwrap_or_else(|| {
        args.description
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(timestamped("rerun"))
    });
    if description.config.output.is_some() {
        description.config.output = Some(dir.clone());
    }

    let results = execute(&description)?;
    save_outputs(&results, &dir)?;
    report_results(&results, args.json)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn build_description<R: Rng>(args: &TournamentArgs, dir: &Path, rng: &mut R) -> Result<TournamentDescription> {
    if args.competitors.is_empty() {
        bail!("At least one competitor is required");
    }

    let generator = ScenarioGenerator::default()
        .with_edges(args.edges)
        .with_issues(args.issues, args.values)
        .with_center_kind(args.center_ufun);
    let mut scenarios: Vec<ScenarioSpec> = (0..args.scenarios)
        .map(|_| ScenarioSpec::Generated {
            generator: generator.clone(),
            seed: rng.gen(),
        })
        .collect();
    if args.dinners {
        scenarios.push(ScenarioSpec::Dinners {
            config: DinnersConfig::default(),
            seed: rng.gen(),
        });
    }

    let mut config = TournamentConfig::default()
        .with_repetitions(args.repetitions)
        .with_edge_counting(args.edge_counting)
        .with_non_competitors(args.fillers.iter().map(|s| Competitor::new(s)).collect())
        .with_parallelism(Parallelism::from_n_jobs(args.jobs))
        .with_multipliers(args.center_multiplier, args.edge_multiplier)
        .with_dry(args.dry)
        .with_seed(rng.gen());
    if args.traces {
        config = config.with_output(dir.to_path_buf());
    }

    Ok(TournamentDescription {
        competitors: args.competitors.iter().map(|s| Competitor::new(s)).collect(),
        scenarios,
        run_params: RunParams::default()
            .with_steps(args.steps)
            .with_keep_order(args.keep_order)
            .with_scheduling(args.method),
        config,
    })
}

/// Run a description with a progress bar
fn execute(description: &TournamentDescription) -> Result<TournamentResults> {
    let tournament = description
        .to_tournament()
        .context("Failed to build scenarios")?;
    let registry = StrategyRegistry::with_builtins();

    let n_jobs = tournament.competitors.len() * tournament.scenarios.len() * description.config.n_repetitions;
    let progress = ProgressBar::new(n_jobs as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} sessions")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let results = tournament
        .run_with_progress(&description.config, &registry, |_| progress.inc(1))
        .context("Tournament failed")?;
    progress.finish_and_clear();

    if !results.failures.is_empty() {
        tracing::warn!("{} of {} sessions failed", results.failures.len(), n_jobs);
    }
    Ok(results)
}

fn save_outputs(results: &TournamentResults, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let summary = ScoreSummary {
        final_scores: &results.final_scores,
        final_scores_center: &results.final_scores_center,
        final_scores_edge: &results.final_scores_edge,
        center_count: &results.center_count,
        edge_count: &results.edge_count,
        weighted_average: &results.weighted_average,
        n_sessions: results.session_results.len(),
        n_failures: results.failures.len(),
    };
    write_json(&dir.join("scores.json"), &summary)?;
    write_json(&dir.join("results.json"), results)?;
    tracing::info!("Saved scores to {}", dir.display());
    Ok(())
}

fn report_results(results: &TournamentResults, json: bool) -> Result<()> {
    if json {
        let output = serde_json::to_string_pretty(&results.weighted_average)
            .context("Failed to serialize scores")?;
        println!("{}", output);
    } else {
        print_text_results(results);
    }
    Ok(())
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn parse_edge_counting(s: &str) -> std::result::Result<EdgeCounting, String> {
    match s {
        "all" => Ok(EdgeCounting::All),
        "genuine" => Ok(EdgeCounting::GenuineOnly),
        other => other
            .strip_prefix("first:")
            .and_then(|n| n.parse::<usize>().ok())
            .map(EdgeCounting::First)
            .ok_or_else(|| format!("Invalid edge counting: {} (use genuine, all or first:N)", other)),
    }
}

fn timestamped(prefix: &str) -> String {
    format!("{}_{}", prefix, chrono::Local::now().format("%Y%m%d_%H%M%S"))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn print_text_results(results: &TournamentResults) {
    println!("\n=== Tournament Results ===");
    println!(
        "Sessions: {} ({} failed)",
        results.session_results.len() + results.failures.len(),
        results.failures.len()
    );
    println!(
        "{:<4} {:<24} {:>10} {:>10} {:>10} {:>6} {:>6}",
        "rank", "agent", "weighted", "center", "edge", "#c", "#e"
    );
    for (rank, (agent, score)) in results.ranking().iter().enumerate() {
        println!(
            "{:<4} {:<24} {:>10.4} {:>10.4} {:>10.4} {:>6} {:>6}",
            rank + 1,
            agent,
            score,
            results.final_scores_center.get(agent).copied().unwrap_or(0.0),
            results.final_scores_edge.get(agent).copied().unwrap_or(0.0),
            results.center_count.get(agent).copied().unwrap_or(0),
            results.edge_count.get(agent).copied().unwrap_or(0),
        );
    }
}
