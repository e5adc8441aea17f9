//! MULTIDEAL CLI - Command-line interface
//!
//! Commands:
//! - session: Run one generated multi-deal session
//! - tournament: Run a rotation tournament and save its description and scores
//! - rerun: Run a saved tournament description again

mod session_cmd;
mod tournament_cmd;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "multideal")]
#[command(about = "One-to-many negotiation sessions and tournaments")]
struct Cli {
    /// Random seed for reproducibility
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single session on a generated scenario
    Session(session_cmd::SessionArgs),
    /// Run a tournament between competing strategies
    Tournament(tournament_cmd::TournamentArgs),
    /// Run a saved tournament description again
    Rerun(tournament_cmd::RerunArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Session(args) => session_cmd::run(args, cli.seed),
        Commands::Tournament(args) => tournament_cmd::run(args, cli.seed),
        Commands::Rerun(args) => tournament_cmd::rerun(args),
    }
}
