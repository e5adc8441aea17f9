//! Persisted tournament description
//!
//! Level 4 - Utilities and configuration
//!
//! Scenarios are stored as generator parameters plus a seed, so loading a
//! description rebuilds exactly the same scenarios.

use std::fs;
use std::path::Path;

use multideal_core::{
    make_dinners_scenario, make_multideal_scenario, Competitor, DinnersConfig, Scenario,
    ScenarioGenerator,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{RunParams, TournamentConfig};
use crate::error::Result;
use crate::tournament::Tournament;

/// Recipe for one scenario
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ScenarioSpec {
    Generated { generator: ScenarioGenerator, seed: u64 },
    Dinners { config: DinnersConfig, seed: u64 },
}

impl ScenarioSpec {
    pub fn build(&self) -> Result<Scenario> {
        let scenario = match self {
            ScenarioSpec::Generated { generator, seed } => {
                make_multideal_scenario(generator, &mut ChaCha8Rng::seed_from_u64(*seed))?
            }
            ScenarioSpec::Dinners { config, seed } => {
                make_dinners_scenario(config, &mut ChaCha8Rng::seed_from_u64(*seed))?
            }
        };
        Ok(scenario)
    }
}

/// Everything needed to run a tournament again
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TournamentDescription {
    pub competitors: Vec<Competitor>,
    pub scenarios: Vec<ScenarioSpec>,
    pub run_params: RunParams,
    pub config: TournamentConfig,
}

impl TournamentDescription {
    /// Save description to JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load description from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Rebuild the scenarios and the tournament
    pub fn to_tournament(&self) -> Result<Tournament> {
        let scenarios = self
            .scenarios
            .iter()
            .map(ScenarioSpec::build)
            .collect::<Result<Vec<_>>>()?;
        Ok(Tournament::new(
            self.competitors.clone(),
            scenarios,
            self.run_params.clone(),
        ))
    }
}
