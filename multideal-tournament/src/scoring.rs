//! Score ledger and aggregation
//!
//! Level 3 - Steps

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::TournamentConfig;
use crate::tournament::{JobFailure, SessionInfo};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Center,
    Edge,
}

/// One scored appearance of an agent in one session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub agent: String,
    pub utility: f64,
    pub partner_average_utility: f64,
    pub scenario: String,
    pub scenario_index: usize,
    pub repetition: usize,
    pub rotation: usize,
    pub role: Role,
    /// Thread index for edges, `None` for the center
    pub index: Option<usize>,
}

/// Aggregated outcome of a tournament, keyed by agent identity
#[derive(Clone, Debug, Default, Serialize)]
pub struct TournamentResults {
    pub final_scores: BTreeMap<String, f64>,
    pub final_scores_center: BTreeMap<String, f64>,
    pub final_scores_edge: BTreeMap<String, f64>,
    pub center_count: BTreeMap<String, usize>,
    pub edge_count: BTreeMap<String, usize>,
    /// Half the mean center score plus half the mean edge score
    pub weighted_average: BTreeMap<String, f64>,
    pub scores: Vec<ScoreRecord>,
    pub session_results: Vec<SessionInfo>,
    pub failures: Vec<JobFailure>,
}

impl TournamentResults {
    /// Agents by decreasing weighted average
    pub fn ranking(&self) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> =
            self.weighted_average.iter().map(|(k, v)| (k.clone(), *v)).collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }

    pub fn winner(&self) -> Option<(String, f64)> {
        self.ranking().into_iter().next()
    }
}

/// Score records of one session
pub fn score_session(info: &SessionInfo, config: &TournamentConfig) -> Vec<ScoreRecord> {
    let job = &info.job;
    let results = &info.results;
    let n_edges = results.edge_utilities.len();

    let center_multiplier = config.center_multiplier.unwrap_or(n_edges as f64);
    let edge_mean = mean(&results.edge_utilities);

    let mut records = Vec::with_capacity(n_edges + 1);
    records.push(ScoreRecord {
        agent: job.center.agent_id(),
        utility: results.center_utility * center_multiplier,
        partner_average_utility: edge_mean,
        scenario: job.scenario_name.clone(),
        scenario_index: job.scenario_index,
        repetition: job.repetition,
        rotation: job.rotation,
        role: Role::Center,
        index: None,
    });

    for (i, (slot, utility)) in job.edges.iter().zip(&results.edge_utilities).enumerate() {
        if !slot.counted {
            continue;
        }
        records.push(ScoreRecord {
            agent: slot.competitor.agent_id(),
            utility: utility * config.edge_multiplier,
            partner_average_utility: results.center_utility,
            scenario: job.scenario_name.clone(),
            scenario_index: job.scenario_index,
            repetition: job.repetition,
            rotation: job.rotation,
            role: Role::Edge,
            index: Some(i),
        });
    }
    records
}

/// Fold all sessions into final scores.
///
/// `agents` are listed with zero scores even when they never appear.
pub fn aggregate(
    agents: &[String],
    sessions: Vec<SessionInfo>,
    failures: Vec<JobFailure>,
    config: &TournamentConfig,
) -> TournamentResults {
    let mut results = TournamentResults::default();
    for agent in agents {
        results.final_scores_center.insert(agent.clone(), 0.0);
        results.final_scores_edge.insert(agent.clone(), 0.0);
        results.center_count.insert(agent.clone(), 0);
        results.edge_count.insert(agent.clone(), 0);
    }

    for info in &sessions {
        for record in score_session(info, config) {
            let (sums, counts) = match record.role {
                Role::Center => (&mut results.final_scores_center, &mut results.center_count),
                Role::Edge => (&mut results.final_scores_edge, &mut results.edge_count),
            };
            *sums.entry(record.agent.clone()).or_insert(0.0) += record.utility;
            *counts.entry(record.agent.clone()).or_insert(0) += 1;
            results.scores.push(record);
        }
    }

    let keys: Vec<String> = results
        .final_scores_center
        .keys()
        .chain(results.final_scores_edge.keys())
        .cloned()
        .collect();
    for agent in keys {
        let center = results.final_scores_center.get(&agent).copied().unwrap_or(0.0);
        let edge = results.final_scores_edge.get(&agent).copied().unwrap_or(0.0);
        let n_center = results.center_count.get(&agent).copied().unwrap_or(0);
        let n_edge = results.edge_count.get(&agent).copied().unwrap_or(0);

        results.final_scores.insert(agent.clone(), center + edge);
        results
            .weighted_average
            .insert(agent, 0.5 * (average(center, n_center) + average(edge, n_edge)));
    }

    results.session_results = sessions;
    results.failures = failures;
    results
}

fn average(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Mean over finite values, zero if there are none
fn mean(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    average(finite.iter().sum(), finite.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{SessionResults, ThreadRecord};
    use crate::tournament::{EdgeSlot, JobInfo};
    use multideal_core::{AgentSummary, Competitor};

    fn summary(id: &str, is_center: bool) -> AgentSummary {
        AgentSummary {
            id: id.to_string(),
            strategy: "Linear".to_string(),
            is_center,
            n_threads: 1,
        }
    }

    fn session(center: &str, edges: &[(&str, bool)], center_utility: f64, edge_utilities: Vec<f64>) -> SessionInfo {
        let job = JobInfo {
            scenario_index: 0,
            scenario_name: "s".to_string(),
            repetition: 0,
            rotation: 0,
            center: Competitor::new(center),
            edges: edges
                .iter()
                .map(|(name, counted)| EdgeSlot {
                    competitor: Competitor::new(name),
                    counted: *counted,
                })
                .collect(),
            seed: 0,
            name: "s_0_0".to_string(),
            output: None,
        };
        SessionInfo {
            job,
            results: SessionResults {
                threads: Vec::<ThreadRecord>::new(),
                center: summary("center", true),
                edges: edges.iter().map(|(n, _)| summary(n, false)).collect(),
                agreements: vec![None; edge_utilities.len()],
                center_utility,
                edge_utilities,
            },
        }
    }

    #[test]
    fn test_center_and_edge_records() {
        let info = session("A", &[("B", true), ("C", false)], 0.5, vec![0.2, 0.6]);
        let records = score_session(&info, &TournamentConfig::default());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].role, Role::Center);
        // default multiplier is the edge count
        assert!((records[0].utility - 1.0).abs() < 1e-9);
        assert!((records[0].partner_average_utility - 0.4).abs() < 1e-9);
        assert_eq!(records[1].agent, "B");
        assert_eq!(records[1].index, Some(0));
        assert_eq!(records[1].partner_average_utility, 0.5);
    }

    #[test]
    fn test_multipliers() {
        let info = session("A", &[("B", true)], 0.5, vec![0.2]);
        let config = TournamentConfig::default().with_multipliers(Some(3.0), 10.0);
        let records = score_session(&info, &config);
        assert!((records[0].utility - 1.5).abs() < 1e-9);
        assert!((records[1].utility - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_weighted_average() {
        let agents = vec!["A".to_string(), "B".to_string(), "Z".to_string()];
        let sessions = vec![
            session("A", &[("B", true)], 1.0, vec![0.5]),
            session("B", &[("A", true)], 0.25, vec![0.75]),
        ];
        let results = aggregate(&agents, sessions, Vec::new(), &TournamentConfig::default());
        assert_eq!(results.center_count["A"], 1);
        assert_eq!(results.edge_count["A"], 1);
        assert!((results.final_scores["A"] - 1.75).abs() < 1e-9);
        assert!((results.weighted_average["A"] - 0.875).abs() < 1e-9);
        assert!((results.weighted_average["B"] - 0.375).abs() < 1e-9);
        assert_eq!(results.weighted_average["Z"], 0.0);
        assert_eq!(results.winner().unwrap().0, "A");
        assert_eq!(results.scores.len(), 4);
    }

    #[test]
    fn test_nan_edges_ignored_in_partner_average() {
        let info = session("A", &[("B", true), ("C", true)], 0.0, vec![f64::NAN, 0.8]);
        let records = score_session(&info, &TournamentConfig::default());
        assert!((records[0].partner_average_utility - 0.8).abs() < 1e-9);
    }
}
