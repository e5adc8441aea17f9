//! Integration tests for the multi-deal negotiation runner
//!
//! Tests the full stack: scenarios, center ufuns, mechanisms, sessions,
//! tournaments and the `multideal` binary

use std::process::Command;
use std::sync::Arc;

use multideal_core::{
    make_dinners_scenario, make_multideal_scenario, CenterUfun, CenterUfunKind, Competitor,
    DinnersConfig, MaxCenterUfun, Outcome, OutcomeSpace, LinearAdditiveUfun, Scenario,
    ScenarioGenerator, SchedulingMethod, StrategyRegistry, ThreadStatus, Ufun,
};
use multideal_tournament::{
    assign_scenario, EdgeAssignment, EdgeCounting, Parallelism, RunParams, ScenarioSpec,
    SessionOptions, Tournament, TournamentConfig, TournamentDescription,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn registry() -> StrategyRegistry {
    StrategyRegistry::with_builtins()
}

fn four_competitors() -> Vec<Competitor> {
    vec![
        Competitor::new("Boulware"),
        Competitor::new("Linear"),
        Competitor::new("Conceder"),
        Competitor::new("Random"),
    ]
}

fn serial(seed: u64) -> TournamentConfig {
    TournamentConfig::default()
        .with_parallelism(Parallelism::Serial)
        .with_seed(seed)
}

// ============================================================================
// SCENARIO AND UFUN TESTS
// ============================================================================

#[test]
fn test_center_reserved_value_on_total_disagreement() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    for kind in [CenterUfunKind::Max, CenterUfunKind::Linear, CenterUfunKind::MeanSm] {
        let gen = ScenarioGenerator::default()
            .with_edges(4)
            .with_center_rv(0.2, 0.2)
            .with_center_kind(kind);
        let s = make_multideal_scenario(&gen, &mut rng).unwrap();
        assert_eq!(s.center_ufun.eval(&[]), 0.2);
        assert_eq!(s.center_ufun.eval(&[None, None, None, None]), 0.2);
    }
}

#[test]
fn test_scenario_with_derived_side_ufuns() {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let ufuns: Vec<Ufun> = (0..3)
        .map(|i| {
            Arc::new(LinearAdditiveUfun::random(
                OutcomeSpace::integers(&format!("t{}", i), 2, 4),
                0.0,
                &mut rng,
            )) as Ufun
        })
        .collect();
    let center = CenterUfun::new(MaxCenterUfun::new(ufuns.clone(), 0.0));
    let s = Scenario::new("max", center, ufuns.clone(), None).unwrap();
    let sides = s.side_ufuns().unwrap();
    for (a, b) in sides.iter().zip(&ufuns) {
        assert!(Arc::ptr_eq(a, b));
    }
}

#[test]
fn test_dinners_center_values() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let config = DinnersConfig::default().with_values(vec![(vec![1, 1, 1], 1.0)]);
    let s = make_dinners_scenario(&config, &mut rng).unwrap();
    let day = |d: i64| Some(Outcome::ints(&[d]));
    assert_eq!(s.center_ufun.eval(&[day(0), day(1), day(2)]), 1.0);
    assert_eq!(s.center_ufun.eval(&[day(0), day(0), day(1)]), 0.0);
}

// ============================================================================
// SESSION TESTS
// ============================================================================

#[test]
fn test_every_scheduling_method_finishes() {
    let methods = [
        SchedulingMethod::Sequential,
        SchedulingMethod::Ordered,
        SchedulingMethod::ParallelThreads,
        SchedulingMethod::ParallelProcesses,
    ];
    for method in methods {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let gen = ScenarioGenerator::default().with_edges(4).with_issues(2, 3);
        let scenario = make_multideal_scenario(&gen, &mut rng).unwrap();
        let assigned = assign_scenario(
            scenario,
            RunParams::default().with_steps(15).with_scheduling(method),
            &Competitor::new("Boulware"),
            &four_competitors(),
            &registry(),
            EdgeAssignment::Cycle,
            &mut rng,
        )
        .unwrap();
        let results = assigned
            .run(&SessionOptions {
                name: "all".into(),
                seed: 9,
                ..SessionOptions::default()
            })
            .unwrap();
        for t in &results.threads {
            assert!(
                matches!(
                    t.state.status,
                    ThreadStatus::Agreement | ThreadStatus::Disagreement | ThreadStatus::TimedOut
                ),
                "{:?}: {} ended as {:?}",
                method,
                t.name,
                t.state.status
            );
        }
    }
}

#[test]
fn test_atomic_offers_bound_offers_per_step() {
    let run = |atomic: bool| {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let gen = ScenarioGenerator::default().with_edges(2).with_issues(2, 3);
        let scenario = make_multideal_scenario(&gen, &mut rng).unwrap();
        let assigned = assign_scenario(
            scenario,
            RunParams::default()
                .with_steps(12)
                .with_atomic_offers(atomic)
                .with_keep_order(true),
            &Competitor::new("Random"),
            &[Competitor::new("Random")],
            &registry(),
            EdgeAssignment::Cycle,
            &mut rng,
        )
        .unwrap();
        assigned.run(&SessionOptions::default()).unwrap()
    };
    for t in &run(true).threads {
        assert!(t.state.n_offers <= 12);
        assert!(t.state.step <= 12);
    }
    for t in &run(false).threads {
        assert!(t.state.n_offers <= 24);
    }
}

// ============================================================================
// TOURNAMENT TESTS
// ============================================================================

#[test]
fn test_four_competitors_three_edges_two_repetitions() {
    let mut rng = ChaCha8Rng::seed_from_u64(6);
    let gen = ScenarioGenerator::default().with_edges(3).with_issues(2, 3);
    let t = Tournament::from_scenarios(
        four_competitors(),
        Vec::new(),
        1,
        &gen,
        RunParams::default().with_steps(10),
        &mut rng,
    )
    .unwrap();
    let results = t.run(&serial(1).with_repetitions(2), &registry()).unwrap();

    assert_eq!(results.session_results.len(), 8);
    assert_eq!(results.center_count.values().sum::<usize>(), 8);
    // K == N + 1: every competitor in every session
    for info in &results.session_results {
        assert_eq!(info.job.edges.len(), 3);
        assert!(info.job.edges.iter().all(|e| e.counted));
    }
    for c in four_competitors() {
        assert_eq!(results.center_count[&c.agent_id()], 2);
        assert_eq!(results.edge_count[&c.agent_id()], 6);
    }
}

#[test]
fn test_parallel_tournament_matches_serial() {
    let desc = TournamentDescription {
        competitors: four_competitors(),
        scenarios: vec![
            ScenarioSpec::Generated {
                generator: ScenarioGenerator::default().with_edges(2).with_issues(2, 3),
                seed: 1,
            },
            ScenarioSpec::Dinners {
                config: DinnersConfig::default(),
                seed: 2,
            },
        ],
        run_params: RunParams::default().with_steps(10),
        config: serial(3).with_edge_counting(EdgeCounting::All),
    };
    let t = desc.to_tournament().unwrap();
    let a = t.run(&desc.config, &registry()).unwrap();
    let parallel = desc.config.clone().with_parallelism(Parallelism::Workers(3));
    let b = t.run(&parallel, &registry()).unwrap();
    assert_eq!(a.scores, b.scores);
    assert_eq!(a.weighted_average, b.weighted_average);
}

// ============================================================================
// BINARY TESTS
// ============================================================================

#[test]
fn test_cli_tournament_writes_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("run");
    let status = Command::new(env!("CARGO_BIN_EXE_multideal"))
        .args([
            "--seed",
            "7",
            "tournament",
            "--competitors",
            "Boulware,Linear,Random",
            "--scenarios",
            "1",
            "--edges",
            "2",
            "--steps",
            "10",
            "--json",
            "--output",
        ])
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());
    for file in ["description.json", "scores.json", "results.json"] {
        assert!(out.join(file).exists(), "missing {}", file);
    }

    let rerun = dir.path().join("again");
    let status = Command::new(env!("CARGO_BIN_EXE_multideal"))
        .args(["rerun", "--json", "--description"])
        .arg(out.join("description.json"))
        .arg("--output")
        .arg(&rerun)
        .status()
        .unwrap();
    assert!(status.success());

    let first = std::fs::read_to_string(out.join("scores.json")).unwrap();
    let second = std::fs::read_to_string(rerun.join("scores.json")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_cli_session_json() {
    let output = Command::new(env!("CARGO_BIN_EXE_multideal"))
        .args(["--seed", "3", "session", "--edges", "3", "--steps", "10", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["agreements"].as_array().unwrap().len(), 3);
}

#[test]
fn test_cli_rejects_unknown_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let status = Command::new(env!("CARGO_BIN_EXE_multideal"))
        .args(["tournament", "--competitors", "Nobody", "--output"])
        .arg(dir.path())
        .status()
        .unwrap();
    assert!(!status.success());
}
