//! Orchestrator tests: many concurrent matches, lifecycle, and bookkeeping

use std::time::Duration;

use hexarena::combat::engine::{Placement, Rosters};
use hexarena::combat::orchestrator::CombatOrchestrator;
use hexarena::combat::unit::Side;
use hexarena::core::config::{EngineConfig, OrchestratorConfig};
use hexarena::hex::HexCoord;

fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        max_results: 100,
        engine: EngineConfig {
            tick_rate: 200,
            max_ticks: 2_000,
            seed: Some(5),
            ..Default::default()
        },
    }
}

fn walkover_rosters() -> Rosters {
    Rosters {
        challenger: vec![Placement {
            creature_id: "warrior".into(),
            position: HexCoord::new(0, 0),
        }],
        defender: vec![],
    }
}

fn duel_rosters() -> Rosters {
    Rosters {
        challenger: vec![Placement {
            creature_id: "warrior_a".into(),
            position: HexCoord::new(0, 0),
        }],
        defender: vec![Placement {
            creature_id: "warrior_b".into(),
            position: HexCoord::new(1, 0),
        }],
    }
}

async fn wait_until_done(orchestrator: &CombatOrchestrator, match_id: &str) {
    for _ in 0..300 {
        if orchestrator.result(match_id).is_some() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("match {} never completed", match_id);
}

#[tokio::test]
async fn concurrent_matches_are_isolated() {
    let orchestrator = CombatOrchestrator::new(fast_config());
    for i in 0..5 {
        orchestrator
            .start_combat(format!("match_{}", i), &duel_rosters())
            .expect("start");
    }
    assert_eq!(orchestrator.statistics().active_matches, 5);

    // Stopping one match leaves the others running.
    orchestrator.stop_combat("match_2").expect("stop");
    assert!(!orchestrator.is_active("match_2"));
    assert_eq!(orchestrator.statistics().active_matches, 4);
    for i in [0, 1, 3, 4] {
        let id = format!("match_{}", i);
        assert!(orchestrator.is_active(&id));
        assert!(orchestrator.state(&id).is_some());
        orchestrator.stop_combat(&id).expect("stop");
    }
}

#[tokio::test]
async fn finished_match_id_can_be_reused() {
    let orchestrator = CombatOrchestrator::new(fast_config());
    orchestrator
        .start_combat("reuse", &walkover_rosters())
        .expect("start");
    wait_until_done(&orchestrator, "reuse").await;

    orchestrator
        .start_combat("reuse", &walkover_rosters())
        .expect("restart under the same id");
    wait_until_done(&orchestrator, "reuse").await;
    assert_eq!(orchestrator.statistics().stored_results, 2);
}

#[tokio::test]
async fn result_lookup_returns_most_recent_for_id() {
    let orchestrator = CombatOrchestrator::new(fast_config());
    orchestrator
        .start_combat("repeat", &walkover_rosters())
        .expect("start");
    wait_until_done(&orchestrator, "repeat").await;
    orchestrator
        .start_combat("repeat", &walkover_rosters())
        .expect("restart");
    wait_until_done(&orchestrator, "repeat").await;

    let result = orchestrator.result("repeat").expect("result");
    assert_eq!(result.winner, Some(Side::Challenger));
}

#[tokio::test]
async fn subscribe_requires_active_match() {
    let orchestrator = CombatOrchestrator::new(fast_config());
    assert!(orchestrator.subscribe("ghost").is_err());

    orchestrator
        .start_combat("live", &duel_rosters())
        .expect("start");
    let mut updates = orchestrator.subscribe("live").expect("subscribe");
    let snapshot = tokio::time::timeout(Duration::from_secs(2), updates.recv())
        .await
        .expect("snapshot before timeout")
        .expect("channel open");
    assert_eq!(snapshot.match_id, "live");
    orchestrator.stop_combat("live").expect("stop");
}

#[tokio::test]
async fn cleanup_ignores_ticking_matches() {
    let orchestrator = CombatOrchestrator::new(fast_config());
    orchestrator
        .start_combat("healthy", &duel_rosters())
        .expect("start");
    // Give the monitor a few snapshots to observe.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let removed = orchestrator.cleanup_stale(Duration::from_secs(30));
    assert_eq!(removed, 0);
    assert!(orchestrator.is_active("healthy"));
    orchestrator.stop_combat("healthy").expect("stop");
}

#[tokio::test]
async fn stopped_match_leaves_no_result() {
    let orchestrator = CombatOrchestrator::new(fast_config());
    orchestrator
        .start_combat("abandoned", &duel_rosters())
        .expect("start");
    orchestrator.stop_combat("abandoned").expect("stop");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(orchestrator.result("abandoned").is_none());
    assert_eq!(orchestrator.statistics().stored_results, 0);
}
