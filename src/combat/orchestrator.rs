//! Multi-match orchestration
//!
//! Owns every running [`CombatEngine`], one monitor task per match. The
//! monitor watches the engine's snapshot and completion channels: snapshots
//! bump a liveness timestamp, completion moves the match from the active set
//! into the bounded result store.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::combat::engine::{CombatEngine, Rosters};
use crate::combat::state::{CombatResult, MatchState};
use crate::core::config::OrchestratorConfig;
use crate::core::error::{CombatError, Result};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// How often a monitor re-checks liveness when no snapshots arrive
const MONITOR_IDLE_PERIOD: Duration = Duration::from_millis(250);

struct ActiveMatch {
    engine: CombatEngine,
    started_at: Instant,
    /// Bumped by the monitor on every snapshot; drives [`CombatOrchestrator::cleanup_stale`]
    last_update: Arc<Mutex<Instant>>,
    monitor: JoinHandle<()>,
}

impl Drop for ActiveMatch {
    fn drop(&mut self) {
        self.monitor.abort();
    }
}

/// How long one active match has been running
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchUptime {
    pub match_id: String,
    pub uptime: Duration,
}

/// Point-in-time orchestrator counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorStats {
    pub active_matches: usize,
    pub stored_results: usize,
    pub uptimes: Vec<MatchUptime>,
}

/// Runs any number of concurrent matches, each fully isolated
pub struct CombatOrchestrator {
    config: OrchestratorConfig,
    active: Arc<Mutex<AHashMap<String, ActiveMatch>>>,
    results: Arc<Mutex<VecDeque<CombatResult>>>,
}

impl CombatOrchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            config,
            active: Arc::new(Mutex::new(AHashMap::new())),
            results: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Initialize and start a match under the given id
    ///
    /// Fails if a match with this id is already active; completed ids may
    /// be reused.
    pub fn start_combat(&self, match_id: impl Into<String>, rosters: &Rosters) -> Result<()> {
        let match_id = match_id.into();
        {
            let active = lock(&self.active);
            if active.contains_key(&match_id) {
                return Err(CombatError::MatchAlreadyActive(match_id));
            }
        }

        let mut engine = CombatEngine::initialize(
            match_id.clone(),
            rosters,
            self.config.engine.clone(),
        );
        let update_rx = engine.subscribe();
        let completion_rx = engine.completion();
        engine.start()?;

        let last_update = Arc::new(Mutex::new(Instant::now()));
        let monitor = self.spawn_monitor(
            match_id.clone(),
            update_rx,
            completion_rx,
            Arc::clone(&last_update),
        );

        let entry = ActiveMatch {
            engine,
            started_at: Instant::now(),
            last_update,
            monitor,
        };

        let mut active = lock(&self.active);
        // A racing start with the same id loses; back out this one's tasks.
        if active.contains_key(&match_id) {
            let mut entry = entry;
            entry.engine.stop();
            return Err(CombatError::MatchAlreadyActive(match_id));
        }
        info!(match_id = %match_id, total_active = active.len() + 1, "combat started");
        active.insert(match_id, entry);
        Ok(())
    }

    fn spawn_monitor(
        &self,
        match_id: String,
        mut update_rx: broadcast::Receiver<MatchState>,
        mut completion_rx: tokio::sync::watch::Receiver<Option<CombatResult>>,
        last_update: Arc<Mutex<Instant>>,
    ) -> JoinHandle<()> {
        let active = Arc::clone(&self.active);
        let results = Arc::clone(&self.results);
        let max_results = self.config.max_results;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = completion_rx.changed() => {
                        if changed.is_err() {
                            // Engine dropped without completing (stopped).
                            break;
                        }
                        let result = completion_rx.borrow_and_update().clone();
                        if let Some(result) = result {
                            debug!(
                                match_id = %match_id,
                                winner = ?result.winner,
                                "archiving result"
                            );
                            {
                                let mut results = lock(&results);
                                while results.len() >= max_results {
                                    results.pop_front();
                                }
                                results.push_back(result);
                            }
                            lock(&active).remove(&match_id);
                            break;
                        }
                    }
                    update = update_rx.recv() => {
                        match update {
                            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                                // Lag still proves the engine is ticking.
                                *lock(&last_update) = Instant::now();
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                // Sender gone; completion handling above is
                                // all that remains.
                                tokio::time::sleep(MONITOR_IDLE_PERIOD).await;
                            }
                        }
                    }
                }
            }
        })
    }

    /// Stop an active match. Its partial state is discarded, not archived.
    pub fn stop_combat(&self, match_id: &str) -> Result<()> {
        let entry = lock(&self.active).remove(match_id);
        match entry {
            Some(mut entry) => {
                entry.engine.stop();
                info!(match_id, elapsed = ?entry.started_at.elapsed(), "combat stopped");
                Ok(())
            }
            None => Err(CombatError::MatchNotFound(match_id.to_string())),
        }
    }

    /// Pause an active match in place; resume with [`Self::resume_combat`]
    pub fn pause_combat(&self, match_id: &str) -> Result<()> {
        let mut active = lock(&self.active);
        match active.get_mut(match_id) {
            Some(entry) => {
                entry.engine.pause();
                Ok(())
            }
            None => Err(CombatError::MatchNotFound(match_id.to_string())),
        }
    }

    pub fn resume_combat(&self, match_id: &str) -> Result<()> {
        let mut active = lock(&self.active);
        match active.get_mut(match_id) {
            Some(entry) => entry.engine.start(),
            None => Err(CombatError::MatchNotFound(match_id.to_string())),
        }
    }

    /// Snapshot of an active match's state
    pub fn state(&self, match_id: &str) -> Option<MatchState> {
        lock(&self.active).get(match_id).map(|e| e.engine.state())
    }

    /// Archived result of a completed match
    pub fn result(&self, match_id: &str) -> Option<CombatResult> {
        lock(&self.results)
            .iter()
            .rev()
            .find(|r| r.match_id == match_id)
            .cloned()
    }

    /// Subscribe to an active match's per-tick snapshots
    pub fn subscribe(&self, match_id: &str) -> Result<broadcast::Receiver<MatchState>> {
        lock(&self.active)
            .get(match_id)
            .map(|e| e.engine.subscribe())
            .ok_or_else(|| CombatError::MatchNotFound(match_id.to_string()))
    }

    pub fn is_active(&self, match_id: &str) -> bool {
        lock(&self.active).contains_key(match_id)
    }

    pub fn active_match_ids(&self) -> Vec<String> {
        lock(&self.active).keys().cloned().collect()
    }

    pub fn statistics(&self) -> OrchestratorStats {
        let active = lock(&self.active);
        let uptimes = active
            .iter()
            .map(|(id, e)| MatchUptime {
                match_id: id.clone(),
                uptime: e.started_at.elapsed(),
            })
            .collect();
        OrchestratorStats {
            active_matches: active.len(),
            stored_results: lock(&self.results).len(),
            uptimes,
        }
    }

    /// Stop and drop every active match with no snapshot in the last
    /// `threshold`. Returns how many were removed.
    pub fn cleanup_stale(&self, threshold: Duration) -> usize {
        let stale: Vec<String> = {
            let active = lock(&self.active);
            active
                .iter()
                .filter(|(_, e)| lock(&e.last_update).elapsed() >= threshold)
                .map(|(id, _)| id.clone())
                .collect()
        };

        let mut removed = 0;
        for id in stale {
            if let Some(mut entry) = lock(&self.active).remove(&id) {
                warn!(match_id = %id, "removing stale match");
                entry.engine.stop();
                removed += 1;
            }
        }
        removed
    }
}

impl Default for CombatOrchestrator {
    fn default() -> Self {
        Self::new(OrchestratorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::engine::Placement;
    use crate::core::config::EngineConfig;
    use crate::hex::HexCoord;

    fn fast_config() -> OrchestratorConfig {
        OrchestratorConfig {
            max_results: 100,
            engine: EngineConfig {
                tick_rate: 200,
                max_ticks: 400,
                seed: Some(11),
                ..Default::default()
            },
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

    async fn wait_for_result(
        orchestrator: &CombatOrchestrator,
        match_id: &str,
    ) -> Option<CombatResult> {
        for _ in 0..300 {
            if let Some(result) = orchestrator.result(match_id) {
                return Some(result);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }

    #[tokio::test]
    async fn test_duplicate_match_id_rejected() {
        let orchestrator = CombatOrchestrator::new(fast_config());
        orchestrator
            .start_combat("m1", &duel_rosters())
            .expect("first start");
        let err = orchestrator
            .start_combat("m1", &duel_rosters())
            .expect_err("duplicate");
        assert!(matches!(err, CombatError::MatchAlreadyActive(_)));
        orchestrator.stop_combat("m1").expect("stop");
    }

    #[tokio::test]
    async fn test_stop_unknown_match_fails() {
        let orchestrator = CombatOrchestrator::new(fast_config());
        let err = orchestrator.stop_combat("nope").expect_err("missing");
        assert!(matches!(err, CombatError::MatchNotFound(_)));
    }

    #[tokio::test]
    async fn test_completed_match_moves_to_results() {
        let orchestrator = CombatOrchestrator::new(fast_config());
        // Empty defender roster: eliminated on the first tick.
        let rosters = Rosters {
            challenger: duel_rosters().challenger,
            defender: vec![],
        };
        orchestrator.start_combat("quick", &rosters).expect("start");

        let result = wait_for_result(&orchestrator, "quick")
            .await
            .expect("result");
        assert_eq!(result.match_id, "quick");
        assert!(!orchestrator.is_active("quick"));
        assert_eq!(orchestrator.statistics().stored_results, 1);
    }

    #[tokio::test]
    async fn test_result_store_is_bounded() {
        let mut config = fast_config();
        config.max_results = 1;
        let orchestrator = CombatOrchestrator::new(config);
        let rosters = Rosters {
            challenger: duel_rosters().challenger,
            defender: vec![],
        };

        orchestrator.start_combat("first", &rosters).expect("start");
        wait_for_result(&orchestrator, "first").await.expect("first");

        orchestrator.start_combat("second", &rosters).expect("start");
        wait_for_result(&orchestrator, "second").await.expect("second");

        assert_eq!(orchestrator.statistics().stored_results, 1);
        assert!(orchestrator.result("first").is_none());
        assert!(orchestrator.result("second").is_some());
    }

    #[tokio::test]
    async fn test_pause_keeps_match_active() {
        let orchestrator = CombatOrchestrator::new(fast_config());
        orchestrator.start_combat("m1", &duel_rosters()).expect("start");
        orchestrator.pause_combat("m1").expect("pause");

        assert!(orchestrator.is_active("m1"));
        let tick_at_pause = orchestrator.state("m1").map(|s| s.tick).expect("state");
        tokio::time::sleep(Duration::from_millis(50)).await;
        let tick_later = orchestrator.state("m1").map(|s| s.tick).expect("state");
        assert_eq!(tick_at_pause, tick_later);

        orchestrator.resume_combat("m1").expect("resume");
        orchestrator.stop_combat("m1").expect("stop");
    }

    #[tokio::test]
    async fn test_cleanup_stale_removes_paused_matches() {
        let orchestrator = CombatOrchestrator::new(fast_config());
        orchestrator.start_combat("m1", &duel_rosters()).expect("start");
        orchestrator.pause_combat("m1").expect("pause");
        tokio::time::sleep(Duration::from_millis(30)).await;

        let removed = orchestrator.cleanup_stale(Duration::from_millis(20));
        assert_eq!(removed, 1);
        assert!(!orchestrator.is_active("m1"));
    }

    #[tokio::test]
    async fn test_active_match_ids_lists_running() {
        let orchestrator = CombatOrchestrator::new(fast_config());
        orchestrator.start_combat("a", &duel_rosters()).expect("start");
        orchestrator.start_combat("b", &duel_rosters()).expect("start");

        let mut ids = orchestrator.active_match_ids();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);

        orchestrator.stop_combat("a").expect("stop");
        orchestrator.stop_combat("b").expect("stop");
    }
}
