//! Combat engine - one match's deterministic tick loop
//!
//! Each tick, strictly ordered: unit updates -> projectiles -> effect
//! durations -> DoT/HoT -> victory check -> log trim -> snapshot broadcast.
//!
//! The engine owns all mutation of its [`MatchState`]. The tick driver is a
//! single tokio task per match; ticks are synchronous, so there is no
//! internal concurrency to reason about. Nothing in the tick loop is allowed
//! to propagate an error past the tick boundary - a unit that cannot act
//! simply does nothing this tick.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::combat::ai;
use crate::combat::catalog::{DefaultCatalog, StatSource};
use crate::combat::damage::{
    apply_damage, apply_damage_over_time, apply_healing, apply_healing_over_time,
    calculate_damage, heal_recipient, should_use_ability,
};
use crate::combat::state::{
    CombatEventKind, CombatResult, EndReason, MatchState, MatchStatus,
};
use crate::combat::unit::{Ability, AbilityKind, Side, StatusEffect, Unit};
use crate::core::config::EngineConfig;
use crate::core::error::{CombatError, Result};
use crate::hex::HexCoord;

/// One creature placement in a roster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub creature_id: String,
    pub position: HexCoord,
}

/// Deployment data for both sides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rosters {
    pub challenger: Vec<Placement>,
    pub defender: Vec<Placement>,
}

/// Snapshot capacity of the per-match broadcast channel; slow subscribers
/// lag rather than backpressure the tick loop.
const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Ticks never panic mid-mutation; recover the guard rather than poison
    // the whole match.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs exactly one match
pub struct CombatEngine {
    match_id: String,
    config: EngineConfig,
    state: Arc<Mutex<MatchState>>,
    rng: Arc<Mutex<ChaCha8Rng>>,
    update_tx: broadcast::Sender<MatchState>,
    completion_tx: Arc<watch::Sender<Option<CombatResult>>>,
    completion_rx: watch::Receiver<Option<CombatResult>>,
    driver: Option<JoinHandle<()>>,
}

impl CombatEngine {
    /// Build a match from deployment data using the default creature catalog
    pub fn initialize(match_id: impl Into<String>, rosters: &Rosters, config: EngineConfig) -> Self {
        Self::initialize_with(match_id, rosters, config, &DefaultCatalog)
    }

    /// Build a match with an explicit stat source
    ///
    /// Each placement is independently fallible: a bad entry is logged and
    /// skipped so the rest of the match still starts.
    pub fn initialize_with(
        match_id: impl Into<String>,
        rosters: &Rosters,
        config: EngineConfig,
        catalog: &dyn StatSource,
    ) -> Self {
        let match_id = match_id.into();
        let mut state = MatchState::new(match_id.clone());

        let sides = [
            (Side::Challenger, &rosters.challenger),
            (Side::Defender, &rosters.defender),
        ];
        for (side, placements) in sides {
            for (ordinal, placement) in placements.iter().enumerate() {
                match build_unit(catalog, side, ordinal, placement) {
                    Ok(unit) => state.units.push(unit),
                    Err(e) => {
                        warn!(
                            match_id = %match_id,
                            side = ?side,
                            ordinal,
                            error = %e,
                            "skipping invalid placement"
                        );
                    }
                }
            }
        }

        debug!(
            match_id = %match_id,
            challenger = state.alive_count(Side::Challenger),
            defender = state.alive_count(Side::Defender),
            "match initialized"
        );

        let seed = config.seed.unwrap_or_else(rand::random);
        let (update_tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        let (completion_tx, completion_rx) = watch::channel(None);

        Self {
            match_id,
            config,
            state: Arc::new(Mutex::new(state)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            update_tx,
            completion_tx: Arc::new(completion_tx),
            completion_rx,
            driver: None,
        }
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Begin (or resume) driving ticks at the configured rate
    pub fn start(&mut self) -> Result<()> {
        if self.driver.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(CombatError::AlreadyRunning(self.match_id.clone()));
        }

        {
            let mut st = lock(&self.state);
            if st.status == MatchStatus::Completed {
                return Err(CombatError::MatchCompleted(self.match_id.clone()));
            }
            st.status = MatchStatus::Running;
            if st.started_at.is_none() {
                st.started_at = Some(SystemTime::now());
            }
        }

        info!(match_id = %self.match_id, tick_rate = self.config.tick_rate, "match started");

        let state = Arc::clone(&self.state);
        let rng = Arc::clone(&self.rng);
        let update_tx = self.update_tx.clone();
        let completion_tx = Arc::clone(&self.completion_tx);
        let config = self.config.clone();
        let period = config.tick_period();

        self.driver = Some(tokio::spawn(async move {
            enum Step {
                Halted,
                Snapshot(Box<MatchState>),
                Done(Box<CombatResult>),
            }

            let mut interval = tokio::time::interval(period);
            // Late ticks stay late; never burst to catch up.
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval tick fires immediately; consume it so tick 1
            // lands a full period after start.
            interval.tick().await;

            loop {
                interval.tick().await;

                let step = {
                    let mut st = lock(&state);
                    if st.status != MatchStatus::Running {
                        Step::Halted
                    } else {
                        let mut rng = lock(&rng);
                        match run_tick(&mut st, &config, &mut *rng) {
                            Some(result) => Step::Done(Box::new(result)),
                            None => Step::Snapshot(Box::new(st.clone())),
                        }
                    }
                };

                match step {
                    Step::Halted => break,
                    Step::Snapshot(snapshot) => {
                        // No subscribers is fine; snapshots are best-effort.
                        let _ = update_tx.send(*snapshot);
                    }
                    Step::Done(result) => {
                        info!(
                            match_id = %result.match_id,
                            winner = ?result.winner,
                            reason = ?result.reason,
                            ticks = result.duration_ticks,
                            "match complete"
                        );
                        completion_tx.send_if_modified(|slot| {
                            if slot.is_none() {
                                *slot = Some(*result);
                                true
                            } else {
                                false
                            }
                        });
                        break;
                    }
                }
            }
        }));

        Ok(())
    }

    /// Halt the driver and mark the match completed. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.driver.take() {
            handle.abort();
        }
        let mut st = lock(&self.state);
        if st.status != MatchStatus::Completed {
            st.status = MatchStatus::Completed;
            st.ended_at = Some(SystemTime::now());
            info!(match_id = %self.match_id, tick = st.tick, "match stopped");
        }
    }

    /// Halt the driver, preserving all state for a later `start()`
    ///
    /// Cooldowns and effect timers are not adjusted for wall-clock time
    /// spent paused; resuming continues from the same tick count.
    pub fn pause(&mut self) {
        if let Some(handle) = self.driver.take() {
            handle.abort();
        }
        let mut st = lock(&self.state);
        if st.status == MatchStatus::Running {
            st.status = MatchStatus::Paused;
            info!(match_id = %self.match_id, tick = st.tick, "match paused");
        }
    }

    /// Defensive copy of the current state; safe from any thread
    pub fn state(&self) -> MatchState {
        lock(&self.state).clone()
    }

    /// Subscribe to per-tick snapshots (multiple consumers supported)
    pub fn subscribe(&self) -> broadcast::Receiver<MatchState> {
        self.update_tx.subscribe()
    }

    /// Watch for the terminal result (set exactly once)
    pub fn completion(&self) -> watch::Receiver<Option<CombatResult>> {
        self.completion_rx.clone()
    }

    /// Result if the match has ended naturally
    pub fn result(&self) -> Option<CombatResult> {
        self.completion_rx.borrow().clone()
    }
}

impl Drop for CombatEngine {
    fn drop(&mut self) {
        if let Some(handle) = self.driver.take() {
            handle.abort();
        }
    }
}

fn build_unit(
    catalog: &dyn StatSource,
    side: Side,
    ordinal: usize,
    placement: &Placement,
) -> Result<Unit> {
    let creature_id = placement.creature_id.trim();
    if creature_id.is_empty() {
        return Err(CombatError::InvalidPlacement("empty creature id".into()));
    }

    let stats = catalog.stats_for(creature_id);
    if stats.max_health <= 0 || stats.attack_speed <= 0.0 {
        return Err(CombatError::InvalidPlacement(format!(
            "unusable stat block for creature '{}'",
            creature_id
        )));
    }

    let abilities = catalog.abilities_for(creature_id);
    let id = format!("{}_{}_{}", side.label(), creature_id, ordinal);
    Ok(Unit::new(
        id,
        creature_id.to_string(),
        side,
        placement.position,
        stats,
        abilities,
    ))
}

/// Ticks between basic attacks for a given attack speed
fn attack_cooldown_ticks(tick_rate: u32, attack_speed: f32) -> u32 {
    (tick_rate as f32 / attack_speed).floor() as u32
}

/// Advance the match by one tick. Returns the result when this tick ended
/// the match.
pub fn run_tick(
    state: &mut MatchState,
    config: &EngineConfig,
    rng: &mut ChaCha8Rng,
) -> Option<CombatResult> {
    state.tick += 1;

    // Unit updates in list order (challenger roster first, then defender).
    for idx in 0..state.units.len() {
        if state.units[idx].is_alive() {
            update_unit(state, idx, config, rng);
        }
    }

    let _removed = update_projectiles(state);

    // Effect durations tick down on every unit, dead or alive.
    for unit in &mut state.units {
        for effect in unit.buffs.iter_mut().chain(unit.debuffs.iter_mut()) {
            effect.duration_remaining -= 1;
        }
        unit.buffs.retain(|e| e.duration_remaining > 0);
        unit.debuffs.retain(|e| e.duration_remaining > 0);
    }

    // One DoT tick, then one HoT tick, per living unit.
    for idx in 0..state.units.len() {
        if !state.units[idx].is_alive() {
            continue;
        }
        apply_over_time(state, idx);
    }

    let challenger_alive = state.alive_count(Side::Challenger);
    let defender_alive = state.alive_count(Side::Defender);

    if challenger_alive == 0 || defender_alive == 0 {
        let winner = match (challenger_alive, defender_alive) {
            (0, 0) => None,
            (0, _) => Some(Side::Defender),
            _ => Some(Side::Challenger),
        };
        return Some(finish(state, config, winner, EndReason::Elimination));
    }

    if state.tick >= config.max_ticks {
        // Alive-count tie goes to the defender; a timeout never draws.
        let winner = if challenger_alive > defender_alive {
            Some(Side::Challenger)
        } else {
            Some(Side::Defender)
        };
        return Some(finish(state, config, winner, EndReason::Timeout));
    }

    state.statistics.duration_ticks = state.tick;
    state.trim_events(config.event_log_cap);
    None
}

fn finish(
    state: &mut MatchState,
    config: &EngineConfig,
    winner: Option<Side>,
    reason: EndReason,
) -> CombatResult {
    state.statistics.duration_ticks = state.tick;
    state.trim_events(config.event_log_cap);
    state.status = MatchStatus::Completed;
    state.ended_at = Some(SystemTime::now());

    CombatResult {
        match_id: state.match_id.clone(),
        winner,
        reason,
        duration_ticks: state.tick,
        statistics: state.statistics,
        events: state.events.clone(),
        final_state: state.clone(),
    }
}

/// Placeholder for the future projectile rework; always reports nothing
/// to remove.
fn update_projectiles(state: &mut MatchState) -> Vec<String> {
    let _ = &state.projectiles;
    Vec::new()
}

/// One unit's action for this tick: re-target, then attack, cast, or move.
fn update_unit(state: &mut MatchState, idx: usize, config: &EngineConfig, rng: &mut ChaCha8Rng) {
    // Re-resolve the target id; it is a weak reference that goes stale the
    // moment the target dies.
    let actor_snapshot = state.units[idx].clone();
    let target_id = actor_snapshot
        .current_target
        .as_deref()
        .and_then(|id| state.unit(id))
        .filter(|t| t.is_alive())
        .map(|t| t.id.clone())
        .or_else(|| {
            ai::find_closest_enemy(&actor_snapshot, &state.units).map(|t| t.id.clone())
        });

    let Some(target_id) = target_id else {
        // No living enemies; idle this tick.
        state.units[idx].current_target = None;
        return;
    };
    state.units[idx].current_target = Some(target_id.clone());

    let actor = state.units[idx].clone();
    let Some(target) = state.unit(&target_id).cloned() else {
        return;
    };

    if ai::in_attack_range(&actor, &target) {
        if actor.attack_cooldown == 0 {
            let breakdown = calculate_damage(&actor, &target, None, None, config, rng);
            deal_damage(state, &actor.id, actor.side, &target_id, breakdown.final_damage, breakdown.crit, None);
            state.units[idx].attack_cooldown =
                attack_cooldown_ticks(config.tick_rate, actor.stats.attack_speed);
        } else {
            state.units[idx].attack_cooldown -= 1;
        }
        state.units[idx].facing = ai::facing_degrees(actor.position, target.position);

        update_abilities(state, idx, &target_id, config, rng);
    } else {
        // Close the distance: one hex per tick at most, fractional when the
        // movement budget does not cover a whole hex.
        let budget = actor.stats.movement_speed / config.tick_rate as f32;
        let next = ai::next_step_toward(actor.hex(), target.hex());
        let unit = &mut state.units[idx];
        if budget >= 1.0 {
            unit.position = next.into();
        } else {
            unit.position = unit.position.lerp(&next.into(), budget);
        }

        // Cooldowns still tick down while moving.
        if unit.attack_cooldown > 0 {
            unit.attack_cooldown -= 1;
        }
        for ability in &mut unit.abilities {
            if ability.cooldown_remaining > 0 {
                ability.cooldown_remaining -= 1;
            }
        }
    }
}

/// Evaluate every ability: ready ones fire when their condition holds,
/// the rest tick toward ready.
fn update_abilities(
    state: &mut MatchState,
    idx: usize,
    target_id: &str,
    config: &EngineConfig,
    rng: &mut ChaCha8Rng,
) {
    for ability_idx in 0..state.units[idx].abilities.len() {
        if state.units[idx].abilities[ability_idx].cooldown_remaining > 0 {
            state.units[idx].abilities[ability_idx].cooldown_remaining -= 1;
            continue;
        }

        let actor = state.units[idx].clone();
        let ability = actor.abilities[ability_idx].clone();
        let target = state.unit(target_id).cloned();

        if !should_use_ability(&actor, &ability, target.as_ref(), &state.units) {
            continue;
        }

        execute_ability(state, &actor, &ability, target.as_ref(), config, rng);
        state.units[idx].abilities[ability_idx].cooldown_remaining = ability.cooldown_total;
    }
}

fn execute_ability(
    state: &mut MatchState,
    actor: &Unit,
    ability: &Ability,
    target: Option<&Unit>,
    config: &EngineConfig,
    rng: &mut ChaCha8Rng,
) {
    state.statistics.side_mut(actor.side).abilities_used += 1;

    match ability.kind {
        AbilityKind::SingleTarget => {
            let Some(target) = target else { return };
            state.record(CombatEventKind::AbilityUsed {
                unit_id: actor.id.clone(),
                ability: ability.id.clone(),
                target_id: Some(target.id.clone()),
            });
            let breakdown = calculate_damage(actor, target, ability.damage, None, config, rng);
            deal_damage(
                state,
                &actor.id,
                actor.side,
                &target.id.clone(),
                breakdown.final_damage,
                breakdown.crit,
                Some(ability.id.clone()),
            );
        }
        AbilityKind::Aoe => {
            state.record(CombatEventKind::AbilityUsed {
                unit_id: actor.id.clone(),
                ability: ability.id.clone(),
                target_id: None,
            });
            let radius = ability.radius.unwrap_or(0);
            let victims: Vec<Unit> = ai::units_in_radius(
                actor.hex(),
                radius,
                &state.units,
                Some(actor.side.opponent()),
            )
            .into_iter()
            .cloned()
            .collect();
            for victim in victims {
                let breakdown =
                    calculate_damage(actor, &victim, ability.damage, None, config, rng);
                deal_damage(
                    state,
                    &actor.id,
                    actor.side,
                    &victim.id,
                    breakdown.final_damage,
                    breakdown.crit,
                    Some(ability.id.clone()),
                );
            }
        }
        AbilityKind::Heal => {
            let Some(recipient_id) = heal_recipient(actor, ability, &state.units)
                .map(|u| u.id.clone())
            else {
                return;
            };
            state.record(CombatEventKind::AbilityUsed {
                unit_id: actor.id.clone(),
                ability: ability.id.clone(),
                target_id: Some(recipient_id.clone()),
            });
            let amount = ability.heal.unwrap_or(0);
            let healed = state
                .unit_mut(&recipient_id)
                .map(|u| apply_healing(u, amount))
                .unwrap_or(0);
            if healed > 0 {
                state.record(CombatEventKind::HealingDone {
                    source_id: actor.id.clone(),
                    target_id: recipient_id,
                    amount: healed,
                    ability: Some(ability.id.clone()),
                });
                state.statistics.side_mut(actor.side).healing_done += healed as u64;
            }
        }
        AbilityKind::Buff => {
            let Some(spec) = &ability.effect else { return };
            state.record(CombatEventKind::AbilityUsed {
                unit_id: actor.id.clone(),
                ability: ability.id.clone(),
                target_id: Some(actor.id.clone()),
            });
            let effect = StatusEffect::from_spec(spec, &actor.id, state.tick);
            let name = effect.name.clone();
            if let Some(unit) = state.unit_mut(&actor.id) {
                unit.buffs.push(effect);
            }
            state.record(CombatEventKind::BuffApplied {
                unit_id: actor.id.clone(),
                name,
                source_id: actor.id.clone(),
            });
        }
        AbilityKind::Debuff => {
            let Some(target) = target else { return };
            let Some(spec) = &ability.effect else { return };
            state.record(CombatEventKind::AbilityUsed {
                unit_id: actor.id.clone(),
                ability: ability.id.clone(),
                target_id: Some(target.id.clone()),
            });
            let effect = StatusEffect::from_spec(spec, &actor.id, state.tick);
            let name = effect.name.clone();
            if let Some(unit) = state.unit_mut(&target.id) {
                unit.debuffs.push(effect);
            }
            state.record(CombatEventKind::DebuffApplied {
                unit_id: target.id.clone(),
                name,
                source_id: actor.id.clone(),
            });
        }
    }
}

/// Apply damage to a unit by id, recording the event, statistics, and any
/// resulting death.
fn deal_damage(
    state: &mut MatchState,
    attacker_id: &str,
    attacker_side: Side,
    target_id: &str,
    amount: i32,
    crit: bool,
    ability: Option<String>,
) {
    let Some(died) = state.unit_mut(target_id).map(|u| apply_damage(u, amount)) else {
        return;
    };

    state.record(CombatEventKind::DamageDealt {
        attacker_id: attacker_id.to_string(),
        target_id: target_id.to_string(),
        amount,
        crit,
        ability,
    });
    state.statistics.side_mut(attacker_side).damage_dealt += amount as u64;

    if died {
        finalize_death(state, target_id, Some(attacker_id.to_string()));
    }
}

fn finalize_death(state: &mut MatchState, unit_id: &str, killer_id: Option<String>) {
    let Some(side) = state.unit(unit_id).map(|u| u.side) else {
        return;
    };
    debug!(match_id = %state.match_id, unit_id, tick = state.tick, "unit died");
    state.record(CombatEventKind::UnitDied {
        unit_id: unit_id.to_string(),
        killer_id,
    });
    state.statistics.side_mut(side).units_lost += 1;
}

/// One tick of DoT then HoT for the unit at `idx`, with events and
/// statistics for each non-zero application.
fn apply_over_time(state: &mut MatchState, idx: usize) {
    let unit_id = state.units[idx].id.clone();
    let unit_side = state.units[idx].side;

    let dot_source = state.units[idx]
        .debuffs
        .iter()
        .find(|e| e.payload.damage_per_tick > 0)
        .map(|e| e.source_id.clone());
    let (dot, died) = apply_damage_over_time(&mut state.units[idx]);
    if dot > 0 {
        let source_side = dot_source
            .as_deref()
            .and_then(|id| state.unit(id))
            .map(|u| u.side)
            .unwrap_or(unit_side.opponent());
        state.record(CombatEventKind::DamageDealt {
            attacker_id: dot_source.clone().unwrap_or_default(),
            target_id: unit_id.clone(),
            amount: dot,
            crit: false,
            ability: None,
        });
        state.statistics.side_mut(source_side).damage_dealt += dot as u64;
    }
    if died {
        finalize_death(state, &unit_id, dot_source);
        return;
    }

    let hot_source = state.units[idx]
        .buffs
        .iter()
        .find(|e| e.payload.heal_per_tick > 0)
        .map(|e| e.source_id.clone());
    let healed = apply_healing_over_time(&mut state.units[idx]);
    if healed > 0 {
        state.record(CombatEventKind::HealingDone {
            source_id: hot_source.unwrap_or_else(|| unit_id.clone()),
            target_id: unit_id,
            amount: healed,
            ability: None,
        });
        state.statistics.side_mut(unit_side).healing_done += healed as u64;
    }
}
