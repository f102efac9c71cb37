//! Match state, event log, statistics, and the terminal result
//!
//! One [`MatchState`] per running match, owned exclusively by its engine and
//! mutated only inside the tick loop. External readers always get deep
//! clones, never references into live state.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::combat::unit::{Side, Unit};
use crate::hex::FracHex;

/// Match lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[default]
    Initializing,
    Running,
    Paused,
    Completed,
}

/// Why a match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Elimination,
    Timeout,
}

/// In-flight projectile
///
/// Reserved extension point: the list is always empty today and the update
/// step is a no-op. Kept so the snapshot shape is stable once projectiles
/// land.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub position: FracHex,
    pub ticks_remaining: u32,
}

/// Append-only log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatEvent {
    pub tick: u64,
    #[serde(flatten)]
    pub kind: CombatEventKind,
}

/// Event taxonomy
///
/// Serialized tag names are part of the transport contract; do not rename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CombatEventKind {
    DamageDealt {
        attacker_id: String,
        target_id: String,
        amount: i32,
        crit: bool,
        /// Ability id when the damage came from an ability, absent for basic attacks
        ability: Option<String>,
    },
    HealingDone {
        source_id: String,
        target_id: String,
        amount: i32,
        ability: Option<String>,
    },
    AbilityUsed {
        unit_id: String,
        ability: String,
        target_id: Option<String>,
    },
    BuffApplied {
        unit_id: String,
        name: String,
        source_id: String,
    },
    DebuffApplied {
        unit_id: String,
        name: String,
        source_id: String,
    },
    UnitDied {
        unit_id: String,
        killer_id: Option<String>,
    },
}

/// Per-side running totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SideTotals {
    pub damage_dealt: u64,
    pub healing_done: u64,
    pub abilities_used: u32,
    pub units_lost: u32,
}

/// Running statistics for one match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CombatStatistics {
    pub challenger: SideTotals,
    pub defender: SideTotals,
    pub duration_ticks: u64,
    pub total_events: u64,
}

impl CombatStatistics {
    pub fn side_mut(&mut self, side: Side) -> &mut SideTotals {
        match side {
            Side::Challenger => &mut self.challenger,
            Side::Defender => &mut self.defender,
        }
    }

    pub fn side(&self, side: Side) -> &SideTotals {
        match side {
            Side::Challenger => &self.challenger,
            Side::Defender => &self.defender,
        }
    }
}

/// Complete state of one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    pub match_id: String,
    /// Monotonic, starts at 0, +1 per tick with no gaps
    pub tick: u64,
    pub status: MatchStatus,
    /// Insertion order: all of the challenger roster, then the defender's.
    /// Update order follows list order; this tie-break is load-bearing.
    pub units: Vec<Unit>,
    pub projectiles: Vec<Projectile>,
    /// Rolling window of the most recent events, trimmed each tick
    pub events: Vec<CombatEvent>,
    pub statistics: CombatStatistics,
    pub started_at: Option<SystemTime>,
    pub ended_at: Option<SystemTime>,
}

impl MatchState {
    pub fn new(match_id: String) -> Self {
        Self {
            match_id,
            tick: 0,
            status: MatchStatus::Initializing,
            units: Vec::new(),
            projectiles: Vec::new(),
            events: Vec::new(),
            statistics: CombatStatistics::default(),
            started_at: None,
            ended_at: None,
        }
    }

    pub fn unit(&self, unit_id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == unit_id)
    }

    pub fn unit_mut(&mut self, unit_id: &str) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == unit_id)
    }

    pub fn alive_count(&self, side: Side) -> usize {
        self.units
            .iter()
            .filter(|u| u.side == side && u.is_alive())
            .count()
    }

    /// Record an event at the current tick
    pub fn record(&mut self, kind: CombatEventKind) {
        self.events.push(CombatEvent {
            tick: self.tick,
            kind,
        });
        self.statistics.total_events += 1;
    }

    /// Drop everything but the most recent `cap` events
    pub fn trim_events(&mut self, cap: usize) {
        if self.events.len() > cap {
            let excess = self.events.len() - cap;
            self.events.drain(..excess);
        }
    }
}

/// Terminal snapshot produced exactly once per match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatResult {
    pub match_id: String,
    /// `None` means a draw (simultaneous elimination)
    pub winner: Option<Side>,
    pub reason: EndReason,
    pub duration_ticks: u64,
    pub statistics: CombatStatistics,
    /// Event log as of the end of the match (already trimmed to the window)
    pub events: Vec<CombatEvent>,
    pub final_state: MatchState,
}
