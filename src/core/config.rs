//! Simulation configuration with documented constants
//!
//! All tunable numbers are collected here with explanations of their purpose
//! and how they interact with each other.

/// Configuration for a single combat engine
///
/// These values have been tuned for readable, server-authoritative combat.
/// Changing them will affect match pacing and outcome variance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // === TIMING ===
    /// Simulation ticks per second
    ///
    /// The tick driver fires every `1000 / tick_rate` ms. Soft real-time:
    /// if a tick overruns its budget the next one is scheduled late, never
    /// bursted to catch up.
    pub tick_rate: u32,

    /// Maximum ticks before the match ends in a timeout
    ///
    /// At the default 60 Hz, 18,000 ticks is a 5 minute match.
    pub max_ticks: u64,

    // === EVENT LOG ===
    /// Number of recent events retained in the rolling log
    ///
    /// The log is a window, not full history. Consumers that need full
    /// history must persist events as they stream off the snapshot channel.
    pub event_log_cap: usize,

    // === DAMAGE RESOLUTION ===
    /// Chance of a critical hit on any damage roll
    pub crit_chance: f64,

    /// Damage multiplier applied on a critical hit
    pub crit_multiplier: f32,

    /// Uniform damage variance range, applied as a factor in
    /// [1 - variance, 1 + variance]
    pub damage_variance: f32,

    // === RANDOMNESS ===
    /// Seed for the per-match RNG stream
    ///
    /// `None` seeds from entropy. Fixing the seed makes a match reproducible
    /// on the same build (floating-point variance across platforms is
    /// accepted).
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            max_ticks: 18_000,
            event_log_cap: 60,
            crit_chance: 0.10,
            crit_multiplier: 1.5,
            damage_variance: 0.1,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick period derived from the tick rate
    pub fn tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_millis(1000 / self.tick_rate.max(1) as u64)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_rate == 0 {
            return Err("tick_rate must be positive".into());
        }
        if self.max_ticks == 0 {
            return Err("max_ticks must be positive".into());
        }
        if !(0.0..=1.0).contains(&self.crit_chance) {
            return Err(format!(
                "crit_chance ({}) must be within [0, 1]",
                self.crit_chance
            ));
        }
        if !(0.0..1.0).contains(&self.damage_variance) {
            return Err(format!(
                "damage_variance ({}) must be within [0, 1)",
                self.damage_variance
            ));
        }
        Ok(())
    }
}

/// Configuration for the combat orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum completed results retained (oldest evicted first)
    pub max_results: usize,

    /// Engine configuration applied to every match this orchestrator starts
    pub engine: EngineConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_results: 100,
            engine: EngineConfig::default(),
        }
    }
}
