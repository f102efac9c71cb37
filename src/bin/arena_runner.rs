//! Headless Arena Runner
//!
//! Runs one match tick-by-tick without the real-time driver and prints a
//! JSON or text summary. Useful for balance sweeps and deterministic replays.

use clap::Parser;
use hexarena::combat::engine::{run_tick, CombatEngine, Placement, Rosters};
use hexarena::combat::state::{CombatEventKind, MatchStatus};
use hexarena::combat::unit::Side;
use hexarena::core::config::EngineConfig;
use hexarena::core::error::Result;
use hexarena::hex::HexCoord;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Headless Arena Runner - deterministic matches for balance testing
#[derive(Parser, Debug)]
#[command(name = "arena_runner")]
#[command(about = "Run a headless match and output the result")]
struct Args {
    /// Challenger roster: comma-separated creature ids
    #[arg(long, default_value = "warrior,archer,cleric")]
    challenger: String,

    /// Defender roster: comma-separated creature ids
    #[arg(long, default_value = "guardian,mage,archer")]
    defender: String,

    /// Starting distance between the front rows, in hexes
    #[arg(long, default_value_t = 10)]
    separation: i32,

    /// Simulation tick rate in Hz
    #[arg(long, default_value_t = 60)]
    tick_rate: u32,

    /// Maximum ticks before timeout
    #[arg(long, default_value_t = 18_000)]
    max_ticks: u64,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Print every combat event to stderr as it happens
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// JSON output structure
#[derive(Serialize)]
struct RunnerResult {
    match_id: String,
    winner: Option<String>,
    reason: String,
    ticks: u64,
    challenger_damage: u64,
    defender_damage: u64,
    challenger_losses: u32,
    defender_losses: u32,
    total_events: u64,
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    let config = EngineConfig {
        tick_rate: args.tick_rate,
        max_ticks: args.max_ticks,
        seed: Some(seed),
        ..Default::default()
    };
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(2);
    }

    let rosters = Rosters {
        challenger: build_side(&args.challenger, 0),
        defender: build_side(&args.defender, args.separation),
    };

    let match_id = format!("arena_{}", uuid::Uuid::new_v4());
    let engine = CombatEngine::initialize(match_id.clone(), &rosters, config.clone());
    let mut state = engine.state();
    state.status = MatchStatus::Running;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    // Drive ticks as fast as the CPU allows; no interval, no tokio.
    let result = loop {
        let outcome = run_tick(&mut state, &config, &mut rng);

        if args.verbose {
            let events = match &outcome {
                Some(r) => &r.final_state.events,
                None => &state.events,
            };
            // The log window is trimmed every tick, so select by tick number
            // instead of list position.
            for event in events.iter().filter(|e| e.tick == state.tick) {
                eprintln!("[{}] {}", event.tick, describe(&event.kind));
            }
        }

        if let Some(result) = outcome {
            break result;
        }
    };

    let summary = RunnerResult {
        match_id,
        winner: result.winner.map(|s| s.label().to_string()),
        reason: format!("{:?}", result.reason).to_lowercase(),
        ticks: result.duration_ticks,
        challenger_damage: result.statistics.side(Side::Challenger).damage_dealt,
        defender_damage: result.statistics.side(Side::Defender).damage_dealt,
        challenger_losses: result.statistics.side(Side::Challenger).units_lost,
        defender_losses: result.statistics.side(Side::Defender).units_lost,
        total_events: result.statistics.total_events,
        seed,
    };

    match args.format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        "text" => {
            println!("Match Result");
            println!("============");
            println!("Winner: {}", summary.winner.as_deref().unwrap_or("draw"));
            println!("Reason: {}", summary.reason);
            println!("Ticks: {}", summary.ticks);
            println!(
                "Damage: challenger {} / defender {}",
                summary.challenger_damage, summary.defender_damage
            );
            println!(
                "Losses: challenger {} / defender {}",
                summary.challenger_losses, summary.defender_losses
            );
            println!("Seed: {}", summary.seed);
        }
        _ => {
            eprintln!("Unknown format '{}', defaulting to json", args.format);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

/// One placement per creature id, stacked in a vertical line at column `q`
fn build_side(spec: &str, q: i32) -> Vec<Placement> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(row, creature_id)| Placement {
            creature_id: creature_id.to_string(),
            position: HexCoord::new(q, row as i32),
        })
        .collect()
}

fn describe(kind: &CombatEventKind) -> String {
    match kind {
        CombatEventKind::DamageDealt {
            attacker_id,
            target_id,
            amount,
            crit,
            ..
        } => format!(
            "{} hit {} for {}{}",
            attacker_id,
            target_id,
            amount,
            if *crit { " (crit)" } else { "" }
        ),
        CombatEventKind::HealingDone {
            source_id,
            target_id,
            amount,
            ..
        } => format!("{} healed {} for {}", source_id, target_id, amount),
        CombatEventKind::AbilityUsed {
            unit_id, ability, ..
        } => format!("{} used {}", unit_id, ability),
        CombatEventKind::BuffApplied { unit_id, name, .. } => {
            format!("{} gained {}", unit_id, name)
        }
        CombatEventKind::DebuffApplied { unit_id, name, .. } => {
            format!("{} afflicted by {}", unit_id, name)
        }
        CombatEventKind::UnitDied { unit_id, .. } => format!("{} died", unit_id),
    }
}
