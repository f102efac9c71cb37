//! Combat simulation: engine, resolver, AI, and match orchestration

pub mod ai;
pub mod catalog;
pub mod damage;
pub mod engine;
pub mod orchestrator;
pub mod state;
pub mod unit;

pub use catalog::{DefaultCatalog, StatSource};
pub use engine::{CombatEngine, Placement, Rosters};
pub use orchestrator::CombatOrchestrator;
pub use state::{CombatEvent, CombatEventKind, CombatResult, EndReason, MatchState, MatchStatus};
pub use unit::{Side, Unit};
