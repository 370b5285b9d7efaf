//! Pokemon Tactician
//!
//! A deterministic battle simulator and the decision core built on it: a
//! damage calculator over swappable type charts, a turn-resolution state
//! machine, matchup heuristics, opponent prediction, and two search
//! strategies (single-ply expectimax and depth-bounded minimax) behind a
//! fallback-chain policy.

pub mod ai;
pub mod battle;
pub mod dex;
pub mod errors;
pub mod player;
pub mod pokemon;

// --- PUBLIC API RE-EXPORTS ---

pub use schema::{
    BaseStats, MoveCategory, MoveData, MoveId, MoveTarget, PokemonType, SpeciesData, SpeciesId,
    StatType, StatusKind, Weather,
};

pub use ai::{Agent, AgentConfig, Decision, DecisionTier, Strategy};
pub use battle::engine::{resolve_replacements, resolve_turn, simulate_turn, HitOutcome, Resolution};
pub use battle::ruleset::Ruleset;
pub use battle::state::{BattleEvent, BattleState, GameState, TurnRng};
pub use battle::BattleContext;
pub use dex::Dex;
pub use player::{Action, ChosenAction, Side};
pub use pokemon::{Combatant, StatusCondition};

pub use errors::{
    DexError, DexResult, EngineError, EngineResult, OracleError, OracleResult, SimulationError,
    SimulationResult,
};
