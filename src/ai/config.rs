use crate::errors::{EngineError, EngineResult};
use schema::SpeciesId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

const BUNDLED_AGENT: &str = include_str!("../../data/agent.ron");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Strategy {
    /// Single ply, exact hit/crit/miss weighting.
    Expectimax,
    /// Depth-bounded tree with pruned candidate sets.
    #[default]
    Minimax,
}

/// Weights of the static position evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationWeights {
    /// Material value of species missing from `material`.
    pub default_material: f64,
    pub material: HashMap<SpeciesId, f64>,
    pub material_weight: f64,
    /// Flat bonus per sleeping foe minus sleeping ally.
    pub sleep_advantage: f64,
    pub sleep_multiplier: f64,
    pub paralysis_multiplier: f64,
    pub burn_multiplier: f64,
    pub freeze_multiplier: f64,
    /// Heuristic leaf score blend of HP share and roster share.
    pub hp_weight: f64,
    pub roster_weight: f64,
}

impl Default for EvaluationWeights {
    fn default() -> Self {
        Self {
            default_material: 140.0,
            material: HashMap::new(),
            material_weight: 0.5,
            sleep_advantage: 40.0,
            sleep_multiplier: 0.3,
            paralysis_multiplier: 0.85,
            burn_multiplier: 0.7,
            freeze_multiplier: 0.1,
            hp_weight: 0.6,
            roster_weight: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub strategy: Strategy,
    /// Tree depth `K` in turns.
    pub depth: u8,
    pub player_candidates: usize,
    /// How many externally proposed actions may join the player's candidates.
    pub proposed_candidates: usize,
    pub opponent_candidates: usize,
    pub predicted_candidates: usize,
    /// Inferred moves added to an opponent's known set.
    pub inferred_move_cap: usize,
    pub speed_coefficient: f64,
    pub hp_coefficient: f64,
    pub early_exit: bool,
    pub turn_deadline_ms: u64,
    pub oracle_timeout_ms: u64,
    pub switch_penalty: f64,
    /// Used instead of `switch_penalty` when the incoming combatant would not
    /// survive the foe's strongest hit.
    pub unsafe_switch_penalty: f64,
    pub evaluation: EvaluationWeights,
    pub log_capacity: usize,
    /// Seed for the random fallback tier. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Minimax,
            depth: 2,
            player_candidates: 2,
            proposed_candidates: 2,
            opponent_candidates: 2,
            predicted_candidates: 1,
            inferred_move_cap: 4,
            speed_coefficient: 0.1,
            hp_coefficient: 0.4,
            early_exit: true,
            turn_deadline_ms: 30_000,
            oracle_timeout_ms: 5_000,
            switch_penalty: 30.0,
            unsafe_switch_penalty: 150.0,
            evaluation: EvaluationWeights::default(),
            log_capacity: 64,
            seed: None,
        }
    }
}

impl AgentConfig {
    pub fn from_ron(text: &str) -> EngineResult<Self> {
        ron::from_str(text).map_err(|err| EngineError::Config(format!("agent config: {}", err)))
    }

    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| EngineError::Config(format!("{}: {}", path.display(), err)))?;
        Self::from_ron(&text)
    }

    /// The tuning shipped in `data/agent.ron`.
    pub fn bundled() -> EngineResult<Self> {
        Self::from_ron(BUNDLED_AGENT)
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn turn_deadline(&self) -> Duration {
        Duration::from_millis(self.turn_deadline_ms)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }
}
