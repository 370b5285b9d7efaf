use crate::ai::config::EvaluationWeights;
use crate::ai::oracle::{LeafEvaluator, LeafScore};
use crate::battle::state::{opponent_of, BattleState, GameState};
use crate::errors::OracleResult;
use crate::player::Side;
use crate::pokemon::{Combatant, StatusCondition};
use async_trait::async_trait;

/// Value of a won or lost position in [`PositionEvaluator`] units.
pub const DECISIVE: f64 = 10_000.0;

/// Static material/status/tempo evaluation, unbounded, from one side's view.
#[derive(Debug, Clone, Default)]
pub struct PositionEvaluator {
    weights: EvaluationWeights,
}

impl PositionEvaluator {
    pub fn new(weights: EvaluationWeights) -> Self {
        Self { weights }
    }

    fn status_multiplier(&self, status: Option<StatusCondition>) -> f64 {
        match status {
            Some(StatusCondition::Sleep(_)) => self.weights.sleep_multiplier,
            Some(StatusCondition::Paralysis) => self.weights.paralysis_multiplier,
            Some(StatusCondition::Burn) => self.weights.burn_multiplier,
            Some(StatusCondition::Freeze) => self.weights.freeze_multiplier,
            Some(StatusCondition::Poison | StatusCondition::Toxic(_)) | None => 1.0,
        }
    }

    /// A standing combatant keeps `material_weight` of its worth at any HP;
    /// the rest scales with its HP fraction.
    pub fn combatant_value(&self, combatant: &Combatant) -> f64 {
        if combatant.is_fainted() {
            return 0.0;
        }
        let material = self
            .weights
            .material
            .get(&combatant.species)
            .copied()
            .unwrap_or(self.weights.default_material);
        let weight = self.weights.material_weight;
        let health = weight + (1.0 - weight) * combatant.hp_fraction();
        material * health * self.status_multiplier(combatant.status)
    }

    fn side_value(&self, side: &Side) -> f64 {
        side.roster.iter().map(|c| self.combatant_value(c)).sum()
    }

    fn sleepers(side: &Side) -> f64 {
        side.roster
            .iter()
            .filter(|c| !c.is_fainted() && matches!(c.status, Some(StatusCondition::Sleep(_))))
            .count() as f64
    }

    pub fn evaluate(&self, state: &BattleState, perspective: usize) -> f64 {
        match state.game_state {
            GameState::InProgress => {}
            GameState::Draw => return 0.0,
            _ if state.winner() == Some(perspective) => return DECISIVE,
            _ => return -DECISIVE,
        }
        let mine = &state.sides[perspective];
        let theirs = &state.sides[opponent_of(perspective)];
        let material = self.side_value(mine) - self.side_value(theirs);
        let tempo = self.weights.sleep_advantage * (Self::sleepers(theirs) - Self::sleepers(mine));
        material + tempo
    }
}

/// Cheap 1..=100 leaf score from the HP and roster differentials.
#[derive(Debug, Clone)]
pub struct HeuristicEvaluator {
    hp_weight: f64,
    roster_weight: f64,
}

impl Default for HeuristicEvaluator {
    fn default() -> Self {
        Self::new(&EvaluationWeights::default())
    }
}

impl HeuristicEvaluator {
    pub fn new(weights: &EvaluationWeights) -> Self {
        Self {
            hp_weight: weights.hp_weight,
            roster_weight: weights.roster_weight,
        }
    }

    fn hp_share(side: &Side) -> f64 {
        let max: u32 = side.roster.iter().map(|c| c.max_hp() as u32).sum();
        if max == 0 {
            return 0.0;
        }
        let current: u32 = side.roster.iter().map(|c| c.current_hp as u32).sum();
        current as f64 / max as f64
    }

    fn roster_share(side: &Side) -> f64 {
        if side.roster.is_empty() {
            return 0.0;
        }
        side.remaining() as f64 / side.roster.len() as f64
    }

    pub fn score_state(&self, state: &BattleState, perspective: usize) -> u8 {
        match state.game_state {
            GameState::InProgress => {}
            GameState::Draw => return 50,
            _ if state.winner() == Some(perspective) => return 100,
            _ => return 1,
        }
        let mine = &state.sides[perspective];
        let theirs = &state.sides[opponent_of(perspective)];
        let diff = self.hp_weight * (Self::hp_share(mine) - Self::hp_share(theirs))
            + self.roster_weight * (Self::roster_share(mine) - Self::roster_share(theirs));
        (50.0 + 49.0 * diff.clamp(-1.0, 1.0)).round() as u8
    }
}

#[async_trait]
impl LeafEvaluator for HeuristicEvaluator {
    async fn score(&self, state: &BattleState, perspective: usize) -> OracleResult<LeafScore> {
        Ok(LeafScore {
            score: self.score_state(state, perspective),
            justification: None,
        })
    }
}
