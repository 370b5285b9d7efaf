//! Opponent modelling: what the foe probably carries and what it will
//! probably do this turn.

use crate::ai::config::AgentConfig;
use crate::ai::matchup::{best_reply, best_switch_in};
use crate::ai::oracle::with_timeout;
use crate::ai::push_unique;
use crate::battle::state::{opponent_of, BattleState};
use crate::battle::BattleContext;
use crate::errors::OracleResult;
use crate::player::Action;
use async_trait::async_trait;
use schema::{MoveId, SpeciesId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// A ranked move guess. Confidence 1.0 marks a move already seen in use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveCandidate {
    pub id: MoveId,
    pub confidence: f64,
}

impl MoveCandidate {
    pub fn new(id: &str, confidence: f64) -> Self {
        Self {
            id: MoveId::new(id),
            confidence,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.confidence >= 1.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub species: SpeciesId,
    pub teammates: Vec<SpeciesId>,
    pub confirmed: Vec<MoveId>,
}

impl PredictionRequest {
    /// Request for the active combatant of `side`, listing only revealed teammates.
    pub fn for_active(state: &BattleState, side: usize) -> Option<Self> {
        let player = &state.sides[side];
        let active = player.active_standing()?;
        Some(Self {
            species: active.species.clone(),
            teammates: player
                .roster
                .iter()
                .enumerate()
                .filter(|(slot, c)| *slot != player.active && c.revealed)
                .map(|(_, c)| c.species.clone())
                .collect(),
            confirmed: active
                .moves
                .iter()
                .filter(|known| known.confirmed)
                .map(|known| known.id.clone())
                .collect(),
        })
    }
}

#[async_trait]
pub trait MovePredictor: Send + Sync {
    /// Ranked candidates, most likely first.
    async fn predict(&self, request: &PredictionRequest) -> OracleResult<Vec<MoveCandidate>>;
}

/// Predicts nothing; candidate generation falls back to confirmed moves.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPredictor;

#[async_trait]
impl MovePredictor for NoPredictor {
    async fn predict(&self, _request: &PredictionRequest) -> OracleResult<Vec<MoveCandidate>> {
        Ok(Vec::new())
    }
}

/// Fixed per-species movepool guesses.
#[derive(Debug, Clone, Default)]
pub struct StaticPredictor {
    movepools: HashMap<SpeciesId, Vec<MoveCandidate>>,
}

impl StaticPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_movepool(mut self, species: &str, candidates: Vec<MoveCandidate>) -> Self {
        self.movepools.insert(SpeciesId::new(species), candidates);
        self
    }
}

#[async_trait]
impl MovePredictor for StaticPredictor {
    async fn predict(&self, request: &PredictionRequest) -> OracleResult<Vec<MoveCandidate>> {
        Ok(self
            .movepools
            .get(&request.species)
            .cloned()
            .unwrap_or_default())
    }
}

/// Asks the predictor about the opponent's active combatant and records up
/// to `inferred_move_cap` new moves on it. Unknown ids and failures are
/// dropped. Returns the usable candidates in ranked order.
pub async fn enrich_opponent(
    ctx: &BattleContext,
    config: &AgentConfig,
    predictor: &dyn MovePredictor,
    state: &mut BattleState,
    opponent: usize,
    timeout: Duration,
) -> Vec<MoveCandidate> {
    let Some(request) = PredictionRequest::for_active(state, opponent) else {
        return Vec::new();
    };

    let candidates = match with_timeout(timeout, predictor.predict(&request)).await {
        Ok(candidates) => candidates,
        Err(err) => {
            warn!(%err, species = %request.species, "move prediction failed");
            return Vec::new();
        }
    };

    let usable: Vec<MoveCandidate> = candidates
        .into_iter()
        .filter(|candidate| {
            let known = ctx.dex.has_move(&candidate.id);
            if !known {
                debug!(id = %candidate.id, "predictor suggested an unknown move");
            }
            known
        })
        .collect();

    let Some(active) = state.sides[opponent].active_mut() else {
        return usable;
    };
    let mut added = 0;
    for candidate in &usable {
        if added >= config.inferred_move_cap {
            break;
        }
        if active.add_inferred_move(candidate.id.clone()) {
            if candidate.is_confirmed() {
                if let Some(known) = active.moves.last_mut() {
                    known.confirmed = true;
                }
            }
            added += 1;
        }
    }
    debug!(added, species = %request.species, "opponent moves inferred");
    usable
}

/// Plausible actions for `side`: its best damaging reply, its best switch-in
/// and the top predicted move, deduplicated and capped. A fainted active
/// leaves switches only.
pub fn opponent_candidates(
    ctx: &BattleContext,
    config: &AgentConfig,
    state: &BattleState,
    side: usize,
    predicted: &[MoveCandidate],
) -> Vec<Action> {
    let player = &state.sides[side];
    let foe = state.sides[opponent_of(side)].active_standing();
    let mut actions = Vec::new();

    if player.active_is_fainted() {
        if let Some(slot) = foe.and_then(|foe| best_switch_in(ctx, config, player, foe)) {
            push_unique(&mut actions, Action::switch_to(slot));
        }
        for slot in player.switch_options() {
            push_unique(&mut actions, Action::switch_to(slot));
        }
        actions.truncate(config.opponent_candidates);
        return actions;
    }

    if let Some(choice) = best_reply(ctx, state, side) {
        push_unique(&mut actions, choice.action());
    }
    if let Some(slot) = foe.and_then(|foe| best_switch_in(ctx, config, player, foe)) {
        push_unique(&mut actions, Action::switch_to(slot));
    }
    let legal_predictions = predicted
        .iter()
        .map(|candidate| Action::UseMove {
            id: candidate.id.clone(),
            target: None,
        })
        .filter(|action| player.is_legal(action))
        .take(config.predicted_candidates);
    for action in legal_predictions {
        push_unique(&mut actions, action);
    }

    actions.truncate(config.opponent_candidates);
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::tests::common::{create_test_battle, modern_context, TestCombatantBuilder};
    use crate::errors::OracleError;
    use pretty_assertions::assert_eq;

    struct BrokenPredictor;

    #[async_trait]
    impl MovePredictor for BrokenPredictor {
        async fn predict(&self, _request: &PredictionRequest) -> OracleResult<Vec<MoveCandidate>> {
            Err(OracleError::Unavailable)
        }
    }

    fn sample_state() -> (BattleContext, BattleState) {
        let ctx = modern_context();
        let state = create_test_battle(
            TestCombatantBuilder::new("starmie")
                .with_moves(&["surf"])
                .build(&ctx),
            TestCombatantBuilder::new("zapdos")
                .with_moves(&["thunderbolt"])
                .build(&ctx),
        );
        (ctx, state)
    }

    #[tokio::test]
    async fn inferred_moves_are_capped_and_filtered() {
        let (ctx, mut state) = sample_state();
        let config = AgentConfig {
            inferred_move_cap: 2,
            ..AgentConfig::default()
        };
        let predictor = StaticPredictor::new().with_movepool(
            "zapdos",
            vec![
                MoveCandidate::new("thunderbolt", 1.0),
                MoveCandidate::new("notarealmove", 0.9),
                MoveCandidate::new("roost", 0.8),
                MoveCandidate::new("airslash", 0.7),
                MoveCandidate::new("thunderwave", 0.6),
            ],
        );

        let usable = enrich_opponent(
            &ctx,
            &config,
            &predictor,
            &mut state,
            1,
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(usable.len(), 4);
        let zapdos = &state.sides[1].roster[0];
        let ids: Vec<_> = zapdos.move_ids().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["thunderbolt", "roost", "airslash"]);
        assert!(zapdos.moves[1..].iter().all(|known| !known.confirmed));
    }

    #[tokio::test]
    async fn failed_prediction_changes_nothing() {
        let (ctx, mut state) = sample_state();
        let before = state.clone();
        let usable = enrich_opponent(
            &ctx,
            &AgentConfig::default(),
            &BrokenPredictor,
            &mut state,
            1,
            Duration::from_secs(1),
        )
        .await;
        assert!(usable.is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn candidates_are_deduplicated_and_capped() {
        let (ctx, state) = sample_state();
        let config = AgentConfig::default();
        let predicted = vec![MoveCandidate::new("thunderbolt", 1.0)];

        let actions = opponent_candidates(&ctx, &config, &state, 1, &predicted);

        assert_eq!(actions, vec![Action::use_move("thunderbolt")]);
    }
}
