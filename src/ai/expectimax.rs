//! Single-ply search weighting each move's miss, hit and crit outcomes by
//! their exact probabilities.

use crate::ai::config::AgentConfig;
use crate::ai::evaluation::PositionEvaluator;
use crate::ai::matchup::strongest_hit;
use crate::ai::{check_deadline, SearchOutcome};
use crate::battle::damage::{outcome_odds, FieldView};
use crate::battle::engine::{simulate_turn, HitOutcome, Resolution};
use crate::battle::state::{opponent_of, BattleState};
use crate::battle::BattleContext;
use crate::errors::{EngineError, EngineResult};
use crate::player::Action;
use ordered_float::OrderedFloat;
use std::time::Instant;
use tracing::{debug, instrument};

pub struct Expectimax<'a> {
    ctx: &'a BattleContext,
    config: &'a AgentConfig,
    evaluator: &'a PositionEvaluator,
    deadline: Option<Instant>,
}

impl<'a> Expectimax<'a> {
    pub fn new(
        ctx: &'a BattleContext,
        config: &'a AgentConfig,
        evaluator: &'a PositionEvaluator,
    ) -> Self {
        Self {
            ctx,
            config,
            evaluator,
            deadline: None,
        }
    }

    /// Stops between candidates once `deadline` passes.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    fn actions_for(&self, side: usize, action: Action) -> [Option<Action>; 2] {
        let mut actions = [None, None];
        actions[side] = Some(action);
        actions
    }

    /// Value of one pinned outcome of `action`. The opponent is held still.
    fn outcome_value(
        &self,
        state: &BattleState,
        side: usize,
        action: &Action,
        outcome: HitOutcome,
    ) -> EngineResult<f64> {
        let mut outcomes = [HitOutcome::Miss; 2];
        outcomes[side] = outcome;
        let next = simulate_turn(
            self.ctx,
            state,
            self.actions_for(side, action.clone()),
            &mut Resolution::Forced(outcomes),
        )?;
        Ok(self.evaluator.evaluate(&next, side))
    }

    /// `P(miss)·V(miss) + P(hit)·V(hit) + P(crit)·V(crit)`.
    pub fn move_value(&self, state: &BattleState, side: usize, action: &Action) -> EngineResult<f64> {
        let Some(id) = action.move_id() else {
            return Err(EngineError::InvalidAction(format!("{} is not a move", action)));
        };
        let move_data = self.ctx.move_data(id)?;
        let attacker = state.sides[side]
            .active_standing()
            .ok_or(EngineError::NoLegalAction)?;
        let Some(defender) = state.sides[opponent_of(side)].active_standing() else {
            return self.outcome_value(state, side, action, HitOutcome::Hit);
        };

        let odds = outcome_odds(self.ctx, attacker, defender, move_data);
        let mut value = 0.0;
        for (probability, outcome) in [
            (odds.p_miss(), HitOutcome::Miss),
            (odds.p_hit(), HitOutcome::Hit),
            (odds.p_crit(), HitOutcome::Crit),
        ] {
            if probability > 0.0 {
                value += probability * self.outcome_value(state, side, action, outcome)?;
            }
        }
        Ok(value)
    }

    /// Post-switch evaluation minus the free turn conceded, larger when the
    /// incoming combatant would not survive the foe's strongest known hit.
    pub fn switch_value(&self, state: &BattleState, side: usize, slot: usize) -> EngineResult<f64> {
        let action = Action::switch_to(slot);
        let next = simulate_turn(
            self.ctx,
            state,
            self.actions_for(side, action),
            &mut Resolution::Expected,
        )?;

        let foe_side = opponent_of(side);
        let penalty = match (
            next.sides[side].active(),
            next.sides[foe_side].active_standing(),
        ) {
            (Some(incoming), Some(foe)) => {
                let field = FieldView::against(&next, side);
                if strongest_hit(self.ctx, foe, incoming, field) >= incoming.current_hp {
                    self.config.unsafe_switch_penalty
                } else {
                    self.config.switch_penalty
                }
            }
            _ => self.config.switch_penalty,
        };
        Ok(self.evaluator.evaluate(&next, side) - penalty)
    }

    /// Best action for `side`. Moves are scored first and a switch only
    /// replaces the pick when strictly better.
    #[instrument(skip_all, fields(side = side, turn = state.turn))]
    pub fn search(&self, state: &BattleState, side: usize) -> EngineResult<SearchOutcome> {
        let state = &state.search_copy();
        let player = &state.sides[side];
        let budget = self.config.turn_deadline();
        let mut best: Option<(Action, OrderedFloat<f64>)> = None;
        let mut evaluated = 0;

        let mut consider = |action: Action, value: f64| {
            debug!(%action, value, "expectimax candidate");
            evaluated += 1;
            if best.as_ref().map_or(true, |(_, top)| OrderedFloat(value) > *top) {
                best = Some((action, OrderedFloat(value)));
            }
        };

        for action in player.move_actions() {
            check_deadline(self.deadline, budget)?;
            let value = self.move_value(state, side, &action)?;
            consider(action, value);
        }
        for slot in player.switch_options() {
            check_deadline(self.deadline, budget)?;
            let value = self.switch_value(state, side, slot)?;
            consider(Action::switch_to(slot), value);
        }

        let (action, score) = best.ok_or(EngineError::NoLegalAction)?;
        Ok(SearchOutcome {
            action,
            score: score.into_inner(),
            early_exit: false,
            nodes: evaluated,
        })
    }
}
