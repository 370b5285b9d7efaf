//! Depth-bounded two-player tree search over pruned candidate sets.
//!
//! The tree is an arena of [`SearchNode`]s built breadth-first, so every
//! child sits at a higher index than its parent and a single reverse sweep
//! backpropagates scores.

use crate::ai::config::AgentConfig;
use crate::ai::evaluation::HeuristicEvaluator;
use crate::ai::matchup::{best_reply, best_switch_in};
use crate::ai::oracle::{with_timeout, ActionProposer, LeafEvaluator};
use crate::ai::predictor::{opponent_candidates, MoveCandidate};
use crate::ai::{check_deadline, push_unique, SearchOutcome};
use crate::battle::engine::{resolve_replacements, simulate_turn, Resolution};
use crate::battle::state::{opponent_of, BattleState};
use crate::battle::stats::speed_in_weather;
use crate::battle::BattleContext;
use crate::errors::{EngineError, EngineResult};
use crate::player::Action;
use ordered_float::OrderedFloat;
use std::time::Instant;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone)]
pub struct SearchNode {
    pub state: BattleState,
    /// Turns simulated from the root.
    pub depth: u8,
    /// The action pair that produced this node. Both `None` at the root.
    pub actions: [Option<Action>; 2],
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub score: Option<f64>,
}

impl SearchNode {
    fn root(state: BattleState) -> Self {
        Self {
            state,
            depth: 0,
            actions: [None, None],
            parent: None,
            children: Vec::new(),
            score: None,
        }
    }
}

pub struct Minimax<'a> {
    ctx: &'a BattleContext,
    config: &'a AgentConfig,
    evaluator: &'a dyn LeafEvaluator,
    fallback: &'a HeuristicEvaluator,
    proposer: Option<&'a dyn ActionProposer>,
    predicted: &'a [MoveCandidate],
    deadline: Option<Instant>,
}

impl<'a> Minimax<'a> {
    pub fn new(
        ctx: &'a BattleContext,
        config: &'a AgentConfig,
        evaluator: &'a dyn LeafEvaluator,
        fallback: &'a HeuristicEvaluator,
    ) -> Self {
        Self {
            ctx,
            config,
            evaluator,
            fallback,
            proposer: None,
            predicted: &[],
            deadline: None,
        }
    }

    pub fn with_proposer(mut self, proposer: Option<&'a dyn ActionProposer>) -> Self {
        self.proposer = proposer;
        self
    }

    pub fn with_predictions(mut self, predicted: &'a [MoveCandidate]) -> Self {
        self.predicted = predicted;
        self
    }

    /// Abandons the search with [`EngineError::DeadlineExceeded`] once
    /// `deadline` passes, checked before each expansion and each leaf.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    fn check_deadline(&self) -> EngineResult<()> {
        check_deadline(self.deadline, self.config.turn_deadline())
    }

    /// Skips the tree when the calculator's best move wins the race outright:
    /// strictly fewer turns to faint than the foe needs, or as many while
    /// outspeeding.
    pub fn early_exit(&self, state: &BattleState, side: usize) -> Option<SearchOutcome> {
        let foe_side = opponent_of(side);
        let me = state.sides[side].active_standing()?;
        let foe = state.sides[foe_side].active_standing()?;
        let mine = best_reply(self.ctx, state, side)?;
        if !mine.turns_to_faint.is_finite() {
            return None;
        }
        let theirs = best_reply(self.ctx, state, foe_side)
            .map_or(f64::INFINITY, |reply| reply.turns_to_faint);

        let (my_turns, their_turns) = (mine.turns_to_faint.ceil(), theirs.ceil());
        let weather = state.field.weather;
        let outspeeds =
            speed_in_weather(self.ctx, me, weather) > speed_in_weather(self.ctx, foe, weather);
        if my_turns < their_turns || (my_turns == their_turns && outspeeds) {
            debug!(my_turns, their_turns, outspeeds, "early exit");
            return Some(SearchOutcome {
                action: mine.action(),
                score: self.fallback.score_state(state, side) as f64,
                early_exit: true,
                nodes: 0,
            });
        }
        None
    }

    /// The calculator's best move plus externally proposed actions, capped.
    async fn player_candidates(&self, state: &BattleState, side: usize) -> Vec<Action> {
        let player = &state.sides[side];
        let mut actions = Vec::new();

        if player.active_is_fainted() {
            let foe = state.sides[opponent_of(side)].active_standing();
            if let Some(slot) = foe.and_then(|foe| best_switch_in(self.ctx, self.config, player, foe)) {
                push_unique(&mut actions, Action::switch_to(slot));
            }
            for slot in player.switch_options() {
                push_unique(&mut actions, Action::switch_to(slot));
            }
            actions.truncate(self.config.player_candidates);
            return actions;
        }

        if let Some(choice) = best_reply(self.ctx, state, side) {
            push_unique(&mut actions, choice.action());
        }

        if let Some(proposer) = self.proposer {
            let count = self.config.proposed_candidates;
            match with_timeout(self.config.oracle_timeout(), proposer.propose(state, side, count)).await {
                Ok(proposals) => {
                    for chosen in proposals.into_iter().take(count) {
                        match chosen.to_action(player) {
                            Ok(action) => push_unique(&mut actions, action),
                            Err(err) => debug!(%err, "discarding proposed action"),
                        }
                    }
                }
                Err(err) => warn!(%err, "action proposer failed"),
            }
        }

        if actions.is_empty() {
            actions = player.legal_actions();
        }
        actions.truncate(self.config.player_candidates);
        actions
    }

    /// Brings in replacements for fainted actives so the next ply has someone
    /// to act.
    fn settle_replacements(&self, state: &mut BattleState) {
        if state.is_terminal() {
            return;
        }
        let mut replacements = [None, None];
        for (side, replacement) in replacements.iter_mut().enumerate() {
            let player = &state.sides[side];
            if !player.active_is_fainted() {
                continue;
            }
            let foe = state.sides[opponent_of(side)].active_standing();
            *replacement = foe
                .and_then(|foe| best_switch_in(self.ctx, self.config, player, foe))
                .or_else(|| player.switch_options().first().copied())
                .map(Action::switch_to);
        }
        if replacements.iter().all(Option::is_none) {
            return;
        }
        if let Err(err) = resolve_replacements(self.ctx, state, replacements) {
            debug!(%err, "replacement failed inside the search");
        }
    }

    /// Expands the tree breadth-first down to the configured depth.
    pub async fn build_tree(&self, root: &BattleState, side: usize) -> EngineResult<Vec<SearchNode>> {
        let foe_side = opponent_of(side);
        let mut nodes = vec![SearchNode::root(root.search_copy())];
        let mut cursor = 0;

        while cursor < nodes.len() {
            let index = cursor;
            cursor += 1;
            if nodes[index].state.is_terminal() || nodes[index].depth >= self.config.depth {
                continue;
            }
            self.check_deadline()?;
            // Expansion is CPU-bound; let the runtime's own timers run.
            tokio::task::yield_now().await;

            let state = nodes[index].state.clone();
            let depth = nodes[index].depth + 1;
            let mine = self.player_candidates(&state, side).await;
            let mut theirs: Vec<Option<Action>> =
                opponent_candidates(self.ctx, self.config, &state, foe_side, self.predicted)
                    .into_iter()
                    .map(Some)
                    .collect();
            if theirs.is_empty() {
                theirs.push(None);
            }

            for player_action in &mine {
                for opponent_action in &theirs {
                    let mut actions = [None, None];
                    actions[side] = Some(player_action.clone());
                    actions[foe_side] = opponent_action.clone();

                    match simulate_turn(self.ctx, &state, actions.clone(), &mut Resolution::Expected) {
                        Ok(mut next) => {
                            self.settle_replacements(&mut next);
                            let child = nodes.len();
                            nodes.push(SearchNode {
                                state: next,
                                depth,
                                actions,
                                parent: Some(index),
                                children: Vec::new(),
                                score: None,
                            });
                            nodes[index].children.push(child);
                        }
                        Err(err) => debug!(%err, ?actions, "pruning unsimulatable pair"),
                    }
                }
            }
        }
        Ok(nodes)
    }

    async fn evaluate_leaves(&self, nodes: &mut [SearchNode], side: usize) -> EngineResult<()> {
        let mut failures = 0;
        for index in 0..nodes.len() {
            if !nodes[index].children.is_empty() {
                continue;
            }
            self.check_deadline()?;
            let state = &nodes[index].state;
            let score = match with_timeout(
                self.config.oracle_timeout(),
                self.evaluator.score(state, side),
            )
            .await
            {
                Ok(leaf) => {
                    debug!(score = leaf.score, justification = ?leaf.justification, "leaf scored");
                    leaf.score as f64
                }
                Err(err) => {
                    failures += 1;
                    debug!(%err, "leaf evaluator failed");
                    self.fallback.score_state(state, side) as f64
                }
            };
            nodes[index].score = Some(score);
        }
        if failures > 0 {
            warn!(failures, "leaf evaluator failed, heuristic scores used");
        }
        Ok(())
    }

    #[instrument(skip_all, fields(side = side, turn = root.turn))]
    pub async fn search(&self, root: &BattleState, side: usize) -> EngineResult<SearchOutcome> {
        if self.config.early_exit {
            if let Some(outcome) = self.early_exit(root, side) {
                return Ok(outcome);
            }
        }

        let mut nodes = self.build_tree(root, side).await?;
        if nodes[0].children.is_empty() {
            return Err(EngineError::NoLegalAction);
        }
        self.evaluate_leaves(&mut nodes, side).await?;

        let (action, score) = backpropagate(&mut nodes, side).ok_or(EngineError::NoLegalAction)?;
        debug!(%action, score, nodes = nodes.len(), "minimax resolved");
        Ok(SearchOutcome {
            action,
            score,
            early_exit: false,
            nodes: nodes.len(),
        })
    }
}

/// The player label with the best worst-case reply among `index`'s children.
/// Labels keep first-seen order, so ties go to the earlier label.
fn best_label(nodes: &[SearchNode], index: usize, side: usize) -> Option<(Action, f64)> {
    let mut labels: Vec<(Action, OrderedFloat<f64>)> = Vec::new();
    for &child in &nodes[index].children {
        let (Some(label), Some(score)) = (&nodes[child].actions[side], nodes[child].score) else {
            continue;
        };
        let score = OrderedFloat(score);
        match labels.iter_mut().find(|entry| entry.0.same_choice(label)) {
            Some(entry) => entry.1 = entry.1.min(score),
            None => labels.push((label.clone(), score)),
        }
    }

    let mut best: Option<(Action, OrderedFloat<f64>)> = None;
    for (label, score) in labels {
        if best.as_ref().map_or(true, |(_, top)| score > *top) {
            best = Some((label, score));
        }
    }
    best.map(|(label, score)| (label, score.into_inner()))
}

/// Minimax over the arena: min across opponent replies per player label,
/// max across labels. Returns the root's choice.
pub fn backpropagate(nodes: &mut [SearchNode], side: usize) -> Option<(Action, f64)> {
    for index in (0..nodes.len()).rev() {
        if nodes[index].children.is_empty() {
            continue;
        }
        nodes[index].score = best_label(nodes, index, side).map(|(_, score)| score);
    }
    best_label(nodes, 0, side)
}
