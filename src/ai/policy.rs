//! The decision entry point. Runs the configured search under the turn
//! deadline and walks an explicit fallback chain when it fails, so a legal
//! action comes back whenever one exists.

use crate::ai::config::{AgentConfig, Strategy};
use crate::ai::evaluation::{HeuristicEvaluator, PositionEvaluator};
use crate::ai::expectimax::Expectimax;
use crate::ai::matchup::{best_reply, best_switch_in};
use crate::ai::minimax::Minimax;
use crate::ai::oracle::{ActionProposer, LeafEvaluator};
use crate::ai::predictor::{enrich_opponent, MovePredictor, NoPredictor};
use crate::ai::SearchOutcome;
use crate::battle::state::{opponent_of, BattleState};
use crate::battle::BattleContext;
use crate::errors::{EngineError, EngineResult};
use crate::player::{Action, ChosenAction, Side};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Which step of the decision path produced the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionTier {
    /// Only one sensible action existed; no search ran.
    Forced,
    Search,
    /// The search was skipped because the calculator's move wins the race.
    EarlyExit,
    DamageCalculator,
    HighestPower,
    Random,
}

impl DecisionTier {
    pub fn is_fallback(self) -> bool {
        matches!(
            self,
            DecisionTier::DamageCalculator | DecisionTier::HighestPower | DecisionTier::Random
        )
    }
}

impl fmt::Display for DecisionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecisionTier::Forced => "forced",
            DecisionTier::Search => "search",
            DecisionTier::EarlyExit => "early exit",
            DecisionTier::DamageCalculator => "damage calculator",
            DecisionTier::HighestPower => "highest power",
            DecisionTier::Random => "random",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: Action,
    pub tier: DecisionTier,
    /// The search's score for the action, when a search produced it.
    pub score: Option<f64>,
    pub elapsed: Duration,
}

impl Decision {
    /// The action in the client's wire form.
    pub fn to_wire(&self, side: &Side) -> EngineResult<ChosenAction> {
        ChosenAction::from_action(side, &self.action)
    }
}

/// A battle agent: configuration, oracle backends and the fallback RNG.
pub struct Agent {
    ctx: BattleContext,
    config: AgentConfig,
    evaluator: Arc<dyn LeafEvaluator>,
    predictor: Arc<dyn MovePredictor>,
    proposer: Option<Arc<dyn ActionProposer>>,
    position: PositionEvaluator,
    heuristic: Arc<HeuristicEvaluator>,
    rng: Mutex<StdRng>,
}

impl Agent {
    /// An agent scoring leaves with its own heuristic and predicting nothing.
    pub fn new(ctx: BattleContext, config: AgentConfig) -> Self {
        let heuristic = Arc::new(HeuristicEvaluator::new(&config.evaluation));
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        Self {
            position: PositionEvaluator::new(config.evaluation.clone()),
            evaluator: heuristic.clone(),
            heuristic,
            predictor: Arc::new(NoPredictor),
            proposer: None,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ctx,
            config,
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn LeafEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_predictor(mut self, predictor: Arc<dyn MovePredictor>) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn with_proposer(mut self, proposer: Arc<dyn ActionProposer>) -> Self {
        self.proposer = Some(proposer);
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Picks an action for `side`.
    ///
    /// Errors only with [`EngineError::NoLegalAction`]; every other failure
    /// is absorbed by the fallback chain.
    #[instrument(skip_all, fields(side = side, turn = state.turn))]
    pub async fn decide(&self, state: &BattleState, side: usize) -> EngineResult<Decision> {
        let started = Instant::now();
        let player = &state.sides[side];
        let legal = player.legal_actions();
        if state.is_terminal() || legal.is_empty() {
            return Err(EngineError::NoLegalAction);
        }

        if let Some(action) = self.forced_action(state, side, &legal) {
            return Ok(self.finish(action, DecisionTier::Forced, None, started));
        }

        match self.search_within_deadline(state, side, started).await {
            Ok(outcome) if player.is_legal(&outcome.action) => {
                let tier = if outcome.early_exit {
                    DecisionTier::EarlyExit
                } else {
                    DecisionTier::Search
                };
                debug!(nodes = outcome.nodes, "search finished");
                return Ok(self.finish(outcome.action, tier, Some(outcome.score), started));
            }
            Ok(outcome) => warn!(action = %outcome.action, "search chose an illegal action"),
            Err(err) => warn!(%err, "search failed"),
        }

        let (action, tier) = self.fallback(state, side, &legal)?;
        Ok(self.finish(action, tier, None, started))
    }

    /// A single legal action, or the best replacement for a fainted active.
    fn forced_action(&self, state: &BattleState, side: usize, legal: &[Action]) -> Option<Action> {
        if let [only] = legal {
            return Some(only.clone());
        }
        let player = &state.sides[side];
        if !player.active_is_fainted() {
            return None;
        }
        state.sides[opponent_of(side)]
            .active_standing()
            .and_then(|foe| best_switch_in(&self.ctx, &self.config, player, foe))
            .map(Action::switch_to)
            .or_else(|| legal.first().cloned())
    }

    async fn search_within_deadline(
        &self,
        state: &BattleState,
        side: usize,
        started: Instant,
    ) -> EngineResult<SearchOutcome> {
        let deadline = self.config.turn_deadline();
        let remaining = deadline.saturating_sub(started.elapsed());
        let search = self.search(state, side, started + deadline);
        match tokio::time::timeout(remaining, search).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::DeadlineExceeded(deadline)),
        }
    }

    /// The strategies check `deadline` themselves; the outer timeout alone
    /// cannot interrupt a search that never awaits.
    async fn search(
        &self,
        state: &BattleState,
        side: usize,
        deadline: Instant,
    ) -> EngineResult<SearchOutcome> {
        let mut working = state.clone();
        let predicted = enrich_opponent(
            &self.ctx,
            &self.config,
            self.predictor.as_ref(),
            &mut working,
            opponent_of(side),
            self.config.oracle_timeout(),
        )
        .await;

        match self.config.strategy {
            Strategy::Expectimax => Expectimax::new(&self.ctx, &self.config, &self.position)
                .with_deadline(Some(deadline))
                .search(&working, side),
            Strategy::Minimax => {
                Minimax::new(
                    &self.ctx,
                    &self.config,
                    self.evaluator.as_ref(),
                    self.heuristic.as_ref(),
                )
                .with_proposer(self.proposer.as_deref())
                .with_predictions(&predicted)
                .with_deadline(Some(deadline))
                .search(&working, side)
                .await
            }
        }
    }

    /// Damage calculator, then highest base power, then a uniform draw.
    fn fallback(
        &self,
        state: &BattleState,
        side: usize,
        legal: &[Action],
    ) -> EngineResult<(Action, DecisionTier)> {
        let player = &state.sides[side];

        if let Some(choice) = best_reply(&self.ctx, state, side) {
            let action = choice.action();
            if player.is_legal(&action) {
                warn!(%action, "falling back to the damage calculator");
                return Ok((action, DecisionTier::DamageCalculator));
            }
        }

        if let Some(action) = self.highest_power(player) {
            warn!(%action, "falling back to the highest base power move");
            return Ok((action, DecisionTier::HighestPower));
        }

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let action = legal
            .choose(&mut *rng)
            .cloned()
            .ok_or(EngineError::NoLegalAction)?;
        warn!(%action, "falling back to a random legal action");
        Ok((action, DecisionTier::Random))
    }

    /// Known move with the highest base power; the first listed wins ties.
    fn highest_power(&self, player: &Side) -> Option<Action> {
        let mut best: Option<(Action, u16)> = None;
        for action in player.move_actions() {
            let Some(power) = action
                .move_id()
                .and_then(|id| self.ctx.move_data(id).ok())
                .map(|data| data.power)
            else {
                continue;
            };
            if best.as_ref().map_or(true, |(_, top)| power > *top) {
                best = Some((action, power));
            }
        }
        best.filter(|(_, power)| *power > 0).map(|(action, _)| action)
    }

    fn finish(
        &self,
        action: Action,
        tier: DecisionTier,
        score: Option<f64>,
        started: Instant,
    ) -> Decision {
        let elapsed = started.elapsed();
        info!(%action, %tier, ?score, ?elapsed, "decision made");
        Decision {
            action,
            tier,
            score,
            elapsed,
        }
    }
}
