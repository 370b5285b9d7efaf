//! The decision core: matchup heuristics, opponent modelling, the two search
//! strategies and the policy that chains them with their fallbacks.

pub mod config;
pub mod evaluation;
pub mod expectimax;
pub mod matchup;
pub mod minimax;
pub mod oracle;
pub mod policy;
pub mod predictor;

#[cfg(test)]
mod tests;

use crate::errors::{EngineError, EngineResult};
use crate::player::Action;
use std::time::{Duration, Instant};

pub use config::{AgentConfig, EvaluationWeights, Strategy};
pub use evaluation::{HeuristicEvaluator, PositionEvaluator};
pub use oracle::{ActionProposer, HttpOracle, LeafEvaluator, LeafScore};
pub use policy::{Agent, Decision, DecisionTier};
pub use predictor::{MoveCandidate, MovePredictor, NoPredictor, StaticPredictor};

/// What a search strategy settled on.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub action: Action,
    pub score: f64,
    /// The tree was skipped because a faster kill was guaranteed.
    pub early_exit: bool,
    /// Nodes or candidates evaluated.
    pub nodes: usize,
}

pub(crate) fn push_unique(actions: &mut Vec<Action>, action: Action) {
    if !actions.iter().any(|existing| existing.same_choice(&action)) {
        actions.push(action);
    }
}

/// Fails with [`EngineError::DeadlineExceeded`] once `deadline` has passed.
pub(crate) fn check_deadline(deadline: Option<Instant>, budget: Duration) -> EngineResult<()> {
    match deadline {
        Some(deadline) if Instant::now() >= deadline => Err(EngineError::DeadlineExceeded(budget)),
        _ => Ok(()),
    }
}
