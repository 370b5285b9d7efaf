//! Scripted oracle doubles and config presets shared by the decision tests.

use crate::ai::config::AgentConfig;
use crate::ai::oracle::{ActionProposer, LeafEvaluator, LeafScore};
use crate::ai::predictor::{MoveCandidate, MovePredictor, PredictionRequest};
use crate::battle::state::BattleState;
use crate::errors::{OracleError, OracleResult};
use crate::player::ChosenAction;
use async_trait::async_trait;
use std::time::Duration;

/// Scores every leaf the same.
pub struct FixedEvaluator(pub u8);

#[async_trait]
impl LeafEvaluator for FixedEvaluator {
    async fn score(&self, _state: &BattleState, _perspective: usize) -> OracleResult<LeafScore> {
        Ok(LeafScore {
            score: self.0,
            justification: Some("fixed".to_string()),
        })
    }
}

pub struct FailingEvaluator;

#[async_trait]
impl LeafEvaluator for FailingEvaluator {
    async fn score(&self, _state: &BattleState, _perspective: usize) -> OracleResult<LeafScore> {
        Err(OracleError::Malformed("no score in response".to_string()))
    }
}

/// Answers only after `0`, long past any sensible timeout.
pub struct SlowEvaluator(pub Duration);

#[async_trait]
impl LeafEvaluator for SlowEvaluator {
    async fn score(&self, _state: &BattleState, _perspective: usize) -> OracleResult<LeafScore> {
        tokio::time::sleep(self.0).await;
        Ok(LeafScore {
            score: 50,
            justification: None,
        })
    }
}

pub struct ScriptedProposer(pub Vec<ChosenAction>);

#[async_trait]
impl ActionProposer for ScriptedProposer {
    async fn propose(
        &self,
        _state: &BattleState,
        _side: usize,
        count: usize,
    ) -> OracleResult<Vec<ChosenAction>> {
        Ok(self.0.iter().take(count).cloned().collect())
    }
}

pub struct FailingPredictor;

#[async_trait]
impl MovePredictor for FailingPredictor {
    async fn predict(&self, _request: &PredictionRequest) -> OracleResult<Vec<MoveCandidate>> {
        Err(OracleError::Transport("connection refused".to_string()))
    }
}

/// One ply, one candidate per side, no early exit.
pub fn narrow_config() -> AgentConfig {
    AgentConfig {
        depth: 1,
        player_candidates: 1,
        opponent_candidates: 1,
        early_exit: false,
        seed: Some(11),
        ..AgentConfig::default()
    }
}

/// A config whose whole decision budget is gone almost immediately.
pub fn hurried_config() -> AgentConfig {
    AgentConfig {
        turn_deadline_ms: 50,
        oracle_timeout_ms: 10_000,
        ..narrow_config()
    }
}
