use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// What kind of reference-data entry a lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Move,
    Species,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Move => write!(f, "move"),
            EntityKind::Species => write!(f, "species"),
        }
    }
}

/// Errors raised while loading or querying reference data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DexError {
    /// The id does not resolve to any entry in the table.
    #[error("unknown {kind}: {id}")]
    UnknownEntity { kind: EntityKind, id: String },
    /// The bundled or supplied RON text could not be parsed.
    #[error("malformed data: {0}")]
    MalformedData(String),
}

/// Errors raised by the turn simulator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Dex(#[from] DexError),
    /// The action references something unavailable this turn.
    #[error("invalid action for side {side}: {reason}")]
    InvalidAction { side: usize, reason: String },
    #[error("side {0} has no active combatant")]
    NoActiveCombatant(usize),
}

/// Failures of an out-of-process evaluator, predictor or proposer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("oracle timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed oracle response: {0}")]
    Malformed(String),
    #[error("oracle transport failure: {0}")]
    Transport(String),
    #[error("oracle unavailable")]
    Unavailable,
}

/// Main error type for the battle core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("reference data error: {0}")]
    Dex(#[from] DexError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid action: {0}")]
    InvalidAction(String),
    /// Neither a move nor a switch is available. The battle is over or the
    /// state handed to the agent is corrupt.
    #[error("no legal action available")]
    NoLegalAction,
    #[error("decision deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

impl EngineError {
    /// Whether the error came from an unresolvable move or species id.
    pub fn is_unknown_entity(&self) -> bool {
        matches!(
            self,
            EngineError::Dex(DexError::UnknownEntity { .. })
                | EngineError::Simulation(SimulationError::Dex(DexError::UnknownEntity { .. }))
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
pub type DexResult<T> = Result<T, DexError>;
pub type SimulationResult<T> = Result<T, SimulationError>;
pub type OracleResult<T> = Result<T, OracleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_entity_survives_conversion() {
        let dex = DexError::UnknownEntity {
            kind: EntityKind::Move,
            id: "megapunch".to_string(),
        };
        assert_eq!(dex.to_string(), "unknown move: megapunch");

        let engine: EngineError = SimulationError::from(dex).into();
        assert!(engine.is_unknown_entity());
        assert!(!EngineError::NoLegalAction.is_unknown_entity());
    }
}
