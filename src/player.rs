use crate::errors::{EngineError, EngineResult};
use crate::pokemon::Combatant;
use schema::{MoveId, SpeciesId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What one side does this turn.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    UseMove { id: MoveId, target: Option<u8> },
    SwitchTo { slot: usize },
}

impl Action {
    pub fn use_move(id: &str) -> Self {
        Action::UseMove {
            id: MoveId::new(id),
            target: None,
        }
    }

    pub fn switch_to(slot: usize) -> Self {
        Action::SwitchTo { slot }
    }

    pub fn move_id(&self) -> Option<&MoveId> {
        match self {
            Action::UseMove { id, .. } => Some(id),
            Action::SwitchTo { .. } => None,
        }
    }

    pub fn is_switch(&self) -> bool {
        matches!(self, Action::SwitchTo { .. })
    }

    /// Same decision, ignoring the target slot. Singles battles have one target.
    pub fn same_choice(&self, other: &Action) -> bool {
        match (self, other) {
            (Action::UseMove { id: a, .. }, Action::UseMove { id: b, .. }) => a == b,
            (Action::SwitchTo { slot: a }, Action::SwitchTo { slot: b }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::UseMove { id, .. } => write!(f, "use {}", id),
            Action::SwitchTo { slot } => write!(f, "switch to slot {}", slot),
        }
    }
}

/// Turn counters for screens, presence and layers for hazards.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SideConditions {
    pub reflect: u8,
    pub light_screen: u8,
    pub stealth_rock: bool,
    pub spikes: u8,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Side {
    pub name: String,
    pub roster: Vec<Combatant>,
    pub active: usize,
    pub conditions: SideConditions,
}

impl Side {
    pub fn new(name: &str, roster: Vec<Combatant>) -> Self {
        Self {
            name: name.to_string(),
            roster,
            active: 0,
            conditions: SideConditions::default(),
        }
    }

    pub fn active(&self) -> Option<&Combatant> {
        self.roster.get(self.active)
    }

    pub fn active_mut(&mut self) -> Option<&mut Combatant> {
        self.roster.get_mut(self.active)
    }

    /// The active combatant, if it can still fight.
    pub fn active_standing(&self) -> Option<&Combatant> {
        self.active().filter(|combatant| !combatant.is_fainted())
    }

    pub fn active_is_fainted(&self) -> bool {
        self.active().map_or(true, Combatant::is_fainted)
    }

    pub fn has_usable(&self) -> bool {
        self.roster.iter().any(|combatant| !combatant.is_fainted())
    }

    pub fn remaining(&self) -> usize {
        self.roster.iter().filter(|c| !c.is_fainted()).count()
    }

    /// Revealed, standing bench slots. Unseen slots are never switch candidates.
    pub fn switch_options(&self) -> Vec<usize> {
        self.roster
            .iter()
            .enumerate()
            .filter(|(slot, combatant)| {
                *slot != self.active && combatant.revealed && !combatant.is_fainted()
            })
            .map(|(slot, _)| slot)
            .collect()
    }

    pub fn move_actions(&self) -> Vec<Action> {
        self.active_standing()
            .map(|active| {
                active
                    .move_ids()
                    .map(|id| Action::UseMove {
                        id: id.clone(),
                        target: None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every action this side may take. A fainted active leaves only switches.
    pub fn legal_actions(&self) -> Vec<Action> {
        let switches = self.switch_options().into_iter().map(Action::switch_to);
        if self.active_is_fainted() {
            return switches.collect();
        }
        let mut actions = self.move_actions();
        actions.extend(switches);
        actions
    }

    pub fn is_legal(&self, action: &Action) -> bool {
        match action {
            Action::UseMove { id, .. } => self.active_standing().is_some_and(|c| c.knows(id)),
            Action::SwitchTo { slot } => self.switch_options().contains(slot),
        }
    }

    pub fn slot_of(&self, species: &SpeciesId) -> Option<usize> {
        self.roster.iter().position(|c| &c.species == species)
    }
}

/// The action shape exchanged with the game client:
/// `{"move": "<id>", "target": n}` or `{"switch": "<species>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireAction", into = "WireAction")]
pub enum ChosenAction {
    Move { id: MoveId, target: Option<u8> },
    Switch { species: SpeciesId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireAction {
    #[serde(rename = "move", default, skip_serializing_if = "Option::is_none")]
    move_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    switch: Option<String>,
}

impl TryFrom<WireAction> for ChosenAction {
    type Error = String;

    fn try_from(wire: WireAction) -> Result<Self, Self::Error> {
        match (wire.move_id, wire.switch, wire.target) {
            (Some(id), None, target) if !id.trim().is_empty() => Ok(ChosenAction::Move {
                id: MoveId::new(&id),
                target,
            }),
            (None, Some(species), None) if !species.trim().is_empty() => {
                Ok(ChosenAction::Switch {
                    species: SpeciesId::new(&species),
                })
            }
            (None, Some(_), Some(_)) => Err("a switch takes no target".to_string()),
            (Some(_), Some(_), _) => Err("expected exactly one of move or switch".to_string()),
            _ => Err("expected a non-empty move or switch".to_string()),
        }
    }
}

impl From<ChosenAction> for WireAction {
    fn from(action: ChosenAction) -> Self {
        match action {
            ChosenAction::Move { id, target } => WireAction {
                move_id: Some(id.into()),
                target,
                switch: None,
            },
            ChosenAction::Switch { species } => WireAction {
                move_id: None,
                target: None,
                switch: Some(species.into()),
            },
        }
    }
}

impl ChosenAction {
    pub fn parse(text: &str) -> EngineResult<Self> {
        serde_json::from_str(text).map_err(|err| EngineError::InvalidAction(err.to_string()))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_action(side: &Side, action: &Action) -> EngineResult<Self> {
        match action {
            Action::UseMove { id, target } => Ok(ChosenAction::Move {
                id: id.clone(),
                target: *target,
            }),
            Action::SwitchTo { slot } => side
                .roster
                .get(*slot)
                .map(|combatant| ChosenAction::Switch {
                    species: combatant.species.clone(),
                })
                .ok_or_else(|| EngineError::InvalidAction(format!("no roster slot {}", slot))),
        }
    }

    /// Resolves the wire form against a side, rejecting anything not legal now.
    pub fn to_action(&self, side: &Side) -> EngineResult<Action> {
        let action = match self {
            ChosenAction::Move { id, target } => Action::UseMove {
                id: id.clone(),
                target: *target,
            },
            ChosenAction::Switch { species } => {
                let slot = side.slot_of(species).ok_or_else(|| {
                    EngineError::InvalidAction(format!("{} is not on the roster", species))
                })?;
                Action::SwitchTo { slot }
            }
        };
        if side.is_legal(&action) {
            Ok(action)
        } else {
            Err(EngineError::InvalidAction(format!(
                "{} is not available this turn",
                action
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::tests::common::{modern_context, TestCombatantBuilder};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn sample_side() -> Side {
        let ctx = modern_context();
        Side::new(
            "Player",
            vec![
                TestCombatantBuilder::new("starmie")
                    .with_moves(&["surf", "thunderbolt"])
                    .build(&ctx),
                TestCombatantBuilder::new("snorlax")
                    .with_moves(&["bodyslam"])
                    .build(&ctx),
                TestCombatantBuilder::new("chansey").with_hp(0).build(&ctx),
                TestCombatantBuilder::new("tauros").hidden().build(&ctx),
            ],
        )
    }

    #[test]
    fn legal_actions_skip_fainted_and_unseen_slots() {
        let side = sample_side();
        assert_eq!(
            side.legal_actions(),
            vec![
                Action::use_move("surf"),
                Action::use_move("thunderbolt"),
                Action::switch_to(1),
            ]
        );
    }

    #[test]
    fn fainted_active_may_only_switch() {
        let mut side = sample_side();
        side.roster[0].current_hp = 0;
        assert_eq!(side.legal_actions(), vec![Action::switch_to(1)]);
    }

    #[rstest]
    #[case(r#"{"move": "Thunderbolt"}"#, ChosenAction::Move { id: MoveId::new("thunderbolt"), target: None })]
    #[case(r#"{"move": "surf", "target": 1}"#, ChosenAction::Move { id: MoveId::new("surf"), target: Some(1) })]
    #[case(r#"{"switch": "Snorlax"}"#, ChosenAction::Switch { species: SpeciesId::new("snorlax") })]
    fn wire_actions_parse(#[case] text: &str, #[case] expected: ChosenAction) {
        assert_eq!(ChosenAction::parse(text).unwrap(), expected);
    }

    #[rstest]
    #[case(r#"{}"#)]
    #[case(r#"{"move": "surf", "switch": "snorlax"}"#)]
    #[case(r#"{"switch": "snorlax", "target": 1}"#)]
    #[case(r#"{"move": "surf", "priority": 1}"#)]
    #[case(r#"{"move": ""}"#)]
    #[case(r#""surf""#)]
    fn malformed_wire_actions_are_rejected(#[case] text: &str) {
        assert!(matches!(
            ChosenAction::parse(text),
            Err(EngineError::InvalidAction(_))
        ));
    }

    #[test]
    fn wire_form_serializes_without_empty_keys() {
        let chosen = ChosenAction::Switch {
            species: SpeciesId::new("snorlax"),
        };
        assert_eq!(chosen.to_json(), r#"{"switch":"snorlax"}"#);
        let chosen = ChosenAction::Move {
            id: MoveId::new("surf"),
            target: None,
        };
        assert_eq!(chosen.to_json(), r#"{"move":"surf"}"#);
    }

    #[test]
    fn chosen_actions_resolve_against_the_roster() {
        let side = sample_side();
        let switch = ChosenAction::Switch {
            species: SpeciesId::new("snorlax"),
        };
        assert_eq!(switch.to_action(&side).unwrap(), Action::switch_to(1));

        let fainted = ChosenAction::Switch {
            species: SpeciesId::new("chansey"),
        };
        assert!(fainted.to_action(&side).is_err());

        let unknown_move = ChosenAction::Move {
            id: MoveId::new("hyperbeam"),
            target: None,
        };
        assert!(unknown_move.to_action(&side).is_err());
    }
}
