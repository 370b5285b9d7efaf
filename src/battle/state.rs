use crate::player::Side;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schema::{SideConditionKind, StatType, StatusKind, Weather};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::ops::RangeInclusive;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    InProgress,
    Player1Win,
    Player2Win,
    Draw,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum BattleEvent {
    TurnStarted {
        turn: u32,
    },
    Switched {
        side: usize,
        species: String,
        hp: u16,
        max_hp: u16,
    },
    MoveUsed {
        side: usize,
        species: String,
        move_name: String,
    },
    MoveMissed {
        side: usize,
        species: String,
    },
    MoveFailed {
        side: usize,
        species: String,
    },
    CriticalHit,
    Effectiveness {
        multiplier: f64,
    },
    DamageDealt {
        side: usize,
        species: String,
        damage: u16,
        remaining_hp: u16,
    },
    Healed {
        side: usize,
        species: String,
        amount: u16,
        new_hp: u16,
    },
    StatusApplied {
        side: usize,
        species: String,
        status: StatusKind,
    },
    StatusCured {
        side: usize,
        species: String,
        status: StatusKind,
    },
    PreventedFromActing {
        side: usize,
        species: String,
        status: StatusKind,
    },
    StatChanged {
        side: usize,
        species: String,
        stat: StatType,
        stages: i8,
    },
    ResidualDamage {
        side: usize,
        species: String,
        source: String,
        damage: u16,
    },
    SideConditionSet {
        side: usize,
        condition: SideConditionKind,
    },
    SideConditionEnded {
        side: usize,
        condition: SideConditionKind,
    },
    WeatherStarted {
        weather: Weather,
    },
    WeatherEnded {
        weather: Weather,
    },
    Fainted {
        side: usize,
        species: String,
    },
    BattleEnded {
        winner: Option<usize>,
    },
}

impl BattleEvent {
    /// Human-readable line for the event, or `None` for events that are
    /// obvious from the surrounding lines.
    pub fn format(&self, battle_state: &BattleState) -> Option<String> {
        let side_name = |side: &usize| {
            battle_state
                .sides
                .get(*side)
                .map(|s| s.name.as_str())
                .unwrap_or("?")
        };

        match self {
            BattleEvent::TurnStarted { turn } => Some(format!("=== Turn {} ===", turn)),
            BattleEvent::Switched {
                side,
                species,
                hp,
                max_hp,
            } => Some(format!(
                "{} sent out {} ({}/{} HP)!",
                side_name(side),
                species,
                hp,
                max_hp
            )),
            BattleEvent::MoveUsed {
                side,
                species,
                move_name,
            } => Some(format!("{}'s {} used {}!", side_name(side), species, move_name)),
            BattleEvent::MoveMissed { species, .. } => {
                Some(format!("{}'s attack missed!", species))
            }
            BattleEvent::MoveFailed { .. } => Some("But it failed!".to_string()),
            BattleEvent::CriticalHit => Some("A critical hit!".to_string()),
            BattleEvent::Effectiveness { multiplier } => match *multiplier {
                m if m == 0.0 => Some("It had no effect!".to_string()),
                m if m > 1.0 => Some("It's super effective!".to_string()),
                m if m < 1.0 => Some("It's not very effective...".to_string()),
                _ => None,
            },
            BattleEvent::DamageDealt {
                species,
                damage,
                remaining_hp,
                ..
            } => Some(format!(
                "{} took {} damage ({} HP left).",
                species, damage, remaining_hp
            )),
            BattleEvent::Healed {
                species,
                amount,
                new_hp,
                ..
            } => Some(format!(
                "{} restored {} HP ({} HP).",
                species, amount, new_hp
            )),
            BattleEvent::StatusApplied {
                species, status, ..
            } => Some(format!("{} is {}!", species, status)),
            BattleEvent::StatusCured {
                species, status, ..
            } => Some(format!("{} is no longer {}.", species, status)),
            BattleEvent::PreventedFromActing {
                species, status, ..
            } => Some(format!("{} is {} and cannot move!", species, status)),
            BattleEvent::StatChanged {
                species,
                stat,
                stages,
                ..
            } => {
                let verb = match *stages {
                    s if s >= 2 => "sharply rose",
                    s if s > 0 => "rose",
                    s if s <= -2 => "harshly fell",
                    s if s < 0 => "fell",
                    _ => "won't go any further",
                };
                Some(format!("{}'s {} {}!", species, stat, verb))
            }
            BattleEvent::ResidualDamage {
                species,
                source,
                damage,
                ..
            } => Some(format!("{} was hurt by {} ({} HP).", species, source, damage)),
            BattleEvent::SideConditionSet { side, condition } => {
                Some(format!("{} now affects {}'s side.", condition, side_name(side)))
            }
            BattleEvent::SideConditionEnded { side, condition } => {
                Some(format!("{}'s {} wore off.", side_name(side), condition))
            }
            BattleEvent::WeatherStarted { weather } => Some(format!("The field is in {}.", weather)),
            BattleEvent::WeatherEnded { weather } => Some(format!("The {} subsided.", weather)),
            BattleEvent::Fainted { species, .. } => Some(format!("{} fainted!", species)),
            BattleEvent::BattleEnded { winner } => Some(match winner {
                Some(side) => format!("{} won the battle!", side_name(side)),
                None => "The battle ended in a draw.".to_string(),
            }),
        }
    }
}

/// Bounded battle history. Oldest events fall off once `capacity` is reached.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EventLog {
    events: VecDeque<BattleEvent>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(64)
    }
}

impl EventLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(256)),
            capacity,
        }
    }

    pub fn push(&mut self, event: BattleEvent) {
        if self.capacity == 0 {
            return;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn events(&self) -> impl Iterator<Item = &BattleEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// The formatted lines of every non-silent event, oldest first.
    pub fn render(&self, battle_state: &BattleState) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| event.format(battle_state))
            .collect()
    }
}

#[derive(Debug, Clone)]
enum RngSource {
    Scripted { outcomes: Vec<u32>, index: usize },
    Seeded(StdRng),
}

/// Randomness for `Rolled` turn resolution: either a fixed script, for tests
/// that need exact outcomes, or a seeded generator.
#[derive(Debug, Clone)]
pub struct TurnRng {
    source: RngSource,
}

impl TurnRng {
    /// Replays `outcomes` in order, wrapping around when exhausted. Each value
    /// is clamped into the range requested by the caller.
    pub fn scripted(outcomes: Vec<u32>) -> Self {
        Self {
            source: RngSource::Scripted { outcomes, index: 0 },
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            source: RngSource::Seeded(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self::seeded(rand::rng().random())
    }

    /// A value in `range`, consumed for `reason`.
    pub fn next_in(&mut self, reason: &str, range: RangeInclusive<u32>) -> u32 {
        let (low, high) = (*range.start(), *range.end());
        if low >= high {
            return low;
        }
        let value = match &mut self.source {
            RngSource::Scripted { outcomes, index } => {
                let raw = if outcomes.is_empty() {
                    low
                } else {
                    outcomes[*index % outcomes.len()]
                };
                *index += 1;
                raw.clamp(low, high)
            }
            RngSource::Seeded(rng) => rng.random_range(low..=high),
        };
        tracing::trace!(value, reason, "rng consumed");
        value
    }

    /// A value in `0..bound`.
    pub fn next_below(&mut self, reason: &str, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.next_in(reason, 0..=bound - 1)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Field {
    pub weather: Weather,
    pub weather_turns: u8,
}

/// One complete battle snapshot. Cloning yields an independent copy, which
/// is how speculative search keeps the authoritative state untouched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BattleState {
    pub sides: [Side; 2],
    pub turn: u32,
    pub field: Field,
    pub game_state: GameState,
    pub log: EventLog,
}

impl BattleState {
    pub fn new(player: Side, opponent: Side) -> Self {
        let mut state = Self {
            sides: [player, opponent],
            turn: 0,
            field: Field::default(),
            game_state: GameState::InProgress,
            log: EventLog::default(),
        };
        state.refresh_game_state();
        state
    }

    /// A copy for speculative search: everything but the history, with a
    /// log that records nothing.
    pub fn search_copy(&self) -> Self {
        Self {
            sides: self.sides.clone(),
            turn: self.turn,
            field: self.field,
            game_state: self.game_state,
            log: EventLog::with_capacity(0),
        }
    }

    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log = EventLog::with_capacity(capacity);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.game_state != GameState::InProgress
    }

    pub fn winner(&self) -> Option<usize> {
        match self.game_state {
            GameState::Player1Win => Some(0),
            GameState::Player2Win => Some(1),
            GameState::InProgress | GameState::Draw => None,
        }
    }

    /// Recomputes the terminal flag from the rosters. Returns true when the
    /// battle just ended.
    pub fn refresh_game_state(&mut self) -> bool {
        let was_terminal = self.is_terminal();
        self.game_state = match (self.sides[0].has_usable(), self.sides[1].has_usable()) {
            (true, true) => GameState::InProgress,
            (true, false) => GameState::Player1Win,
            (false, true) => GameState::Player2Win,
            (false, false) => GameState::Draw,
        };
        !was_terminal && self.is_terminal()
    }

    /// Rendered event log, oldest first.
    pub fn transcript(&self) -> Vec<String> {
        self.log.render(self)
    }
}

pub fn opponent_of(side: usize) -> usize {
    1 - side
}
