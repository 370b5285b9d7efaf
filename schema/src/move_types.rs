use crate::{MoveId, PokemonType, SideConditionKind, Weather};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveCategory {
    Physical,
    Special,
    Status,
}

impl fmt::Display for MoveCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveCategory::Physical => write!(f, "Physical"),
            MoveCategory::Special => write!(f, "Special"),
            MoveCategory::Status => write!(f, "Status"),
        }
    }
}

/// Stats that carry a boost stage. HP never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatType {
    Atk,
    Def,
    SpAtk,
    SpDef,
    Spe,
    Acc,
    Eva,
}

impl StatType {
    pub const ALL: [StatType; 7] = [
        StatType::Atk,
        StatType::Def,
        StatType::SpAtk,
        StatType::SpDef,
        StatType::Spe,
        StatType::Acc,
        StatType::Eva,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for StatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatType::Atk => write!(f, "Attack"),
            StatType::Def => write!(f, "Defense"),
            StatType::SpAtk => write!(f, "Special Attack"),
            StatType::SpDef => write!(f, "Special Defense"),
            StatType::Spe => write!(f, "Speed"),
            StatType::Acc => write!(f, "Accuracy"),
            StatType::Eva => write!(f, "Evasion"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MoveTarget {
    User,
    #[default]
    Opponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    Burn,
    Paralysis,
    Sleep,
    Freeze,
    Poison,
    Toxic,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusKind::Burn => "burned",
            StatusKind::Paralysis => "paralyzed",
            StatusKind::Sleep => "asleep",
            StatusKind::Freeze => "frozen",
            StatusKind::Poison => "poisoned",
            StatusKind::Toxic => "badly poisoned",
        };
        write!(f, "{}", name)
    }
}

/// Critical-hit tier of a move. `High` covers the Slash / Razor Leaf family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CritTier {
    #[default]
    Normal,
    High,
}

impl CritTier {
    pub fn stage(self) -> u8 {
        match self {
            CritTier::Normal => 0,
            CritTier::High => 1,
        }
    }
}

/// A status the move may inflict on its target, with a percent chance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    pub chance: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatChange {
    pub target: MoveTarget,
    pub stat: StatType,
    pub stages: i8,
    #[serde(default = "always")]
    pub chance: u8,
}

fn always() -> u8 {
    100
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveData {
    pub id: MoveId,
    pub name: String,
    pub move_type: PokemonType,
    pub category: MoveCategory,
    #[serde(default)]
    pub power: u16,
    /// Percent accuracy. `None` never misses.
    #[serde(default)]
    pub accuracy: Option<u8>,
    #[serde(default)]
    pub priority: i8,
    #[serde(default)]
    pub crit: CritTier,
    #[serde(default)]
    pub status: Option<StatusEffect>,
    #[serde(default)]
    pub stat_changes: Vec<StatChange>,
    /// Fraction of the user's max HP restored after damage resolution.
    #[serde(default)]
    pub heal: f64,
    #[serde(default)]
    pub target: MoveTarget,
    #[serde(default)]
    pub side_condition: Option<SideConditionKind>,
    #[serde(default)]
    pub weather: Option<Weather>,
}

impl MoveData {
    pub fn is_damaging(&self) -> bool {
        self.category != MoveCategory::Status && self.power > 0
    }

    /// Positive stage changes the move grants its own user.
    pub fn self_boosts(&self) -> impl Iterator<Item = &StatChange> {
        self.stat_changes
            .iter()
            .filter(|change| change.target == MoveTarget::User && change.stages > 0)
    }
}
