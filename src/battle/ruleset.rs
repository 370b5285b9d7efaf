//! Per-ruleset mechanics flags, loaded from RON.

use crate::battle::type_chart::{ChartKind, TypeOverride};
use crate::errors::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

const GEN1_RULESET: &str = include_str!("../../data/rulesets/gen1.ron");
const MODERN_RULESET: &str = include_str!("../../data/rulesets/modern.ron");

/// Damage band as `[max * min / denominator, max * max / denominator]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomBand {
    pub min: u32,
    pub max: u32,
    pub denominator: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CritModel {
    /// `floor(base_speed / 2) / 256`, times eight for high-crit moves.
    SpeedBased,
    /// Stage table 1/24, 1/8, 1/2, 1.
    Staged,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CritPlacement {
    /// Multiplies the level inside the base formula.
    LevelTerm(u32),
    /// Multiplies the damage after the base formula.
    FinalModifier(f64),
}

/// Which boost stages a critical hit disregards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CritBoostRule {
    IgnoreAll,
    /// Drops the attacker's negative and the defender's positive stages only.
    IgnoreUnfavorable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ruleset {
    pub name: String,
    pub chart: ChartKind,
    pub chart_overrides: Vec<TypeOverride>,
    pub level: u8,
    pub iv: u8,
    pub ev: u16,
    pub stab: f64,
    pub random_band: RandomBand,
    pub crit_model: CritModel,
    pub crit_placement: CritPlacement,
    pub crit_boosts: CritBoostRule,
    /// Caps every hit chance at 255/256.
    pub universal_miss: bool,
    /// Physical or special is decided by the move's type, not the move.
    pub category_by_type: bool,
    pub min_damage_one: bool,
    pub items_and_abilities: bool,
    pub paralysis_speed_divisor: u16,
    pub full_paralysis_chance: u8,
    /// Residual damage is `max_hp / burn_residual`.
    pub burn_residual: u16,
    pub poison_residual: u16,
    pub sleep_turns: (u8, u8),
    pub waking_consumes_turn: bool,
    pub thaw_chance: u8,
    pub screen_turns: u8,
    pub weather_turns: u8,
}

impl Default for Ruleset {
    fn default() -> Self {
        Self {
            name: "modern".to_string(),
            chart: ChartKind::Modern,
            chart_overrides: Vec::new(),
            level: 100,
            iv: 31,
            ev: 84,
            stab: 1.5,
            random_band: RandomBand {
                min: 85,
                max: 100,
                denominator: 100,
            },
            crit_model: CritModel::Staged,
            crit_placement: CritPlacement::FinalModifier(1.5),
            crit_boosts: CritBoostRule::IgnoreUnfavorable,
            universal_miss: false,
            category_by_type: false,
            min_damage_one: true,
            items_and_abilities: true,
            paralysis_speed_divisor: 2,
            full_paralysis_chance: 25,
            burn_residual: 16,
            poison_residual: 8,
            sleep_turns: (1, 3),
            waking_consumes_turn: false,
            thaw_chance: 20,
            screen_turns: 5,
            weather_turns: 5,
        }
    }
}

impl Ruleset {
    pub fn from_ron(text: &str) -> EngineResult<Self> {
        ron::from_str(text).map_err(|err| EngineError::Config(err.to_string()))
    }

    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| EngineError::Config(format!("{}: {}", path.display(), err)))?;
        Self::from_ron(&text)
    }

    /// Looks up one of the rulesets compiled into the binary.
    pub fn bundled(name: &str) -> EngineResult<Self> {
        match name {
            "gen1" | "classic" => Self::from_ron(GEN1_RULESET),
            "modern" => Self::from_ron(MODERN_RULESET),
            other => Err(EngineError::Config(format!("no bundled ruleset named {other}"))),
        }
    }

    pub fn classic() -> EngineResult<Self> {
        Self::bundled("gen1")
    }

    pub fn modern() -> EngineResult<Self> {
        Self::bundled("modern")
    }
}
