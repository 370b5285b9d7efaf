use serde::{Deserialize, Serialize};
use std::fmt;

/// Conditions a move can place on one side of the field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, Copy)]
pub enum SideConditionKind {
    Reflect,
    LightScreen,
    StealthRock,
    Spikes,
}

impl SideConditionKind {
    /// Screens protect the side that sets them; hazards land on the opposing side.
    pub fn lands_on_user_side(self) -> bool {
        matches!(self, SideConditionKind::Reflect | SideConditionKind::LightScreen)
    }
}

impl fmt::Display for SideConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let display_name = match self {
            SideConditionKind::Reflect => "Reflect",
            SideConditionKind::LightScreen => "Light Screen",
            SideConditionKind::StealthRock => "Stealth Rock",
            SideConditionKind::Spikes => "Spikes",
        };
        write!(f, "{}", display_name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Weather {
    #[default]
    Clear,
    Sun,
    Rain,
    Sand,
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let display_name = match self {
            Weather::Clear => "clear skies",
            Weather::Sun => "harsh sunlight",
            Weather::Rain => "rain",
            Weather::Sand => "a sandstorm",
        };
        write!(f, "{}", display_name)
    }
}
