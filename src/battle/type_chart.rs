use schema::PokemonType;
use serde::{Deserialize, Serialize};

/// Which built-in chart a ruleset starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChartKind {
    Classic,
    #[default]
    Modern,
}

/// A single cell replaced on top of the base chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TypeOverride {
    pub attacking: PokemonType,
    pub defending: PokemonType,
    pub multiplier: f64,
}

/// Dense attack-type by defend-type multiplier table. Built once per ruleset.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeChart {
    table: [[f64; PokemonType::COUNT]; PokemonType::COUNT],
}

impl Default for TypeChart {
    fn default() -> Self {
        Self {
            table: [[1.0; PokemonType::COUNT]; PokemonType::COUNT],
        }
    }
}

impl TypeChart {
    pub fn new(kind: ChartKind, overrides: &[TypeOverride]) -> Self {
        let base: fn(PokemonType, PokemonType) -> f64 = match kind {
            ChartKind::Classic => PokemonType::classic_effectiveness,
            ChartKind::Modern => PokemonType::modern_effectiveness,
        };

        let mut chart = Self::default();
        for attacking in all_types() {
            for defending in all_types() {
                chart.table[attacking.index()][defending.index()] = base(attacking, defending);
            }
        }
        for cell in overrides {
            chart.table[cell.attacking.index()][cell.defending.index()] = cell.multiplier;
        }
        chart
    }

    /// Multiplier of one attacking type against one defending type.
    pub fn multiplier(&self, attacking: PokemonType, defending: PokemonType) -> f64 {
        if attacking == PokemonType::Typeless || defending == PokemonType::Typeless {
            return 1.0;
        }
        self.table[attacking.index()][defending.index()]
    }

    /// Product of the multipliers against each defending type.
    pub fn effectiveness(&self, attacking: PokemonType, defenders: &[PokemonType]) -> f64 {
        defenders
            .iter()
            .map(|&defending| self.multiplier(attacking, defending))
            .product()
    }
}

fn all_types() -> impl Iterator<Item = PokemonType> {
    use strum::IntoEnumIterator;
    PokemonType::iter()
}
