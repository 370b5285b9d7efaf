pub mod damage;
pub mod engine;
pub mod ruleset;
pub mod state;
pub mod stats;
pub mod type_chart;

#[cfg(test)]
pub(crate) mod tests;

use crate::dex::Dex;
use crate::errors::{DexResult, EngineResult};
use ruleset::Ruleset;
use schema::{MoveData, MoveId};
use std::sync::Arc;
use type_chart::TypeChart;

/// Read-only tables a calculation needs: reference data, mechanics flags and
/// the type chart derived from them. Cheap to clone; every field is shared.
#[derive(Debug, Clone)]
pub struct BattleContext {
    pub dex: Arc<Dex>,
    pub ruleset: Arc<Ruleset>,
    pub chart: Arc<TypeChart>,
}

impl BattleContext {
    pub fn new(dex: Arc<Dex>, ruleset: Ruleset) -> Self {
        let chart = TypeChart::new(ruleset.chart, &ruleset.chart_overrides);
        Self {
            dex,
            ruleset: Arc::new(ruleset),
            chart: Arc::new(chart),
        }
    }

    /// Bundled dex with the classic ruleset.
    pub fn classic() -> EngineResult<Self> {
        Ok(Self::new(Arc::new(Dex::bundled()?), Ruleset::classic()?))
    }

    /// Bundled dex with the modern ruleset.
    pub fn modern() -> EngineResult<Self> {
        Ok(Self::new(Arc::new(Dex::bundled()?), Ruleset::modern()?))
    }

    pub fn move_data(&self, id: &MoveId) -> DexResult<&MoveData> {
        self.dex.move_data(id)
    }
}
