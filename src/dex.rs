//! Immutable move and species tables.
//!
//! A `Dex` is built once, wrapped in an `Arc` by [`BattleContext`](crate::battle::BattleContext)
//! and shared read-only by the calculator, the simulator and every search.

use crate::errors::{DexError, DexResult, EntityKind};
use schema::{MoveData, MoveId, SpeciesData, SpeciesId};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

const BUNDLED_DEX: &str = include_str!("../data/dex.ron");

#[derive(Deserialize)]
struct DexFile {
    moves: Vec<MoveData>,
    species: Vec<SpeciesData>,
}

#[derive(Debug, Clone, Default)]
pub struct Dex {
    moves: HashMap<MoveId, MoveData>,
    species: HashMap<SpeciesId, SpeciesData>,
}

impl Dex {
    /// Tables compiled into the binary from `data/dex.ron`.
    pub fn bundled() -> DexResult<Self> {
        Self::from_ron(BUNDLED_DEX)
    }

    pub fn from_ron(text: &str) -> DexResult<Self> {
        let file: DexFile =
            ron::from_str(text).map_err(|err| DexError::MalformedData(err.to_string()))?;
        let dex = Self::from_entries(file.moves, file.species);
        debug!(
            moves = dex.moves.len(),
            species = dex.species.len(),
            "loaded dex"
        );
        Ok(dex)
    }

    pub fn load(path: &Path) -> DexResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| DexError::MalformedData(format!("{}: {}", path.display(), err)))?;
        Self::from_ron(&text)
    }

    pub fn from_entries(moves: Vec<MoveData>, species: Vec<SpeciesData>) -> Self {
        Self {
            moves: moves.into_iter().map(|m| (m.id.clone(), m)).collect(),
            species: species.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    pub fn move_data(&self, id: &MoveId) -> DexResult<&MoveData> {
        self.moves.get(id).ok_or_else(|| DexError::UnknownEntity {
            kind: EntityKind::Move,
            id: id.to_string(),
        })
    }

    pub fn species(&self, id: &SpeciesId) -> DexResult<&SpeciesData> {
        self.species.get(id).ok_or_else(|| DexError::UnknownEntity {
            kind: EntityKind::Species,
            id: id.to_string(),
        })
    }

    pub fn has_move(&self, id: &MoveId) -> bool {
        self.moves.contains_key(id)
    }

    pub fn moves(&self) -> impl Iterator<Item = &MoveData> {
        self.moves.values()
    }
}
