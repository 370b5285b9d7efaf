// Pokemon Tactician Schema - Shared reference-data definitions
// This crate holds the serde-serializable enums and records that the battle
// core loads from RON: elemental types, move and species data, and the
// normalized identifiers used to look them up.

pub use battle_data::*;
pub use ids::*;
pub use move_types::*;
pub use pokemon_types::*;
pub use species_data::*;

pub mod battle_data;
pub mod ids;
pub mod move_types;
pub mod pokemon_types;
pub mod species_data;
