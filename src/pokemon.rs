use crate::battle::stats::calculate_stats;
use crate::battle::BattleContext;
use crate::errors::DexResult;
use schema::{AbilityId, BaseStats, ItemId, MoveId, PokemonType, SpeciesId, StatType, StatusKind};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCondition {
    Burn,
    Paralysis,
    /// Turns left asleep. Zero means the combatant wakes on its next action.
    Sleep(u8),
    Freeze,
    Poison,
    /// Escalation counter, the numerator of the `n/16` residual.
    Toxic(u8),
}

impl StatusCondition {
    pub fn kind(&self) -> StatusKind {
        match self {
            StatusCondition::Burn => StatusKind::Burn,
            StatusCondition::Paralysis => StatusKind::Paralysis,
            StatusCondition::Sleep(_) => StatusKind::Sleep,
            StatusCondition::Freeze => StatusKind::Freeze,
            StatusCondition::Poison => StatusKind::Poison,
            StatusCondition::Toxic(_) => StatusKind::Toxic,
        }
    }
}

impl fmt::Display for StatusCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}

/// Unboosted stats at the combatant's level.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub hp: u16,
    pub atk: u16,
    pub def: u16,
    pub spa: u16,
    pub spd: u16,
    pub spe: u16,
}

/// Stage counters, each held in -6..=6.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Boosts([i8; 7]);

impl Boosts {
    pub fn get(&self, stat: StatType) -> i8 {
        self.0[stat.index()]
    }

    pub fn set(&mut self, stat: StatType, stage: i8) {
        self.0[stat.index()] = stage.clamp(-6, 6);
    }

    /// Applies a stage change and returns how far the stage actually moved.
    pub fn apply(&mut self, stat: StatType, delta: i8) -> i8 {
        let before = self.get(stat);
        self.set(stat, before.saturating_add(delta));
        self.get(stat) - before
    }

    pub fn reset(&mut self) {
        self.0 = [0; 7];
    }
}

/// A move the side knows or suspects this combatant has.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KnownMove {
    pub id: MoveId,
    /// Observed in use, as opposed to inferred by a predictor.
    pub confirmed: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Combatant {
    pub species: SpeciesId,
    pub name: String,
    pub level: u8,
    pub types: Vec<PokemonType>,
    pub base_stats: BaseStats,
    pub stats: Stats,
    pub current_hp: u16,
    pub status: Option<StatusCondition>,
    pub boosts: Boosts,
    pub item: Option<ItemId>,
    pub ability: Option<AbilityId>,
    pub moves: Vec<KnownMove>,
    /// False for opponent slots that have not been seen yet.
    pub revealed: bool,
}

impl Combatant {
    /// Builds a full-HP combatant at the ruleset's default level.
    pub fn from_species(ctx: &BattleContext, species: &str, moves: &[&str]) -> DexResult<Self> {
        let species_data = ctx.dex.species(&SpeciesId::new(species))?;
        let moves = moves
            .iter()
            .map(|raw| {
                let id = MoveId::new(raw);
                ctx.dex.move_data(&id).map(|_| KnownMove {
                    id,
                    confirmed: true,
                })
            })
            .collect::<DexResult<Vec<_>>>()?;

        let ruleset = &ctx.ruleset;
        let stats = calculate_stats(
            &species_data.base_stats,
            ruleset.level,
            ruleset.iv,
            ruleset.ev,
        );

        Ok(Self {
            species: species_data.id.clone(),
            name: species_data.name.clone(),
            level: ruleset.level,
            types: species_data.types.clone(),
            base_stats: species_data.base_stats,
            stats,
            current_hp: stats.hp,
            status: None,
            boosts: Boosts::default(),
            item: None,
            ability: None,
            moves,
            revealed: true,
        })
    }

    pub fn with_level(mut self, ctx: &BattleContext, level: u8) -> Self {
        self.level = level;
        self.stats = calculate_stats(&self.base_stats, level, ctx.ruleset.iv, ctx.ruleset.ev);
        self.current_hp = self.stats.hp;
        self
    }

    /// Replaces the derived stats, for providers that report live values.
    pub fn with_stats(mut self, stats: Stats) -> Self {
        self.stats = stats;
        self.current_hp = stats.hp;
        self
    }

    pub fn with_item(mut self, item: &str) -> Self {
        self.item = Some(ItemId::new(item));
        self
    }

    pub fn with_ability(mut self, ability: &str) -> Self {
        self.ability = Some(AbilityId::new(ability));
        self
    }

    pub fn with_status(mut self, status: StatusCondition) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_hp(mut self, hp: u16) -> Self {
        self.current_hp = hp.min(self.stats.hp);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.revealed = false;
        self
    }

    pub fn max_hp(&self) -> u16 {
        self.stats.hp
    }

    pub fn is_fainted(&self) -> bool {
        self.current_hp == 0
    }

    pub fn hp_fraction(&self) -> f64 {
        if self.stats.hp == 0 {
            return 0.0;
        }
        self.current_hp as f64 / self.stats.hp as f64
    }

    pub fn has_type(&self, pokemon_type: PokemonType) -> bool {
        self.types.contains(&pokemon_type)
    }

    pub fn holds(&self, item: &str) -> bool {
        self.item.as_ref().is_some_and(|held| held.as_str() == item)
    }

    pub fn has_ability(&self, ability: &str) -> bool {
        self.ability.as_ref().is_some_and(|own| own.as_str() == ability)
    }

    pub fn knows(&self, id: &MoveId) -> bool {
        self.moves.iter().any(|known| &known.id == id)
    }

    pub fn move_ids(&self) -> impl Iterator<Item = &MoveId> {
        self.moves.iter().map(|known| &known.id)
    }

    /// Records a move the predictor believes this combatant carries.
    /// Returns false when the move was already known.
    pub fn add_inferred_move(&mut self, id: MoveId) -> bool {
        if self.knows(&id) {
            return false;
        }
        self.moves.push(KnownMove {
            id,
            confirmed: false,
        });
        true
    }

    /// Lowers HP, never below zero. Returns the HP actually removed.
    pub fn take_damage(&mut self, amount: u16) -> u16 {
        let dealt = amount.min(self.current_hp);
        self.current_hp -= dealt;
        dealt
    }

    /// Raises HP, never above max and never for a fainted combatant.
    pub fn heal(&mut self, amount: u16) -> u16 {
        if self.is_fainted() {
            return 0;
        }
        let healed = amount.min(self.stats.hp - self.current_hp);
        self.current_hp += healed;
        healed
    }

    /// Switching out clears stages and restarts the toxic counter.
    pub fn on_switch_out(&mut self) {
        self.boosts.reset();
        if let Some(StatusCondition::Toxic(_)) = self.status {
            self.status = Some(StatusCondition::Toxic(1));
        }
    }
}
