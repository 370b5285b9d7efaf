use crate::battle::state::{BattleEvent, BattleState, TurnRng};
use crate::battle::BattleContext;
use crate::errors::SimulationResult;
use crate::player::Side;
use crate::pokemon::{Combatant, Stats, StatusCondition};
use schema::StatType;

pub fn modern_context() -> BattleContext {
    match BattleContext::modern() {
        Ok(ctx) => ctx,
        Err(err) => panic!("bundled modern context failed to load: {}", err),
    }
}

pub fn classic_context() -> BattleContext {
    match BattleContext::classic() {
        Ok(ctx) => ctx,
        Err(err) => panic!("bundled classic context failed to load: {}", err),
    }
}

/// A builder for test combatants with common defaults.
///
/// # Example
/// ```ignore
/// let starmie = TestCombatantBuilder::new("starmie")
///     .with_moves(&["surf", "thunderbolt"])
///     .with_status(StatusCondition::Paralysis)
///     .build(&ctx);
/// ```
pub struct TestCombatantBuilder {
    species: String,
    moves: Vec<String>,
    status: Option<StatusCondition>,
    current_hp: Option<u16>,
    item: Option<String>,
    ability: Option<String>,
    boosts: Vec<(StatType, i8)>,
    stats: Option<Stats>,
    hidden: bool,
}

impl TestCombatantBuilder {
    pub fn new(species: &str) -> Self {
        Self {
            species: species.to_string(),
            moves: Vec::new(),
            status: None,
            current_hp: None,
            item: None,
            ability: None,
            boosts: Vec::new(),
            stats: None,
            hidden: false,
        }
    }

    pub fn with_moves(mut self, moves: &[&str]) -> Self {
        self.moves = moves.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn with_status(mut self, status: StatusCondition) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the current HP. If not set, HP will be max.
    pub fn with_hp(mut self, hp: u16) -> Self {
        self.current_hp = Some(hp);
        self
    }

    pub fn with_item(mut self, item: &str) -> Self {
        self.item = Some(item.to_string());
        self
    }

    pub fn with_ability(mut self, ability: &str) -> Self {
        self.ability = Some(ability.to_string());
        self
    }

    pub fn with_boost(mut self, stat: StatType, stages: i8) -> Self {
        self.boosts.push((stat, stages));
        self
    }

    /// Overrides the derived stats. HP is reset to the new maximum.
    pub fn with_stats(mut self, stats: Stats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn build(self, ctx: &BattleContext) -> Combatant {
        let moves: Vec<&str> = self.moves.iter().map(String::as_str).collect();
        let mut combatant = match Combatant::from_species(ctx, &self.species, &moves) {
            Ok(combatant) => combatant,
            Err(err) => panic!("failed to build {}: {}", self.species, err),
        };

        if let Some(stats) = self.stats {
            combatant = combatant.with_stats(stats);
        }
        if let Some(item) = &self.item {
            combatant = combatant.with_item(item);
        }
        if let Some(ability) = &self.ability {
            combatant = combatant.with_ability(ability);
        }
        combatant.status = self.status;
        for (stat, stages) in self.boosts {
            combatant.boosts.apply(stat, stages);
        }
        if let Some(hp) = self.current_hp {
            combatant = combatant.with_hp(hp);
        }
        if self.hidden {
            combatant = combatant.hidden();
        }
        combatant
    }
}

/// A 1v1 battle between the two combatants.
pub fn create_test_battle(player: Combatant, opponent: Combatant) -> BattleState {
    BattleState::new(
        Side::new("Player", vec![player]),
        Side::new("Opponent", vec![opponent]),
    )
}

pub fn create_team_battle(player: Vec<Combatant>, opponent: Vec<Combatant>) -> BattleState {
    BattleState::new(Side::new("Player", player), Side::new("Opponent", opponent))
}

/// Scripted rolls that always hit, never crit and roll the top of the band.
pub fn predictable_rng() -> TurnRng {
    TurnRng::scripted(vec![0, 4095, 255])
}

pub fn assert_ok<T>(result: SimulationResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("Expected Ok but got error: {}", err),
    }
}

/// The events of `state`'s log matching `filter`.
pub fn events_matching(
    state: &BattleState,
    filter: impl Fn(&BattleEvent) -> bool,
) -> Vec<BattleEvent> {
    state.log.events().filter(|e| filter(e)).cloned().collect()
}

/// Sides that used a move, in the order they moved.
pub fn move_order(state: &BattleState) -> Vec<usize> {
    state
        .log
        .events()
        .filter_map(|event| match event {
            BattleEvent::MoveUsed { side, .. } => Some(*side),
            _ => None,
        })
        .collect()
}
