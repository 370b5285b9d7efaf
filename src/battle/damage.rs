//! Damage calculator and the hit/crit probability model.
//!
//! Integer truncation happens at the same points the games truncate, so the
//! ranges here match the in-game numbers exactly, not approximately.

use crate::battle::ruleset::{CritModel, CritPlacement, RandomBand, Ruleset};
use crate::battle::state::BattleState;
use crate::battle::stats::{accuracy_ratio, effective_attack, effective_defense, resolve_category};
use crate::battle::BattleContext;
use crate::pokemon::Combatant;
use schema::{MoveCategory, MoveData, PokemonType, StatType, Weather};

/// Denominator of the hit chance.
pub const HIT_DENOMINATOR: u32 = 256;
/// Denominator of the critical-hit chance.
pub const CRIT_DENOMINATOR: u32 = 4096;
/// Denominator of every [`OutcomeOdds`] weight.
pub const OUTCOME_DENOMINATOR: u32 = HIT_DENOMINATOR * CRIT_DENOMINATOR;

/// Crit chance per stage for staged rulesets, in 4096ths: 1/24, 1/8, 1/2, 1.
const STAGED_CRIT_TABLE: [u32; 4] = [171, 512, 2048, 4096];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DamageRange {
    pub min: u16,
    pub max: u16,
}

impl DamageRange {
    pub const ZERO: DamageRange = DamageRange { min: 0, max: 0 };

    /// Arithmetic mean of the endpoints.
    pub fn expected(&self) -> f64 {
        (self.min as f64 + self.max as f64) / 2.0
    }

    pub fn midpoint(&self) -> u16 {
        ((self.min as u32 + self.max as u32) / 2) as u16
    }

    /// Damage for one roll drawn from `band.min..=band.max`.
    pub fn sample(&self, band: RandomBand, roll: u32) -> u16 {
        if band.max == 0 {
            return self.max;
        }
        let roll = roll.clamp(band.min, band.max);
        (self.max as u32 * roll / band.max) as u16
    }

    pub fn is_zero(&self) -> bool {
        self.max == 0
    }
}

/// The parts of the field the calculator reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldView {
    pub weather: Weather,
    pub reflect: bool,
    pub light_screen: bool,
}

impl FieldView {
    /// The field as seen by an attack landing on `defender_side`.
    pub fn against(state: &BattleState, defender_side: usize) -> Self {
        let conditions = &state.sides[defender_side].conditions;
        Self {
            weather: state.field.weather,
            reflect: conditions.reflect > 0,
            light_screen: conditions.light_screen > 0,
        }
    }
}

/// STAB multiplier for `move_type` used by `attacker`. Typeless moves never get it.
pub fn stab_multiplier(ruleset: &Ruleset, attacker: &Combatant, move_type: PokemonType) -> f64 {
    if move_type != PokemonType::Typeless && attacker.has_type(move_type) {
        ruleset.stab
    } else {
        1.0
    }
}

/// `((2*level*crit/5 + 2) * power * attack / defense) / 50 + 2`, truncating at
/// each division.
pub fn base_damage(level: u8, crit_level: u32, power: u32, attack: u32, defense: u32) -> u32 {
    let level_term = 2 * level as u32 * crit_level / 5 + 2;
    let scaled = (level_term as u64 * power as u64 * attack as u64) / defense.max(1) as u64;
    (scaled / 50) as u32 + 2
}

fn scale(damage: u32, multiplier: f64) -> u32 {
    (damage as f64 * multiplier) as u32
}

fn weather_modifier(weather: Weather, move_type: PokemonType) -> (u32, u32) {
    match (weather, move_type) {
        (Weather::Sun, PokemonType::Fire) | (Weather::Rain, PokemonType::Water) => (3, 2),
        (Weather::Sun, PokemonType::Water) | (Weather::Rain, PokemonType::Fire) => (1, 2),
        _ => (1, 1),
    }
}

/// Ability and item immunities, checked after the chart.
fn blocked_by_defender(defender: &Combatant, move_type: PokemonType, effectiveness: f64) -> bool {
    let absorbs = match move_type {
        PokemonType::Electric => {
            defender.has_ability("voltabsorb")
                || defender.has_ability("lightningrod")
                || defender.has_ability("motordrive")
        }
        PokemonType::Water => {
            defender.has_ability("waterabsorb")
                || defender.has_ability("stormdrain")
                || defender.has_ability("dryskin")
        }
        PokemonType::Fire => defender.has_ability("flashfire"),
        PokemonType::Grass => defender.has_ability("sapsipper"),
        PokemonType::Ground => defender.has_ability("levitate") || defender.holds("airballoon"),
        _ => false,
    };
    absorbs || (defender.has_ability("wonderguard") && effectiveness <= 1.0)
}

/// Damage range for one hit of `move_data`, crit or not.
pub fn calculate_damage(
    ctx: &BattleContext,
    attacker: &Combatant,
    defender: &Combatant,
    move_data: &MoveData,
    field: FieldView,
    crit: bool,
) -> DamageRange {
    if !move_data.is_damaging() {
        return DamageRange::ZERO;
    }
    let ruleset = &ctx.ruleset;
    let category = resolve_category(ctx, move_data);
    let move_type = move_data.move_type;

    let attack = effective_attack(ctx, attacker, category, crit);
    let defense = effective_defense(ctx, defender, category, crit);

    let mut power = move_data.power as u32;
    if ruleset.items_and_abilities && attacker.has_ability("technician") && power <= 60 {
        power = power * 3 / 2;
    }

    let crit_level = match ruleset.crit_placement {
        CritPlacement::LevelTerm(multiplier) if crit => multiplier,
        _ => 1,
    };
    let mut damage = base_damage(attacker.level, crit_level, power, attack, defense);

    if !crit {
        let screened = match category {
            MoveCategory::Physical => field.reflect,
            MoveCategory::Special => field.light_screen,
            MoveCategory::Status => false,
        };
        if screened {
            damage /= 2;
        }
    }

    let (numerator, denominator) = weather_modifier(field.weather, move_type);
    damage = damage * numerator / denominator;

    if crit {
        if let CritPlacement::FinalModifier(multiplier) = ruleset.crit_placement {
            damage = scale(damage, multiplier);
        }
    }

    damage = scale(damage, stab_multiplier(ruleset, attacker, move_type));

    let effectiveness = ctx.chart.effectiveness(move_type, &defender.types);
    if effectiveness == 0.0 {
        return DamageRange::ZERO;
    }
    damage = scale(damage, effectiveness);

    if ruleset.items_and_abilities {
        if blocked_by_defender(defender, move_type, effectiveness) {
            return DamageRange::ZERO;
        }
        if move_type == PokemonType::Fire && defender.has_ability("dryskin") {
            damage = damage * 5 / 4;
        }
        if attacker.holds("lifeorb") {
            damage = scale(damage, 1.3);
        }
        if attacker.holds("expertbelt") && effectiveness > 1.0 {
            damage = scale(damage, 1.2);
        }
    }

    if ruleset.min_damage_one && damage == 0 {
        damage = 1;
    }

    let band = ruleset.random_band;
    let denominator = band.denominator.max(1);
    let clamp = |value: u32| value.min(u16::MAX as u32) as u16;
    DamageRange {
        min: clamp(damage * band.min / denominator),
        max: clamp(damage * band.max / denominator),
    }
}

/// Chance the move connects, in 256ths.
pub fn hit_chance(
    ctx: &BattleContext,
    attacker: &Combatant,
    defender: &Combatant,
    move_data: &MoveData,
) -> u32 {
    let Some(accuracy) = move_data.accuracy else {
        return HIT_DENOMINATOR;
    };

    let base = accuracy.min(100) as u32 * HIT_DENOMINATOR / 100;
    let stage = (attacker.boosts.get(StatType::Acc) - defender.boosts.get(StatType::Eva)).clamp(-6, 6);
    let (numerator, denominator) = accuracy_ratio(stage);
    let mut chance = (base * numerator / denominator).min(HIT_DENOMINATOR);

    if ctx.ruleset.universal_miss {
        chance = chance.min(HIT_DENOMINATOR - 1);
    }
    chance
}

/// Chance of a critical hit given a hit, in 4096ths.
pub fn crit_chance(ctx: &BattleContext, attacker: &Combatant, move_data: &MoveData) -> u32 {
    if !move_data.is_damaging() {
        return 0;
    }
    match ctx.ruleset.crit_model {
        CritModel::SpeedBased => {
            let mut rate = attacker.base_stats.speed as u32 / 2;
            if move_data.crit.stage() > 0 {
                rate *= 8;
            }
            rate.min(255) * (CRIT_DENOMINATOR / HIT_DENOMINATOR)
        }
        CritModel::Staged => {
            let mut stage = move_data.crit.stage() as usize;
            if ctx.ruleset.items_and_abilities {
                if attacker.holds("scopelens") || attacker.holds("razorclaw") {
                    stage += 1;
                }
                if attacker.has_ability("superluck") {
                    stage += 1;
                }
            }
            STAGED_CRIT_TABLE[stage.min(STAGED_CRIT_TABLE.len() - 1)]
        }
    }
}

/// Weights of the three outcomes of one move, each over [`OUTCOME_DENOMINATOR`].
/// The weights are integers summing to the denominator, so the derived
/// probabilities are exact and sum to exactly 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeOdds {
    pub miss: u32,
    pub hit: u32,
    pub crit: u32,
}

impl OutcomeOdds {
    pub fn new(hit_chance: u32, crit_chance: u32) -> Self {
        let hit_chance = hit_chance.min(HIT_DENOMINATOR);
        let crit_chance = crit_chance.min(CRIT_DENOMINATOR);
        Self {
            miss: (HIT_DENOMINATOR - hit_chance) * CRIT_DENOMINATOR,
            hit: hit_chance * (CRIT_DENOMINATOR - crit_chance),
            crit: hit_chance * crit_chance,
        }
    }

    pub fn p_miss(&self) -> f64 {
        self.miss as f64 / OUTCOME_DENOMINATOR as f64
    }

    /// Probability of a hit that is not a critical hit.
    pub fn p_hit(&self) -> f64 {
        self.hit as f64 / OUTCOME_DENOMINATOR as f64
    }

    pub fn p_crit(&self) -> f64 {
        self.crit as f64 / OUTCOME_DENOMINATOR as f64
    }

    /// Probability the move connects at all.
    pub fn p_connect(&self) -> f64 {
        (self.hit + self.crit) as f64 / OUTCOME_DENOMINATOR as f64
    }
}

pub fn outcome_odds(
    ctx: &BattleContext,
    attacker: &Combatant,
    defender: &Combatant,
    move_data: &MoveData,
) -> OutcomeOdds {
    OutcomeOdds::new(
        hit_chance(ctx, attacker, defender, move_data),
        crit_chance(ctx, attacker, move_data),
    )
}

/// Accuracy- and crit-weighted mean damage. Misses contribute zero.
pub fn expected_damage(
    ctx: &BattleContext,
    attacker: &Combatant,
    defender: &Combatant,
    move_data: &MoveData,
    field: FieldView,
) -> f64 {
    if !move_data.is_damaging() {
        return 0.0;
    }
    let odds = outcome_odds(ctx, attacker, defender, move_data);
    let normal = calculate_damage(ctx, attacker, defender, move_data, field, false);
    let crit = calculate_damage(ctx, attacker, defender, move_data, field, true);
    odds.p_hit() * normal.expected() + odds.p_crit() * crit.expected()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::tests::common::{classic_context, modern_context, TestCombatantBuilder};
    use crate::pokemon::Stats;
    use pretty_assertions::assert_eq;
    use schema::MoveId;

    fn move_data<'a>(ctx: &'a BattleContext, id: &str) -> &'a MoveData {
        ctx.move_data(&MoveId::new(id)).unwrap()
    }

    fn stats_with(atk: u16, def: u16) -> Stats {
        Stats {
            hp: 300,
            atk,
            def,
            spa: 100,
            spd: 100,
            spe: 100,
        }
    }

    #[test]
    fn reference_scenario_truncates_exactly() {
        assert_eq!(base_damage(100, 1, 85, 200, 130), 111);

        let ctx = modern_context();
        let attacker = TestCombatantBuilder::new("tauros")
            .with_stats(stats_with(200, 100))
            .build(&ctx);
        let defender = TestCombatantBuilder::new("starmie")
            .with_stats(stats_with(100, 130))
            .build(&ctx);

        let range = calculate_damage(
            &ctx,
            &attacker,
            &defender,
            move_data(&ctx, "bodyslam"),
            FieldView::default(),
            false,
        );
        assert_eq!(range, DamageRange { min: 141, max: 166 });
    }

    #[test]
    fn stab_applies_only_to_matching_types() {
        let ctx = modern_context();
        let tauros = TestCombatantBuilder::new("tauros").build(&ctx);
        let ruleset = &ctx.ruleset;

        assert_eq!(stab_multiplier(ruleset, &tauros, PokemonType::Normal), 1.5);
        assert_eq!(stab_multiplier(ruleset, &tauros, PokemonType::Ground), 1.0);
        assert_eq!(stab_multiplier(ruleset, &tauros, PokemonType::Typeless), 1.0);

        let mut typeless = TestCombatantBuilder::new("tauros").build(&ctx);
        typeless.types = vec![PokemonType::Typeless];
        assert_eq!(
            stab_multiplier(ruleset, &typeless, PokemonType::Typeless),
            1.0
        );
    }

    #[test]
    fn damage_is_monotone_in_attack_and_defense() {
        let ctx = modern_context();
        let earthquake = move_data(&ctx, "earthquake");
        let mut previous = DamageRange::ZERO;
        for atk in (20..=600).step_by(7) {
            let attacker = TestCombatantBuilder::new("rhydon")
                .with_stats(stats_with(atk, 100))
                .build(&ctx);
            let defender = TestCombatantBuilder::new("snorlax").build(&ctx);
            let range =
                calculate_damage(&ctx, &attacker, &defender, earthquake, FieldView::default(), false);
            assert!(range.min >= previous.min && range.max >= previous.max);
            previous = range;
        }

        let mut previous = DamageRange {
            min: u16::MAX,
            max: u16::MAX,
        };
        for def in (20..=600).step_by(7) {
            let attacker = TestCombatantBuilder::new("rhydon").build(&ctx);
            let defender = TestCombatantBuilder::new("snorlax")
                .with_stats(stats_with(100, def))
                .build(&ctx);
            let range =
                calculate_damage(&ctx, &attacker, &defender, earthquake, FieldView::default(), false);
            assert!(range.min <= previous.min && range.max <= previous.max);
            previous = range;
        }
    }

    #[test]
    fn immunities_zero_the_damage() {
        let ctx = modern_context();
        let tauros = TestCombatantBuilder::new("tauros").build(&ctx);
        let gengar = TestCombatantBuilder::new("gengar").build(&ctx);
        let levitating = TestCombatantBuilder::new("snorlax")
            .with_ability("levitate")
            .build(&ctx);

        let field = FieldView::default();
        assert!(calculate_damage(&ctx, &tauros, &gengar, move_data(&ctx, "bodyslam"), field, false).is_zero());
        assert!(calculate_damage(&ctx, &tauros, &levitating, move_data(&ctx, "earthquake"), field, false).is_zero());
        assert!(!calculate_damage(&ctx, &tauros, &levitating, move_data(&ctx, "bodyslam"), field, false).is_zero());
    }

    #[test]
    fn zero_power_moves_never_damage() {
        let ctx = modern_context();
        let gengar = TestCombatantBuilder::new("gengar").build(&ctx);
        let tauros = TestCombatantBuilder::new("tauros").build(&ctx);
        for id in ["hypnosis", "nightshade", "swordsdance"] {
            let range = calculate_damage(&ctx, &gengar, &tauros, move_data(&ctx, id), FieldView::default(), true);
            assert_eq!(range, DamageRange::ZERO, "{id}");
        }
    }

    #[test]
    fn screens_halve_non_critical_hits() {
        let ctx = modern_context();
        let attacker = TestCombatantBuilder::new("tauros").build(&ctx);
        let defender = TestCombatantBuilder::new("snorlax").build(&ctx);
        let body_slam = move_data(&ctx, "bodyslam");
        let screened = FieldView {
            reflect: true,
            ..FieldView::default()
        };

        let open = calculate_damage(&ctx, &attacker, &defender, body_slam, FieldView::default(), false);
        let halved = calculate_damage(&ctx, &attacker, &defender, body_slam, screened, false);
        assert!(halved.max < open.max);
        assert_eq!(
            calculate_damage(&ctx, &attacker, &defender, body_slam, screened, true),
            calculate_damage(&ctx, &attacker, &defender, body_slam, FieldView::default(), true)
        );
    }

    #[test]
    fn outcome_probabilities_sum_to_one() {
        for ctx in [classic_context(), modern_context()] {
            let attacker = TestCombatantBuilder::new("tauros")
                .with_boost(StatType::Acc, 1)
                .build(&ctx);
            let defender = TestCombatantBuilder::new("starmie")
                .with_boost(StatType::Eva, 3)
                .build(&ctx);
            for data in ctx.dex.moves() {
                let odds = outcome_odds(&ctx, &attacker, &defender, data);
                assert_eq!(odds.miss + odds.hit + odds.crit, OUTCOME_DENOMINATOR);
                assert_eq!(odds.p_miss() + odds.p_hit() + odds.p_crit(), 1.0, "{}", data.id);
            }
        }
    }

    #[test]
    fn classic_sure_hits_still_miss_one_in_256() {
        let ctx = classic_context();
        let attacker = TestCombatantBuilder::new("tauros").build(&ctx);
        let defender = TestCombatantBuilder::new("chansey").build(&ctx);

        let body_slam = outcome_odds(&ctx, &attacker, &defender, move_data(&ctx, "bodyslam"));
        assert_eq!(body_slam.p_miss(), 1.0 / 256.0);

        let swift = outcome_odds(&ctx, &attacker, &defender, move_data(&ctx, "swift"));
        assert_eq!(swift.p_miss(), 0.0);

        let modern = modern_context();
        let odds = outcome_odds(&modern, &attacker, &defender, move_data(&modern, "bodyslam"));
        assert_eq!(odds.p_miss(), 0.0);
    }

    #[test]
    fn classic_crit_rate_follows_base_speed() {
        let ctx = classic_context();
        // Tauros base speed 110: 55/256, high-crit moves cap at 255/256.
        let tauros = TestCombatantBuilder::new("tauros").build(&ctx);
        assert_eq!(crit_chance(&ctx, &tauros, move_data(&ctx, "bodyslam")), 55 * 16);
        assert_eq!(crit_chance(&ctx, &tauros, move_data(&ctx, "slash")), 255 * 16);
        assert_eq!(crit_chance(&ctx, &tauros, move_data(&ctx, "swordsdance")), 0);
    }

    #[test]
    fn classic_crit_doubles_the_level_term() {
        let ctx = classic_context();
        let attacker = TestCombatantBuilder::new("tauros").build(&ctx);
        let defender = TestCombatantBuilder::new("snorlax").build(&ctx);
        let body_slam = move_data(&ctx, "bodyslam");
        let normal = calculate_damage(&ctx, &attacker, &defender, body_slam, FieldView::default(), false);
        let crit = calculate_damage(&ctx, &attacker, &defender, body_slam, FieldView::default(), true);
        assert!(crit.max > normal.max * 3 / 2);
    }

    #[test]
    fn sampled_rolls_stay_inside_the_range() {
        let ctx = modern_context();
        let band = ctx.ruleset.random_band;
        let range = DamageRange { min: 141, max: 166 };
        assert_eq!(range.sample(band, band.max), 166);
        assert_eq!(range.sample(band, band.min), 141);
        for roll in band.min..=band.max {
            let value = range.sample(band, roll);
            assert!((141..=166).contains(&value));
        }
    }
}
