use crate::battle::ruleset::CritBoostRule;
use crate::battle::BattleContext;
use crate::pokemon::{Combatant, StatusCondition, Stats};
use schema::{BaseStats, MoveCategory, MoveData, StatType, Weather};

/// Regular stat multipliers for stages -6..=6, as (numerator, denominator).
pub const STAT_STAGE_TABLE: [(u32, u32); 13] = [
    (2, 8),
    (2, 7),
    (2, 6),
    (2, 5),
    (2, 4),
    (2, 3),
    (2, 2),
    (3, 2),
    (4, 2),
    (5, 2),
    (6, 2),
    (7, 2),
    (8, 2),
];

/// Accuracy and evasion multipliers for stages -6..=6.
pub const ACCURACY_STAGE_TABLE: [(u32, u32); 13] = [
    (3, 9),
    (3, 8),
    (3, 7),
    (3, 6),
    (3, 5),
    (3, 4),
    (3, 3),
    (4, 3),
    (5, 3),
    (6, 3),
    (7, 3),
    (8, 3),
    (9, 3),
];

fn table_index(stage: i8) -> usize {
    (stage.clamp(-6, 6) + 6) as usize
}

pub fn stage_ratio(stage: i8) -> (u32, u32) {
    STAT_STAGE_TABLE[table_index(stage)]
}

pub fn accuracy_ratio(stage: i8) -> (u32, u32) {
    ACCURACY_STAGE_TABLE[table_index(stage)]
}

pub fn apply_stat_stage(value: u32, stage: i8) -> u32 {
    let (numerator, denominator) = stage_ratio(stage);
    value * numerator / denominator
}

/// `floor((2*base + iv + ev/4) * level / 100) + 5`; HP adds `level + 10` instead of 5.
pub fn calculate_stats(base: &BaseStats, level: u8, iv: u8, ev: u16) -> Stats {
    let level = level as u32;
    let scaled = |base: u8| (2 * base as u32 + iv as u32 + ev as u32 / 4) * level / 100;
    let clamp = |value: u32| value.min(u16::MAX as u32) as u16;

    Stats {
        hp: clamp(scaled(base.hp) + level + 10),
        atk: clamp(scaled(base.attack) + 5),
        def: clamp(scaled(base.defense) + 5),
        spa: clamp(scaled(base.sp_attack) + 5),
        spd: clamp(scaled(base.sp_defense) + 5),
        spe: clamp(scaled(base.speed) + 5),
    }
}

/// Physical or special as the ruleset sees it. Classic rulesets split by type.
pub fn resolve_category(ctx: &BattleContext, move_data: &MoveData) -> MoveCategory {
    if move_data.category == MoveCategory::Status {
        return MoveCategory::Status;
    }
    if ctx.ruleset.category_by_type {
        if move_data.move_type.is_classically_physical() {
            MoveCategory::Physical
        } else {
            MoveCategory::Special
        }
    } else {
        move_data.category
    }
}

fn attacker_stage(ctx: &BattleContext, stage: i8, crit: bool) -> i8 {
    match (crit, ctx.ruleset.crit_boosts) {
        (false, _) => stage,
        (true, CritBoostRule::IgnoreAll) => 0,
        (true, CritBoostRule::IgnoreUnfavorable) => stage.max(0),
    }
}

fn defender_stage(ctx: &BattleContext, stage: i8, crit: bool) -> i8 {
    match (crit, ctx.ruleset.crit_boosts) {
        (false, _) => stage,
        (true, CritBoostRule::IgnoreAll) => 0,
        (true, CritBoostRule::IgnoreUnfavorable) => stage.min(0),
    }
}

/// Attacking stat including stages, burn, items and abilities.
pub fn effective_attack(
    ctx: &BattleContext,
    attacker: &Combatant,
    category: MoveCategory,
    crit: bool,
) -> u32 {
    let (raw, stat) = match category {
        MoveCategory::Physical => (attacker.stats.atk, StatType::Atk),
        MoveCategory::Special => (attacker.stats.spa, StatType::SpAtk),
        MoveCategory::Status => return 0,
    };
    let stage = attacker_stage(ctx, attacker.boosts.get(stat), crit);
    let mut attack = apply_stat_stage(raw as u32, stage);

    let physical = category == MoveCategory::Physical;
    let guts = ctx.ruleset.items_and_abilities
        && attacker.has_ability("guts")
        && attacker.status.is_some();

    if ctx.ruleset.items_and_abilities {
        if physical && (attacker.has_ability("hugepower") || attacker.has_ability("purepower")) {
            attack *= 2;
        }
        if guts && physical {
            attack = attack * 3 / 2;
        }
        if (physical && attacker.holds("choiceband")) || (!physical && attacker.holds("choicespecs"))
        {
            attack = attack * 3 / 2;
        }
    }

    if physical && matches!(attacker.status, Some(StatusCondition::Burn)) && !guts {
        attack /= 2;
    }

    attack.max(1)
}

/// Defending stat including stages and defensive items.
pub fn effective_defense(
    ctx: &BattleContext,
    defender: &Combatant,
    category: MoveCategory,
    crit: bool,
) -> u32 {
    let (raw, stat) = match category {
        MoveCategory::Physical => (defender.stats.def, StatType::Def),
        MoveCategory::Special => (defender.stats.spd, StatType::SpDef),
        MoveCategory::Status => return 1,
    };
    let stage = defender_stage(ctx, defender.boosts.get(stat), crit);
    let mut defense = apply_stat_stage(raw as u32, stage);

    if ctx.ruleset.items_and_abilities {
        if defender.holds("eviolite") {
            defense = defense * 3 / 2;
        }
        if category == MoveCategory::Special && defender.holds("assaultvest") {
            defense = defense * 3 / 2;
        }
    }

    defense.max(1)
}

/// Speed including stages, paralysis and Choice Scarf.
pub fn effective_speed(ctx: &BattleContext, combatant: &Combatant) -> u32 {
    let mut speed = apply_stat_stage(combatant.stats.spe as u32, combatant.boosts.get(StatType::Spe));

    if ctx.ruleset.items_and_abilities && combatant.holds("choicescarf") {
        speed = speed * 3 / 2;
    }

    if matches!(combatant.status, Some(StatusCondition::Paralysis)) {
        speed /= ctx.ruleset.paralysis_speed_divisor.max(1) as u32;
    }

    speed.max(1)
}

/// [`effective_speed`] under `weather`: Swift Swim, Chlorophyll and Sand Rush
/// double speed in rain, sun and sand.
pub fn speed_in_weather(ctx: &BattleContext, combatant: &Combatant, weather: Weather) -> u32 {
    let speed = effective_speed(ctx, combatant);
    if !ctx.ruleset.items_and_abilities {
        return speed;
    }
    let doubled = match weather {
        Weather::Rain => combatant.has_ability("swiftswim"),
        Weather::Sun => combatant.has_ability("chlorophyll"),
        Weather::Sand => combatant.has_ability("sandrush"),
        Weather::Clear => false,
    };
    if doubled {
        speed * 2
    } else {
        speed
    }
}
