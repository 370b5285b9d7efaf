//! Turn resolution.
//!
//! A turn goes `PendingActions -> Resolved`: switches first, then moves in
//! priority/speed order, then heals, then end-of-turn residuals and the
//! terminal check. The same code serves real battles (`Rolled`) and search
//! (`Expected`, `Forced`), which differ only in how a move's outcome is chosen.

use crate::battle::damage::{
    calculate_damage, crit_chance, hit_chance, outcome_odds, FieldView, CRIT_DENOMINATOR,
    HIT_DENOMINATOR,
};
use crate::battle::state::{opponent_of, BattleEvent, BattleState, TurnRng};
use crate::battle::stats::speed_in_weather;
use crate::battle::BattleContext;
use crate::errors::{SimulationError, SimulationResult};
use crate::player::Action;
use crate::pokemon::StatusCondition;
use schema::{
    MoveData, MoveTarget, PokemonType, SideConditionKind, StatChange, StatusEffect, StatusKind,
    Weather,
};
use tracing::trace;

/// How one side's move turned out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    Miss,
    Hit,
    Crit,
}

/// How chance is resolved while simulating a turn.
pub enum Resolution<'a> {
    /// Accuracy- and crit-weighted mean damage; secondary effects only when certain.
    Expected,
    /// The outcome of each side's move is pinned, damage is the band midpoint.
    Forced([HitOutcome; 2]),
    /// Every roll is drawn from the generator.
    Rolled(&'a mut TurnRng),
}

impl Resolution<'_> {
    fn roll_below(&mut self, reason: &str, bound: u32) -> Option<u32> {
        match self {
            Resolution::Rolled(rng) => Some(rng.next_below(reason, bound)),
            _ => None,
        }
    }

    /// Whether an effect with a percent `chance` fires.
    fn chance_fires(&mut self, reason: &str, chance: u8) -> bool {
        match self.roll_below(reason, 100) {
            Some(roll) => roll < chance as u32,
            None => chance >= 100,
        }
    }
}

/// Clones `state` and resolves one turn on the copy.
pub fn simulate_turn(
    ctx: &BattleContext,
    state: &BattleState,
    actions: [Option<Action>; 2],
    resolution: &mut Resolution<'_>,
) -> SimulationResult<BattleState> {
    let mut next = state.clone();
    resolve_turn(ctx, &mut next, actions, resolution)?;
    Ok(next)
}

/// Rejects actions that reference unknown entities or anything unavailable.
pub fn validate_action(
    ctx: &BattleContext,
    state: &BattleState,
    side: usize,
    action: &Action,
) -> SimulationResult<()> {
    let player = &state.sides[side];
    match action {
        Action::UseMove { id, .. } => {
            ctx.move_data(id)?;
            let active = player
                .active()
                .ok_or(SimulationError::NoActiveCombatant(side))?;
            if active.is_fainted() {
                return Err(SimulationError::InvalidAction {
                    side,
                    reason: format!("{} has fainted", active.name),
                });
            }
            if !active.knows(id) {
                return Err(SimulationError::InvalidAction {
                    side,
                    reason: format!("{} does not know {}", active.name, id),
                });
            }
        }
        Action::SwitchTo { slot } => {
            let target = player.roster.get(*slot).ok_or_else(|| SimulationError::InvalidAction {
                side,
                reason: format!("no roster slot {}", slot),
            })?;
            if *slot == player.active {
                return Err(SimulationError::InvalidAction {
                    side,
                    reason: format!("{} is already active", target.name),
                });
            }
            if target.is_fainted() {
                return Err(SimulationError::InvalidAction {
                    side,
                    reason: format!("{} has fainted", target.name),
                });
            }
        }
    }
    Ok(())
}

/// Resolves one full turn in place. Either action may be `None` when that
/// side cannot act. Nothing is mutated if validation fails.
pub fn resolve_turn(
    ctx: &BattleContext,
    state: &mut BattleState,
    actions: [Option<Action>; 2],
    resolution: &mut Resolution<'_>,
) -> SimulationResult<()> {
    for (side, action) in actions.iter().enumerate() {
        if let Some(action) = action {
            validate_action(ctx, state, side, action)?;
        }
    }
    if state.is_terminal() {
        return Ok(());
    }

    state.turn += 1;
    state.log.push(BattleEvent::TurnStarted { turn: state.turn });

    for (side, action) in actions.iter().enumerate() {
        if let Some(Action::SwitchTo { slot }) = action {
            execute_switch(ctx, state, side, *slot);
        }
    }

    let mut movers = Vec::with_capacity(2);
    for (side, action) in actions.iter().enumerate() {
        if let Some(Action::UseMove { id, .. }) = action {
            movers.push((side, ctx.move_data(id)?));
        }
    }

    let mut pending_heals = Vec::new();
    for (side, move_data) in determine_move_order(ctx, state, &movers) {
        if state.sides[side].active_is_fainted() {
            continue;
        }
        if execute_move(ctx, state, side, move_data, resolution) && move_data.heal > 0.0 {
            pending_heals.push((side, move_data.heal));
        }
    }

    for (side, fraction) in pending_heals {
        apply_heal(state, side, fraction);
    }

    execute_end_turn_phase(ctx, state);
    check_win_conditions(state);
    Ok(())
}

/// Brings in replacements for fainted actives between turns. Only switches
/// are accepted, and no end-of-turn effects run.
pub fn resolve_replacements(
    ctx: &BattleContext,
    state: &mut BattleState,
    actions: [Option<Action>; 2],
) -> SimulationResult<()> {
    for (side, action) in actions.iter().enumerate() {
        match action {
            Some(action @ Action::SwitchTo { .. }) => validate_action(ctx, state, side, action)?,
            Some(other) => {
                return Err(SimulationError::InvalidAction {
                    side,
                    reason: format!("only switches are allowed between turns, got {}", other),
                })
            }
            None => {}
        }
    }
    for (side, action) in actions.iter().enumerate() {
        if let Some(Action::SwitchTo { slot }) = action {
            execute_switch(ctx, state, side, *slot);
        }
    }
    check_win_conditions(state);
    Ok(())
}

/// Orders move users: priority first, then effective speed. On a full tie the
/// opponent (side 1) moves first, every time.
pub fn determine_move_order<'m>(
    ctx: &BattleContext,
    state: &BattleState,
    movers: &[(usize, &'m MoveData)],
) -> Vec<(usize, &'m MoveData)> {
    let mut ordered: Vec<_> = movers
        .iter()
        .map(|&(side, move_data)| {
            let speed = state.sides[side]
                .active()
                .map_or(0, |active| speed_in_weather(ctx, active, state.field.weather));
            (side, move_data, speed)
        })
        .collect();

    ordered.sort_by(|a, b| {
        b.1.priority
            .cmp(&a.1.priority)
            .then_with(|| b.2.cmp(&a.2))
            .then_with(|| b.0.cmp(&a.0))
    });

    ordered
        .into_iter()
        .map(|(side, move_data, _)| (side, move_data))
        .collect()
}

fn execute_switch(ctx: &BattleContext, state: &mut BattleState, side: usize, slot: usize) {
    let player = &mut state.sides[side];
    if let Some(outgoing) = player.active_mut() {
        outgoing.on_switch_out();
    }
    player.active = slot;

    let Some(incoming) = player.active_mut() else {
        return;
    };
    incoming.revealed = true;
    let event = BattleEvent::Switched {
        side,
        species: incoming.name.clone(),
        hp: incoming.current_hp,
        max_hp: incoming.max_hp(),
    };
    state.log.push(event);
    apply_entry_hazards(ctx, state, side);
}

fn apply_entry_hazards(ctx: &BattleContext, state: &mut BattleState, side: usize) {
    let conditions = state.sides[side].conditions;
    let Some(incoming) = state.sides[side].active_mut() else {
        return;
    };
    let max_hp = incoming.max_hp() as f64;
    let mut hits = Vec::new();

    if conditions.stealth_rock {
        let effectiveness = ctx.chart.effectiveness(PokemonType::Rock, &incoming.types);
        hits.push(("Stealth Rock", (max_hp * effectiveness / 8.0) as u16));
    }

    let grounded = !incoming.has_type(PokemonType::Flying)
        && !incoming.has_ability("levitate")
        && !incoming.holds("airballoon");
    if conditions.spikes > 0 && grounded {
        let divisor = match conditions.spikes {
            1 => 8.0,
            2 => 6.0,
            _ => 4.0,
        };
        hits.push(("Spikes", (max_hp / divisor) as u16));
    }

    for (source, damage) in hits {
        apply_residual(state, side, source, damage.max(1));
    }
}

/// Checks sleep, freeze and full paralysis. Returns whether the user may act.
fn check_action_preventing_conditions(
    ctx: &BattleContext,
    state: &mut BattleState,
    side: usize,
    resolution: &mut Resolution<'_>,
) -> bool {
    let ruleset = &ctx.ruleset;
    let Some(user) = state.sides[side].active_mut() else {
        return false;
    };
    let species = user.name.clone();

    match user.status {
        Some(StatusCondition::Sleep(0)) => {
            user.status = None;
            state.log.push(BattleEvent::StatusCured {
                side,
                species,
                status: StatusKind::Sleep,
            });
            !ruleset.waking_consumes_turn
        }
        Some(StatusCondition::Sleep(turns)) => {
            user.status = Some(StatusCondition::Sleep(turns - 1));
            state.log.push(BattleEvent::PreventedFromActing {
                side,
                species,
                status: StatusKind::Sleep,
            });
            false
        }
        Some(StatusCondition::Freeze) => {
            let thawed = resolution
                .roll_below("thaw", 100)
                .is_some_and(|roll| roll < ruleset.thaw_chance as u32);
            if thawed {
                user.status = None;
                state.log.push(BattleEvent::StatusCured {
                    side,
                    species,
                    status: StatusKind::Freeze,
                });
                true
            } else {
                state.log.push(BattleEvent::PreventedFromActing {
                    side,
                    species,
                    status: StatusKind::Freeze,
                });
                false
            }
        }
        Some(StatusCondition::Paralysis) => {
            let fully_paralyzed = resolution
                .roll_below("full paralysis", 100)
                .is_some_and(|roll| roll < ruleset.full_paralysis_chance as u32);
            if fully_paralyzed {
                state.log.push(BattleEvent::PreventedFromActing {
                    side,
                    species,
                    status: StatusKind::Paralysis,
                });
            }
            !fully_paralyzed
        }
        _ => true,
    }
}

/// Runs one side's move. Returns whether the move was executed and connected.
fn execute_move(
    ctx: &BattleContext,
    state: &mut BattleState,
    side: usize,
    move_data: &MoveData,
    resolution: &mut Resolution<'_>,
) -> bool {
    if !check_action_preventing_conditions(ctx, state, side, resolution) {
        return false;
    }

    let foe = opponent_of(side);
    let Some(user) = state.sides[side].active() else {
        return false;
    };
    let user_name = user.name.clone();
    state.log.push(BattleEvent::MoveUsed {
        side,
        species: user_name.clone(),
        move_name: move_data.name.clone(),
    });

    let targets_foe = move_data.target == MoveTarget::Opponent;
    if targets_foe && state.sides[foe].active_is_fainted() {
        state.log.push(BattleEvent::MoveFailed {
            side,
            species: user_name,
        });
        return false;
    }

    let (Some(attacker), Some(defender)) = (state.sides[side].active(), state.sides[foe].active())
    else {
        return false;
    };

    let odds = outcome_odds(ctx, attacker, defender, move_data);
    let field = FieldView::against(state, foe);

    // Expected mode prices misses into the damage mean, so only the move's
    // effects need a hit-or-miss verdict.
    let mut effects_land = true;
    let (connected, crit, damage) = match resolution {
        Resolution::Expected => {
            let damage = if move_data.is_damaging() {
                let normal = calculate_damage(ctx, attacker, defender, move_data, field, false);
                let crit = calculate_damage(ctx, attacker, defender, move_data, field, true);
                let mean = odds.p_hit() * normal.expected() + odds.p_crit() * crit.expected();
                mean.round() as u16
            } else {
                0
            };
            effects_land = !targets_foe || odds.p_connect() >= 0.5;
            (move_data.is_damaging() || effects_land, false, damage)
        }
        Resolution::Forced(outcomes) => match (targets_foe, outcomes[side]) {
            (true, HitOutcome::Miss) => (false, false, 0),
            (_, outcome) => {
                let crit = outcome == HitOutcome::Crit && move_data.is_damaging();
                let range = calculate_damage(ctx, attacker, defender, move_data, field, crit);
                (true, crit, range.midpoint())
            }
        },
        Resolution::Rolled(rng) => {
            let connects = !targets_foe
                || rng.next_below("accuracy", HIT_DENOMINATOR)
                    < hit_chance(ctx, attacker, defender, move_data);
            if connects {
                let crit = rng.next_below("critical hit", CRIT_DENOMINATOR)
                    < crit_chance(ctx, attacker, move_data);
                let range = calculate_damage(ctx, attacker, defender, move_data, field, crit);
                let band = ctx.ruleset.random_band;
                let roll = rng.next_in("damage roll", band.min..=band.max);
                (true, crit, range.sample(band, roll))
            } else {
                (false, false, 0)
            }
        }
    };

    if !connected {
        state.log.push(BattleEvent::MoveMissed {
            side,
            species: user_name,
        });
        return false;
    }

    if crit {
        state.log.push(BattleEvent::CriticalHit);
    }
    if move_data.is_damaging() {
        let defender_types = state.sides[foe]
            .active()
            .map(|d| d.types.clone())
            .unwrap_or_default();
        let multiplier = ctx.chart.effectiveness(move_data.move_type, &defender_types);
        state.log.push(BattleEvent::Effectiveness { multiplier });
        if multiplier == 0.0 {
            return false;
        }
        apply_damage(state, foe, damage);
    }
    if !effects_land {
        return true;
    }

    if let Some(effect) = move_data.status {
        try_inflict_status(ctx, state, foe, move_data, effect, resolution);
    }
    for change in &move_data.stat_changes {
        apply_stat_change(state, side, change, resolution);
    }
    if let Some(condition) = move_data.side_condition {
        apply_side_condition(ctx, state, side, condition);
    }
    if let Some(weather) = move_data.weather {
        set_weather(ctx, state, weather);
    }
    true
}

fn apply_damage(state: &mut BattleState, side: usize, amount: u16) {
    let Some(target) = state.sides[side].active_mut() else {
        return;
    };
    let dealt = target.take_damage(amount);
    let species = target.name.clone();
    let remaining_hp = target.current_hp;
    let fainted = target.is_fainted();

    state.log.push(BattleEvent::DamageDealt {
        side,
        species: species.clone(),
        damage: dealt,
        remaining_hp,
    });
    if fainted {
        state.log.push(BattleEvent::Fainted { side, species });
    }
}

fn apply_residual(state: &mut BattleState, side: usize, source: &str, amount: u16) {
    let Some(target) = state.sides[side].active_mut() else {
        return;
    };
    if target.is_fainted() {
        return;
    }
    let dealt = target.take_damage(amount);
    let species = target.name.clone();
    let fainted = target.is_fainted();

    state.log.push(BattleEvent::ResidualDamage {
        side,
        species: species.clone(),
        source: source.to_string(),
        damage: dealt,
    });
    if fainted {
        state.log.push(BattleEvent::Fainted { side, species });
    }
}

fn apply_heal(state: &mut BattleState, side: usize, fraction: f64) {
    let Some(user) = state.sides[side].active_mut() else {
        return;
    };
    let amount = (user.max_hp() as f64 * fraction) as u16;
    let healed = user.heal(amount);
    if healed > 0 {
        let event = BattleEvent::Healed {
            side,
            species: user.name.clone(),
            amount: healed,
            new_hp: user.current_hp,
        };
        state.log.push(event);
    }
}

fn status_blocked_by_type(kind: StatusKind, types: &[PokemonType]) -> bool {
    let has = |t: PokemonType| types.contains(&t);
    match kind {
        StatusKind::Burn => has(PokemonType::Fire),
        StatusKind::Paralysis => has(PokemonType::Electric),
        StatusKind::Freeze => has(PokemonType::Ice),
        StatusKind::Poison | StatusKind::Toxic => has(PokemonType::Poison) || has(PokemonType::Steel),
        StatusKind::Sleep => false,
    }
}

fn try_inflict_status(
    ctx: &BattleContext,
    state: &mut BattleState,
    target_side: usize,
    move_data: &MoveData,
    effect: StatusEffect,
    resolution: &mut Resolution<'_>,
) {
    let pure_status = move_data.category == schema::MoveCategory::Status;
    let Some(target) = state.sides[target_side].active() else {
        return;
    };
    if target.is_fainted() {
        return;
    }

    let immune = status_blocked_by_type(effect.kind, &target.types)
        || (pure_status && ctx.chart.effectiveness(move_data.move_type, &target.types) == 0.0);
    if target.status.is_some() || immune {
        if pure_status {
            let user_side = opponent_of(target_side);
            let species = state.sides[user_side]
                .active()
                .map(|user| user.name.clone())
                .unwrap_or_default();
            state.log.push(BattleEvent::MoveFailed {
                side: user_side,
                species,
            });
        }
        return;
    }

    if !resolution.chance_fires("secondary status", effect.chance) {
        return;
    }

    let (min_sleep, max_sleep) = ctx.ruleset.sleep_turns;
    let status = match effect.kind {
        StatusKind::Burn => StatusCondition::Burn,
        StatusKind::Paralysis => StatusCondition::Paralysis,
        StatusKind::Freeze => StatusCondition::Freeze,
        StatusKind::Poison => StatusCondition::Poison,
        StatusKind::Toxic => StatusCondition::Toxic(1),
        StatusKind::Sleep => {
            let turns = match resolution {
                Resolution::Rolled(rng) => {
                    rng.next_in("sleep turns", min_sleep as u32..=max_sleep as u32) as u8
                }
                _ => ((min_sleep as u16 + max_sleep as u16 + 1) / 2) as u8,
            };
            StatusCondition::Sleep(turns)
        }
    };

    if let Some(target) = state.sides[target_side].active_mut() {
        target.status = Some(status);
        let species = target.name.clone();
        state.log.push(BattleEvent::StatusApplied {
            side: target_side,
            species,
            status: effect.kind,
        });
    }
}

fn apply_stat_change(
    state: &mut BattleState,
    user_side: usize,
    change: &StatChange,
    resolution: &mut Resolution<'_>,
) {
    let side = match change.target {
        MoveTarget::User => user_side,
        MoveTarget::Opponent => opponent_of(user_side),
    };
    if !resolution.chance_fires("stat change", change.chance) {
        return;
    }
    let Some(target) = state.sides[side].active_mut() else {
        return;
    };
    if target.is_fainted() {
        return;
    }
    let moved = target.boosts.apply(change.stat, change.stages);
    let species = target.name.clone();
    state.log.push(BattleEvent::StatChanged {
        side,
        species,
        stat: change.stat,
        stages: moved,
    });
}

fn apply_side_condition(
    ctx: &BattleContext,
    state: &mut BattleState,
    user_side: usize,
    condition: SideConditionKind,
) {
    let side = if condition.lands_on_user_side() {
        user_side
    } else {
        opponent_of(user_side)
    };
    let turns = ctx.ruleset.screen_turns;
    let conditions = &mut state.sides[side].conditions;
    let applied = match condition {
        SideConditionKind::Reflect if conditions.reflect == 0 => {
            conditions.reflect = turns;
            true
        }
        SideConditionKind::LightScreen if conditions.light_screen == 0 => {
            conditions.light_screen = turns;
            true
        }
        SideConditionKind::StealthRock if !conditions.stealth_rock => {
            conditions.stealth_rock = true;
            true
        }
        SideConditionKind::Spikes if conditions.spikes < 3 => {
            conditions.spikes += 1;
            true
        }
        _ => false,
    };
    if applied {
        state.log.push(BattleEvent::SideConditionSet { side, condition });
    }
}

fn set_weather(ctx: &BattleContext, state: &mut BattleState, weather: Weather) {
    if state.field.weather == weather {
        return;
    }
    state.field.weather = weather;
    state.field.weather_turns = ctx.ruleset.weather_turns;
    state.log.push(BattleEvent::WeatherStarted { weather });
}

/// Residual status damage, sandstorm chip, then screen and weather counters.
pub fn execute_end_turn_phase(ctx: &BattleContext, state: &mut BattleState) {
    let ruleset = &ctx.ruleset;

    for side in 0..2 {
        let Some(active) = state.sides[side].active_mut() else {
            continue;
        };
        if active.is_fainted() {
            continue;
        }
        let max_hp = active.max_hp() as u32;
        let residual = match active.status {
            Some(StatusCondition::Burn) => {
                Some(("burn", max_hp / ruleset.burn_residual.max(1) as u32))
            }
            Some(StatusCondition::Poison) => {
                Some(("poison", max_hp / ruleset.poison_residual.max(1) as u32))
            }
            Some(StatusCondition::Toxic(counter)) => {
                active.status = Some(StatusCondition::Toxic((counter + 1).min(15)));
                Some(("poison", max_hp * counter as u32 / 16))
            }
            _ => None,
        };
        if let Some((source, amount)) = residual {
            apply_residual(state, side, source, (amount as u16).max(1));
        }

        if state.field.weather == Weather::Sand {
            let Some(active) = state.sides[side].active() else {
                continue;
            };
            let sheltered = [PokemonType::Rock, PokemonType::Ground, PokemonType::Steel]
                .iter()
                .any(|t| active.has_type(*t));
            if !sheltered {
                let chip = (active.max_hp() / 16).max(1);
                apply_residual(state, side, "the sandstorm", chip);
            }
        }
    }

    for side in 0..2 {
        let conditions = &mut state.sides[side].conditions;
        let mut ended = Vec::new();
        if conditions.reflect > 0 {
            conditions.reflect -= 1;
            if conditions.reflect == 0 {
                ended.push(SideConditionKind::Reflect);
            }
        }
        if conditions.light_screen > 0 {
            conditions.light_screen -= 1;
            if conditions.light_screen == 0 {
                ended.push(SideConditionKind::LightScreen);
            }
        }
        for condition in ended {
            state.log.push(BattleEvent::SideConditionEnded { side, condition });
        }
    }

    if state.field.weather != Weather::Clear {
        state.field.weather_turns = state.field.weather_turns.saturating_sub(1);
        if state.field.weather_turns == 0 {
            let weather = state.field.weather;
            state.field.weather = Weather::Clear;
            state.log.push(BattleEvent::WeatherEnded { weather });
        }
    }
}

fn check_win_conditions(state: &mut BattleState) {
    if state.refresh_game_state() {
        let winner = state.winner();
        trace!(?winner, turn = state.turn, "battle ended");
        state.log.push(BattleEvent::BattleEnded { winner });
    }
}
