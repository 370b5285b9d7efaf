//! Fast, search-free judgements: which known move ends a fight soonest and
//! how favorable one combatant is against another.

use crate::ai::config::AgentConfig;
use crate::battle::damage::{calculate_damage, expected_damage, FieldView};
use crate::battle::state::{opponent_of, BattleState};
use crate::battle::stats::effective_speed;
use crate::battle::BattleContext;
use crate::player::{Action, Side};
use crate::pokemon::Combatant;
use schema::{MoveData, MoveId, MoveTarget, PokemonType};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct MoveChoice {
    pub id: MoveId,
    /// Expected turns until the defender faints. Infinite for moves that
    /// cannot bring it down.
    pub turns_to_faint: f64,
    pub expected_damage: f64,
}

impl MoveChoice {
    pub fn action(&self) -> Action {
        Action::UseMove {
            id: self.id.clone(),
            target: None,
        }
    }
}

pub fn turns_to_faint(hp: u16, damage: f64) -> f64 {
    if hp == 0 {
        0.0
    } else if damage <= 0.0 {
        f64::INFINITY
    } else {
        hp as f64 / damage
    }
}

fn known_moves<'c, 'm>(
    ctx: &'c BattleContext,
    moves: impl IntoIterator<Item = &'m MoveId>,
) -> Vec<&'c MoveData> {
    moves
        .into_iter()
        .filter_map(|id| match ctx.move_data(id) {
            Ok(data) => Some(data),
            Err(err) => {
                debug!(%id, %err, "skipping unresolvable move");
                None
            }
        })
        .collect()
}

/// Best purely damaging option, first wins ties.
fn best_damaging(
    ctx: &BattleContext,
    attacker: &Combatant,
    defender: &Combatant,
    moves: &[&MoveData],
    field: FieldView,
) -> Option<MoveChoice> {
    let mut best: Option<MoveChoice> = None;
    for move_data in moves.iter().filter(|m| m.is_damaging()) {
        let damage = expected_damage(ctx, attacker, defender, move_data, field);
        let turns = turns_to_faint(defender.current_hp, damage);
        if best.as_ref().map_or(true, |b| turns < b.turns_to_faint) {
            best = Some(MoveChoice {
                id: move_data.id.clone(),
                turns_to_faint: turns,
                expected_damage: damage,
            });
        }
    }
    best
}

/// Picks the move minimizing turns-to-faint against `defender`.
///
/// A self-boosting status move scores one turn (spent boosting) plus the
/// turns the boosted attacker's best damaging move would then need. Other
/// status moves never shorten the fight and score infinite. Ties go to the
/// move listed first.
pub fn best_move<'m>(
    ctx: &BattleContext,
    attacker: &Combatant,
    defender: &Combatant,
    moves: impl IntoIterator<Item = &'m MoveId>,
    field: FieldView,
) -> Option<MoveChoice> {
    let moves = known_moves(ctx, moves);
    let mut best: Option<MoveChoice> = None;

    for move_data in &moves {
        let choice = if move_data.is_damaging() {
            let damage = expected_damage(ctx, attacker, defender, move_data, field);
            MoveChoice {
                id: move_data.id.clone(),
                turns_to_faint: turns_to_faint(defender.current_hp, damage),
                expected_damage: damage,
            }
        } else {
            let boosts: Vec<_> = move_data.self_boosts().collect();
            let turns = if boosts.is_empty() {
                f64::INFINITY
            } else {
                let mut boosted = attacker.clone();
                for change in boosts {
                    boosted.boosts.apply(change.stat, change.stages);
                }
                best_damaging(ctx, &boosted, defender, &moves, field)
                    .map_or(f64::INFINITY, |follow_up| 1.0 + follow_up.turns_to_faint)
            };
            MoveChoice {
                id: move_data.id.clone(),
                turns_to_faint: turns,
                expected_damage: 0.0,
            }
        };

        if best
            .as_ref()
            .map_or(true, |b| choice.turns_to_faint < b.turns_to_faint)
        {
            best = Some(choice);
        }
    }
    best
}

/// `best_move` for the active combatant of `side` against the other active.
pub fn best_reply(ctx: &BattleContext, state: &BattleState, side: usize) -> Option<MoveChoice> {
    let attacker = state.sides[side].active_standing()?;
    let defender = state.sides[opponent_of(side)].active_standing()?;
    let field = FieldView::against(state, opponent_of(side));
    best_move(ctx, attacker, defender, attacker.move_ids(), field)
}

/// Maximum damage of `attacker`'s strongest known move, crit excluded.
pub fn strongest_hit(
    ctx: &BattleContext,
    attacker: &Combatant,
    defender: &Combatant,
    field: FieldView,
) -> u16 {
    known_moves(ctx, attacker.move_ids())
        .into_iter()
        .filter(|m| m.is_damaging() && m.target == MoveTarget::Opponent)
        .map(|m| calculate_damage(ctx, attacker, defender, m, field, false).max)
        .max()
        .unwrap_or(0)
}

fn attack_types(ctx: &BattleContext, combatant: &Combatant) -> Vec<PokemonType> {
    let mut types = combatant.types.clone();
    for move_data in known_moves(ctx, combatant.move_ids()) {
        if move_data.is_damaging() && !types.contains(&move_data.move_type) {
            types.push(move_data.move_type);
        }
    }
    types
}

fn best_effectiveness(ctx: &BattleContext, attacker: &Combatant, defender: &Combatant) -> f64 {
    attack_types(ctx, attacker)
        .into_iter()
        .map(|t| ctx.chart.effectiveness(t, &defender.types))
        .fold(0.0, f64::max)
}

/// Coarse favorability of `mine` facing `theirs`; higher is better for `mine`.
///
/// Best offensive effectiveness minus best defensive effectiveness (over
/// own types and known damaging move types), a speed-tier term and an
/// HP-fraction term.
pub fn matchup_score(
    ctx: &BattleContext,
    config: &AgentConfig,
    mine: &Combatant,
    theirs: &Combatant,
) -> f64 {
    let offense = best_effectiveness(ctx, mine, theirs);
    let defense = best_effectiveness(ctx, theirs, mine);

    let speed_term = match effective_speed(ctx, mine).cmp(&effective_speed(ctx, theirs)) {
        std::cmp::Ordering::Greater => config.speed_coefficient,
        std::cmp::Ordering::Less => -config.speed_coefficient,
        std::cmp::Ordering::Equal => 0.0,
    };
    let hp_term = config.hp_coefficient * (mine.hp_fraction() - theirs.hp_fraction());

    offense - defense + speed_term + hp_term
}

/// Bench slot of `side` with the best matchup against `foe`. Ties go to the
/// earlier slot; unseen and fainted slots are never considered.
pub fn best_switch_in(
    ctx: &BattleContext,
    config: &AgentConfig,
    side: &Side,
    foe: &Combatant,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for slot in side.switch_options() {
        let candidate = &side.roster[slot];
        let score = matchup_score(ctx, config, candidate, foe);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((slot, score));
        }
    }
    best.map(|(slot, _)| slot)
}
