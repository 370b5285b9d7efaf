use anyhow::{bail, Context, Result};
use pokemon_tactician::battle::state::opponent_of;
use pokemon_tactician::{
    resolve_replacements, resolve_turn, Agent, AgentConfig, BattleContext, BattleState, Combatant,
    Resolution, Side, Strategy, TurnRng,
};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const TURN_LIMIT: u32 = 100;

fn build_team(ctx: &BattleContext, members: &[(&str, &[&str])]) -> Result<Vec<Combatant>> {
    members
        .iter()
        .map(|(species, moves)| {
            Combatant::from_species(ctx, species, moves)
                .with_context(|| format!("building {}", species))
        })
        .collect()
}

fn print_status(state: &BattleState) {
    for side in &state.sides {
        if let Some(active) = side.active() {
            println!(
                "  {}: {} (HP: {}/{}){}",
                side.name,
                active.name,
                active.current_hp,
                active.max_hp(),
                active
                    .status
                    .as_ref()
                    .map(|status| format!(" [{}]", status))
                    .unwrap_or_default()
            );
        }
    }
}

fn flush_log(state: &mut BattleState) {
    for line in state.transcript() {
        println!("    {}", line);
    }
    state.log.clear();
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let ctx = BattleContext::classic()?;
    let config = AgentConfig::bundled()?;
    let seed = config.seed.unwrap_or(0);

    let red = build_team(
        &ctx,
        &[
            ("tauros", &["bodyslam", "hyperbeam", "earthquake", "blizzard"]),
            ("starmie", &["surf", "thunderbolt", "psychic", "recover"]),
            ("chansey", &["icebeam", "thunderwave", "softboiled", "thunderbolt"]),
        ],
    )?;
    let blue = build_team(
        &ctx,
        &[
            ("alakazam", &["psychic", "thunderwave", "recover", "reflect"]),
            ("snorlax", &["bodyslam", "earthquake", "hyperbeam", "amnesia"]),
            ("rhydon", &["earthquake", "rockslide", "bodyslam", "swordsdance"]),
        ],
    )?;

    let mut state = BattleState::new(Side::new("Red", red), Side::new("Blue", blue))
        .with_log_capacity(config.log_capacity);
    let agents = [
        Agent::new(ctx.clone(), config.clone().with_strategy(Strategy::Expectimax)),
        Agent::new(ctx.clone(), config.clone().with_strategy(Strategy::Minimax)),
    ];
    let mut rng = TurnRng::seeded(seed);

    println!("=== Expectimax (Red) vs Minimax (Blue) ===");
    while !state.is_terminal() {
        if state.turn >= TURN_LIMIT {
            println!("Turn limit reached.");
            break;
        }
        print_status(&state);

        let mut actions = [None, None];
        for (side, agent) in agents.iter().enumerate() {
            let decision = agent.decide(&state, side).await?;
            println!(
                "  {} -> {} ({})",
                state.sides[side].name,
                decision.action,
                decision.tier
            );
            actions[side] = Some(decision.action);
        }
        resolve_turn(&ctx, &mut state, actions, &mut Resolution::Rolled(&mut rng))?;
        flush_log(&mut state);

        if state.is_terminal() {
            break;
        }
        let mut replacements = [None, None];
        for (side, agent) in agents.iter().enumerate() {
            if state.sides[side].active_is_fainted() {
                let decision = agent.decide(&state, side).await?;
                replacements[side] = Some(decision.action);
            }
        }
        if replacements.iter().any(Option::is_some) {
            resolve_replacements(&ctx, &mut state, replacements)?;
            flush_log(&mut state);
        }
        for side in 0..2 {
            if state.sides[side].active_is_fainted() && state.sides[side].has_usable() {
                bail!(
                    "{} has no active combatant facing {}",
                    state.sides[side].name,
                    state.sides[opponent_of(side)].name
                );
            }
        }
    }

    match state.winner() {
        Some(side) => println!("{} wins after {} turns!", state.sides[side].name, state.turn),
        None if state.is_terminal() => println!("The battle ended in a draw."),
        None => println!("No result after {} turns.", state.turn),
    }
    info!(turns = state.turn, "battle finished");
    Ok(())
}
