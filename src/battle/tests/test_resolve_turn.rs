#[cfg(test)]
mod tests {
    use crate::battle::engine::{resolve_turn, simulate_turn, Resolution};
    use crate::battle::state::{BattleEvent, GameState};
    use crate::battle::tests::common::{
        assert_ok, create_team_battle, create_test_battle, events_matching, modern_context,
        move_order, TestCombatantBuilder,
    };
    use crate::errors::{DexError, SimulationError};
    use crate::player::Action;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_speed_tie_resolves_opponent_first() {
        // Arrange: identical combatants, identical moves
        let ctx = modern_context();
        let player = TestCombatantBuilder::new("tauros")
            .with_moves(&["bodyslam"])
            .build(&ctx);
        let opponent = TestCombatantBuilder::new("tauros")
            .with_moves(&["bodyslam"])
            .build(&ctx);
        let state = create_test_battle(player, opponent);
        let actions = [
            Some(Action::use_move("bodyslam")),
            Some(Action::use_move("bodyslam")),
        ];

        // Act: resolve the same turn repeatedly
        for _ in 0..5 {
            let next = assert_ok(simulate_turn(
                &ctx,
                &state,
                actions.clone(),
                &mut Resolution::Expected,
            ));
            // Assert: the tie is broken the same way every time
            assert_eq!(move_order(&next), vec![1, 0]);
        }
    }

    #[test]
    fn test_faster_combatant_moves_first() {
        let ctx = modern_context();
        let jolteon = TestCombatantBuilder::new("jolteon")
            .with_moves(&["thunderbolt"])
            .build(&ctx);
        let snorlax = TestCombatantBuilder::new("snorlax")
            .with_moves(&["bodyslam"])
            .build(&ctx);
        let mut state = create_test_battle(jolteon, snorlax);

        assert_ok(resolve_turn(
            &ctx,
            &mut state,
            [
                Some(Action::use_move("thunderbolt")),
                Some(Action::use_move("bodyslam")),
            ],
            &mut Resolution::Expected,
        ));

        assert_eq!(move_order(&state), vec![0, 1]);
        assert_eq!(state.turn, 1);
    }

    #[test]
    fn test_priority_beats_speed() {
        let ctx = modern_context();
        let snorlax = TestCombatantBuilder::new("snorlax")
            .with_moves(&["quickattack"])
            .build(&ctx);
        let jolteon = TestCombatantBuilder::new("jolteon")
            .with_moves(&["thunderbolt"])
            .build(&ctx);
        let mut state = create_test_battle(snorlax, jolteon);

        assert_ok(resolve_turn(
            &ctx,
            &mut state,
            [
                Some(Action::use_move("quickattack")),
                Some(Action::use_move("thunderbolt")),
            ],
            &mut Resolution::Expected,
        ));

        assert_eq!(move_order(&state), vec![0, 1]);
    }

    #[test]
    fn test_fainted_combatant_does_not_move() {
        // Arrange: a faster attacker facing a nearly fainted defender
        let ctx = modern_context();
        let gyarados = TestCombatantBuilder::new("gyarados")
            .with_moves(&["crunch"])
            .with_hp(1)
            .build(&ctx);
        let jolteon = TestCombatantBuilder::new("jolteon")
            .with_moves(&["thunderbolt"])
            .build(&ctx);
        let mut state = create_test_battle(gyarados, jolteon);

        // Act
        assert_ok(resolve_turn(
            &ctx,
            &mut state,
            [
                Some(Action::use_move("crunch")),
                Some(Action::use_move("thunderbolt")),
            ],
            &mut Resolution::Expected,
        ));

        // Assert: only the faster side acted and the battle is over
        assert_eq!(move_order(&state), vec![1]);
        assert_eq!(state.game_state, GameState::Player2Win);
        assert_eq!(
            state.log.events().last(),
            Some(&BattleEvent::BattleEnded { winner: Some(1) })
        );
    }

    #[test]
    fn test_terminal_state_is_not_advanced() {
        let ctx = modern_context();
        let fainted = TestCombatantBuilder::new("pikachu")
            .with_moves(&["thunderbolt"])
            .with_hp(0)
            .build(&ctx);
        let snorlax = TestCombatantBuilder::new("snorlax")
            .with_moves(&["bodyslam"])
            .build(&ctx);
        let mut state = create_test_battle(fainted, snorlax);
        assert!(state.is_terminal());

        let before = state.clone();
        assert_ok(resolve_turn(
            &ctx,
            &mut state,
            [None, Some(Action::use_move("bodyslam"))],
            &mut Resolution::Expected,
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn test_simulation_leaves_the_input_untouched() {
        let ctx = modern_context();
        let player = TestCombatantBuilder::new("starmie")
            .with_moves(&["surf"])
            .build(&ctx);
        let opponent = TestCombatantBuilder::new("snorlax")
            .with_moves(&["bodyslam"])
            .build(&ctx);
        let state = create_test_battle(player, opponent);
        let before = state.clone();

        let next = assert_ok(simulate_turn(
            &ctx,
            &state,
            [
                Some(Action::use_move("surf")),
                Some(Action::use_move("bodyslam")),
            ],
            &mut Resolution::Expected,
        ));

        assert_eq!(state, before);
        assert_eq!(next.turn, 1);
        assert!(next.sides[0].roster[0].current_hp < before.sides[0].roster[0].current_hp);
        assert!(next.sides[1].roster[0].current_hp < before.sides[1].roster[0].current_hp);
    }

    #[test]
    fn test_invalid_actions_are_rejected_before_any_mutation() {
        let ctx = modern_context();
        let player = TestCombatantBuilder::new("starmie")
            .with_moves(&["surf"])
            .build(&ctx);
        let opponent = TestCombatantBuilder::new("snorlax")
            .with_moves(&["bodyslam"])
            .build(&ctx);
        let mut state = create_team_battle(
            vec![player],
            vec![opponent, TestCombatantBuilder::new("chansey").with_hp(0).build(&ctx)],
        );
        let before = state.clone();

        // Known to the dex but not to this combatant
        let result = resolve_turn(
            &ctx,
            &mut state,
            [Some(Action::use_move("thunderbolt")), None],
            &mut Resolution::Expected,
        );
        assert!(matches!(
            result,
            Err(SimulationError::InvalidAction { side: 0, .. })
        ));

        // Not in the dex at all
        let result = resolve_turn(
            &ctx,
            &mut state,
            [
                Some(Action::use_move("surf")),
                Some(Action::use_move("megapunch")),
            ],
            &mut Resolution::Expected,
        );
        assert!(matches!(
            result,
            Err(SimulationError::Dex(DexError::UnknownEntity { .. }))
        ));

        // Switching to a fainted slot
        let result = resolve_turn(
            &ctx,
            &mut state,
            [None, Some(Action::switch_to(1))],
            &mut Resolution::Expected,
        );
        assert!(matches!(
            result,
            Err(SimulationError::InvalidAction { side: 1, .. })
        ));

        assert_eq!(state, before);
    }

    #[test]
    fn test_heal_lands_after_all_damage() {
        // Arrange: the healer moves first, the hit lands afterwards
        let ctx = modern_context();
        let chansey = TestCombatantBuilder::new("chansey")
            .with_moves(&["softboiled"])
            .build(&ctx);
        let max_hp = chansey.max_hp();
        let chansey = TestCombatantBuilder::new("chansey")
            .with_moves(&["softboiled"])
            .with_hp(max_hp - 10)
            .build(&ctx);
        let snorlax = TestCombatantBuilder::new("snorlax")
            .with_moves(&["bodyslam"])
            .build(&ctx);
        let mut state = create_test_battle(chansey, snorlax);

        // Act
        assert_ok(resolve_turn(
            &ctx,
            &mut state,
            [
                Some(Action::use_move("softboiled")),
                Some(Action::use_move("bodyslam")),
            ],
            &mut Resolution::Expected,
        ));

        // Assert: damage first, then the heal, so the missing 10 HP do not cap it
        assert_eq!(move_order(&state), vec![0, 1]);
        let events: Vec<_> = state.log.events().collect();
        let damage_at = events
            .iter()
            .position(|e| matches!(e, BattleEvent::DamageDealt { side: 0, .. }))
            .unwrap();
        let heal_at = events
            .iter()
            .position(|e| matches!(e, BattleEvent::Healed { side: 0, .. }))
            .unwrap();
        assert!(damage_at < heal_at);

        let healed = events_matching(&state, |e| matches!(e, BattleEvent::Healed { .. }));
        let BattleEvent::Healed { amount, .. } = &healed[0] else {
            panic!("expected a heal event");
        };
        assert!(*amount > 10);
    }

    #[test]
    fn test_search_copy_records_no_history() {
        // Arrange: a battle with a turn already in its log
        let ctx = modern_context();
        let player = TestCombatantBuilder::new("tauros")
            .with_moves(&["bodyslam"])
            .build(&ctx);
        let opponent = TestCombatantBuilder::new("snorlax")
            .with_moves(&["bodyslam"])
            .build(&ctx);
        let mut state = create_test_battle(player, opponent);
        let actions = [
            Some(Action::use_move("bodyslam")),
            Some(Action::use_move("bodyslam")),
        ];
        assert_ok(resolve_turn(&ctx, &mut state, actions.clone(), &mut Resolution::Expected));
        assert!(!state.log.is_empty());

        // Act
        let copy = state.search_copy();
        let next = assert_ok(simulate_turn(&ctx, &copy, actions, &mut Resolution::Expected));

        // Assert: same position, no history carried or recorded
        assert_eq!(copy.sides, state.sides);
        assert_eq!(copy.turn, state.turn);
        assert!(copy.log.is_empty());
        assert!(next.log.is_empty());
        assert_eq!(next.turn, state.turn + 1);
    }
}
