#[cfg(test)]
mod tests {
    use crate::ai::config::AgentConfig;
    use crate::ai::evaluation::HeuristicEvaluator;
    use crate::ai::minimax::Minimax;
    use crate::ai::tests::common::{
        narrow_config, FailingEvaluator, FixedEvaluator, ScriptedProposer, SlowEvaluator,
    };
    use crate::battle::engine::{simulate_turn, Resolution};
    use crate::battle::state::BattleState;
    use crate::battle::tests::common::{
        create_team_battle, create_test_battle, modern_context, TestCombatantBuilder,
    };
    use crate::battle::BattleContext;
    use crate::player::{Action, ChosenAction};
    use pretty_assertions::assert_eq;
    use schema::SpeciesId;
    use crate::errors::EngineError;
    use std::time::{Duration, Instant};

    fn starmie_vs_snorlax(ctx: &BattleContext) -> BattleState {
        create_test_battle(
            TestCombatantBuilder::new("starmie")
                .with_moves(&["surf", "thunderbolt"])
                .build(ctx),
            TestCombatantBuilder::new("snorlax")
                .with_moves(&["bodyslam"])
                .build(ctx),
        )
    }

    fn expected_child(ctx: &BattleContext, state: &BattleState) -> BattleState {
        simulate_turn(
            ctx,
            state,
            [Some(Action::use_move("surf")), Some(Action::use_move("bodyslam"))],
            &mut Resolution::Expected,
        )
        .expect("both moves resolve")
    }

    #[tokio::test]
    async fn single_pair_returns_the_leaf_score() {
        // Arrange
        let ctx = modern_context();
        let config = narrow_config();
        let heuristic = HeuristicEvaluator::default();
        let evaluator = FixedEvaluator(73);
        let state = starmie_vs_snorlax(&ctx);

        // Act
        let outcome = Minimax::new(&ctx, &config, &evaluator, &heuristic)
            .search(&state, 0)
            .await
            .expect("search succeeds");

        // Assert
        assert_eq!(outcome.action, Action::use_move("surf"));
        assert_eq!(outcome.score, 73.0);
        assert!(!outcome.early_exit);
        assert_eq!(outcome.nodes, 2);
    }

    #[tokio::test]
    async fn failing_evaluator_falls_back_to_the_heuristic() {
        let ctx = modern_context();
        let config = narrow_config();
        let heuristic = HeuristicEvaluator::default();
        let state = starmie_vs_snorlax(&ctx);
        let expected = heuristic.score_state(&expected_child(&ctx, &state), 0) as f64;

        let outcome = Minimax::new(&ctx, &config, &FailingEvaluator, &heuristic)
            .search(&state, 0)
            .await
            .expect("search still succeeds");

        assert_eq!(outcome.score, expected);
    }

    #[tokio::test]
    async fn slow_evaluator_times_out_into_the_heuristic() {
        let ctx = modern_context();
        let config = AgentConfig {
            oracle_timeout_ms: 10,
            ..narrow_config()
        };
        let heuristic = HeuristicEvaluator::default();
        let evaluator = SlowEvaluator(Duration::from_secs(5));
        let state = starmie_vs_snorlax(&ctx);
        let expected = heuristic.score_state(&expected_child(&ctx, &state), 0) as f64;

        let outcome = Minimax::new(&ctx, &config, &evaluator, &heuristic)
            .search(&state, 0)
            .await
            .expect("search still succeeds");

        assert_eq!(outcome.score, expected);
    }

    #[tokio::test]
    async fn guaranteed_faster_kill_skips_the_tree() {
        // Arrange: Starmie outspeeds and Snorlax is on its last HP
        let ctx = modern_context();
        let config = AgentConfig {
            early_exit: true,
            ..narrow_config()
        };
        let heuristic = HeuristicEvaluator::default();
        let state = create_test_battle(
            TestCombatantBuilder::new("starmie")
                .with_moves(&["surf", "thunderbolt"])
                .build(&ctx),
            TestCombatantBuilder::new("snorlax")
                .with_moves(&["bodyslam"])
                .with_hp(1)
                .build(&ctx),
        );

        // Act
        let outcome = Minimax::new(&ctx, &config, &FailingEvaluator, &heuristic)
            .search(&state, 0)
            .await
            .expect("early exit succeeds");

        // Assert
        assert!(outcome.early_exit);
        assert_eq!(outcome.nodes, 0);
        assert_eq!(outcome.action, Action::use_move("surf"));
    }

    fn starmie_with_bench(ctx: &BattleContext) -> BattleState {
        create_team_battle(
            vec![
                TestCombatantBuilder::new("starmie")
                    .with_moves(&["surf", "thunderbolt"])
                    .build(ctx),
                TestCombatantBuilder::new("rhydon")
                    .with_moves(&["earthquake"])
                    .build(ctx),
                TestCombatantBuilder::new("lapras")
                    .with_moves(&["icebeam"])
                    .hidden()
                    .build(ctx),
            ],
            vec![TestCombatantBuilder::new("snorlax")
                .with_moves(&["bodyslam"])
                .build(ctx)],
        )
    }

    #[tokio::test]
    async fn proposed_actions_widen_the_root() {
        let ctx = modern_context();
        let config = AgentConfig {
            player_candidates: 2,
            ..narrow_config()
        };
        let heuristic = HeuristicEvaluator::default();
        let proposer = ScriptedProposer(vec![ChosenAction::Switch {
            species: SpeciesId::new("rhydon"),
        }]);
        let state = starmie_with_bench(&ctx);

        let outcome = Minimax::new(&ctx, &config, &FixedEvaluator(60), &heuristic)
            .with_proposer(Some(&proposer))
            .search(&state, 0)
            .await
            .expect("search succeeds");

        // root + two player labels against one reply each
        assert_eq!(outcome.nodes, 3);
        assert_eq!(outcome.action, Action::use_move("surf"));
    }

    #[tokio::test]
    async fn illegal_proposals_are_discarded() {
        let ctx = modern_context();
        let config = AgentConfig {
            player_candidates: 2,
            ..narrow_config()
        };
        let heuristic = HeuristicEvaluator::default();
        let proposer = ScriptedProposer(vec![
            ChosenAction::Switch {
                species: SpeciesId::new("lapras"),
            },
            ChosenAction::Move {
                id: schema::MoveId::new("hyperbeam"),
                target: None,
            },
        ]);
        let state = starmie_with_bench(&ctx);

        let outcome = Minimax::new(&ctx, &config, &FixedEvaluator(60), &heuristic)
            .with_proposer(Some(&proposer))
            .search(&state, 0)
            .await
            .expect("search succeeds");

        assert_eq!(outcome.nodes, 2);
    }

    #[tokio::test]
    async fn deeper_trees_settle_fainted_actives() {
        // Arrange: Surf knocks the slower Rhydon out on the first ply
        let ctx = modern_context();
        let config = AgentConfig {
            depth: 2,
            ..narrow_config()
        };
        let heuristic = HeuristicEvaluator::default();
        let state = create_team_battle(
            vec![TestCombatantBuilder::new("starmie")
                .with_moves(&["surf"])
                .build(&ctx)],
            vec![
                TestCombatantBuilder::new("rhydon")
                    .with_moves(&["earthquake"])
                    .with_hp(1)
                    .build(&ctx),
                TestCombatantBuilder::new("snorlax")
                    .with_moves(&["bodyslam"])
                    .build(&ctx),
            ],
        );
        let evaluator = FixedEvaluator(50);
        let minimax = Minimax::new(&ctx, &config, &evaluator, &heuristic);

        // Act
        let nodes = minimax.build_tree(&state, 0).await.expect("tree builds");

        // Assert
        let child = &nodes[nodes[0].children[0]];
        assert_eq!(child.state.sides[1].active, 1);
        assert!(!child.children.is_empty());
        assert!(nodes.iter().skip(1).all(|node| node.parent.is_some()));
    }

    #[tokio::test]
    async fn passed_deadline_abandons_the_tree() {
        let ctx = modern_context();
        let config = narrow_config();
        let heuristic = HeuristicEvaluator::default();
        let evaluator = FixedEvaluator(50);
        let state = starmie_vs_snorlax(&ctx);

        let result = Minimax::new(&ctx, &config, &evaluator, &heuristic)
            .with_deadline(Some(Instant::now()))
            .search(&state, 0)
            .await;

        assert!(matches!(result, Err(EngineError::DeadlineExceeded(_))));
    }
}
