mod common;

use chrono::Duration;
use common::*;
use peezme_core::{GameEngine, GameRules, HazardMap, LeaveOutcome};
use peezme_types::{GameError, GameStatus, PlayDirection};

#[test]
fn test_start_game() {
    let dictionary = create_test_dictionary();
    let rules = test_rules();
    let engine = GameEngine::new(&rules, &dictionary);

    let game = start_test_game(&engine, &["a", "b", "c"], &TARGET_WORDS);
    assert_eq!(game.status, GameStatus::AwaitingFirstPlay);
    assert_eq!(game.play_index, 0);
    assert_eq!(game.player_turn_id, "a");
    assert_eq!(game.play_direction, PlayDirection::Forward);
    assert_eq!(game.word, "house");
    assert_eq!(game.definition, "A building");
    assert!(game.missing_letter_index < 5);
    assert_eq!(game.word_pool.len(), 5);
    assert_eq!(game.barriers, vec![BARRIER]);
    assert_eq!(game.round_time, 30);
    assert!(game.scores.values().all(|&s| s == 0));
}

#[test]
fn test_start_game_needs_players_and_words() {
    let dictionary = create_test_dictionary();
    let rules = test_rules();
    let engine = GameEngine::new(&rules, &dictionary);

    let err = engine
        .start_game(&create_test_match(&[]), vec!["house".into()], None, t0(), &mut seeded_rng())
        .unwrap_err();
    assert_eq!(err, GameError::NotEnoughPlayers);

    let err = engine
        .start_game(&create_test_match(&["a"]), vec![], None, t0(), &mut seeded_rng())
        .unwrap_err();
    assert_eq!(err, GameError::EmptyWordPool);
}

#[test]
fn test_generated_hazards_are_disjoint() {
    let dictionary = create_test_dictionary();
    let rules = test_rules();
    let engine = GameEngine::new(&rules, &dictionary);

    let game = engine
        .start_game(
            &create_test_match(&["a", "b"]),
            vec!["house".into()],
            None,
            t0(),
            &mut seeded_rng(),
        )
        .unwrap();
    assert!(HazardMap::new(&game.barriers, &game.obstacles, &game.rewards).is_ok());
    assert_eq!(game.barriers.len(), rules.hazard_counts.barriers);
}

#[test]
fn test_turn_rotation_after_n_plays() {
    let dictionary = create_test_dictionary();
    let rules = test_rules();
    let engine = GameEngine::new(&rules, &dictionary);
    let mut game = start_test_game(&engine, &["a", "b", "c"], &TARGET_WORDS);

    for n in 1..=4u32 {
        play_turn(&engine, &mut game, "cat");
        assert_eq!(game.play_index, n);
        let expected = &game.players[(n as usize) % 3].id;
        assert_eq!(&game.player_turn_id, expected);
    }
    assert_eq!(game.status, GameStatus::InProgress);
    assert_eq!(game.plays.len(), 4);
    assert_eq!(game.word, "loose");
}

#[test]
fn test_accepted_play_response() {
    let dictionary = create_test_dictionary();
    let rules = test_rules();
    let engine = GameEngine::new(&rules, &dictionary);
    let mut game = start_test_game(&engine, &["a", "b"], &TARGET_WORDS);

    let play = play_for(&game, "a", "CAT", OPEN_TILE);
    let outcome = engine
        .submit_play(&mut game, "a", play, t0(), &mut seeded_rng())
        .unwrap();

    assert!(outcome.response.word_is_good);
    assert_eq!(outcome.response.score, 3);
    assert_eq!(outcome.response.play_index, 1);
    assert_eq!(outcome.response.player_turn_id, "b");
    assert_eq!(outcome.response.leader_id.as_deref(), Some("a"));
    assert_eq!(outcome.response.definition, "A small feline");
    assert!(!outcome.response.game_over);
    assert!(outcome.standings.is_none());

    assert_eq!(outcome.play.word, "cat");
    assert_eq!(outcome.play.play_index, 0);
    assert!(!outcome.play.id.is_empty());
    assert!(outcome.play.tile_locations.iter().all(|t| t.user_id == "a"));
    assert_eq!(game.plays.get(&outcome.play.id), Some(&outcome.play));
    assert_eq!(game.score_of("a"), 3);
}

#[test]
fn test_wrong_player_and_stale_index() {
    let dictionary = create_test_dictionary();
    let rules = test_rules();
    let engine = GameEngine::new(&rules, &dictionary);
    let mut game = start_test_game(&engine, &["a", "b"], &TARGET_WORDS);

    let play = play_for(&game, "b", "cat", OPEN_TILE);
    let err = engine
        .submit_play(&mut game, "b", play, t0(), &mut seeded_rng())
        .unwrap_err();
    assert_eq!(
        err,
        GameError::NotYourTurn {
            user_id: "b".into(),
            turn_holder: "a".into()
        }
    );

    let mut play = play_for(&game, "a", "cat", OPEN_TILE);
    play.play_index = 3;
    let err = engine
        .submit_play(&mut game, "a", play, t0(), &mut seeded_rng())
        .unwrap_err();
    assert_eq!(
        err,
        GameError::StalePlay {
            expected: 0,
            received: 3
        }
    );

    let play = play_for(&game, "zed", "cat", OPEN_TILE);
    let err = engine
        .submit_play(&mut game, "zed", play, t0(), &mut seeded_rng())
        .unwrap_err();
    assert!(matches!(err, GameError::NotParticipant { .. }));
}

#[test]
fn test_round_expired_at_31_seconds() {
    let dictionary = create_test_dictionary();
    let rules = test_rules();
    let engine = GameEngine::new(&rules, &dictionary);
    let mut game = start_test_game(&engine, &["a", "b"], &TARGET_WORDS);

    let play = play_for(&game, "a", "cat", OPEN_TILE);
    let err = engine
        .submit_play(
            &mut game,
            "a",
            play.clone(),
            t0() + Duration::seconds(31),
            &mut seeded_rng(),
        )
        .unwrap_err();
    assert_eq!(
        err,
        GameError::RoundExpired {
            elapsed_secs: 31,
            round_time: 30
        }
    );
    assert_eq!(game.play_index, 0);

    // Exactly on the limit still counts
    engine
        .submit_play(
            &mut game,
            "a",
            play,
            t0() + Duration::seconds(30),
            &mut seeded_rng(),
        )
        .unwrap();
    assert_eq!(game.play_index, 1);
}

#[test]
fn test_barrier_rejection_leaves_state_unchanged() {
    let dictionary = create_test_dictionary();
    let rules = test_rules();
    let engine = GameEngine::new(&rules, &dictionary);
    let mut game = start_test_game(&engine, &["a", "b"], &TARGET_WORDS);
    let before = game.clone();

    let play = play_for(&game, "a", "cat", BARRIER);
    let err = engine
        .submit_play(&mut game, "a", play, t0(), &mut seeded_rng())
        .unwrap_err();
    assert_eq!(err, GameError::BlockedByBarrier { index: BARRIER });
    assert!(err.is_recoverable());
    assert_eq!(game, before);
}

#[test]
fn test_invalid_word_does_not_advance() {
    let dictionary = create_test_dictionary();
    let rules = test_rules();
    let engine = GameEngine::new(&rules, &dictionary);
    let mut game = start_test_game(&engine, &["a", "b"], &TARGET_WORDS);
    let before = game.clone();

    let play = play_for(&game, "a", "tca", OPEN_TILE);
    let err = engine
        .submit_play(&mut game, "a", play, t0(), &mut seeded_rng())
        .unwrap_err();
    assert_eq!(err, GameError::InvalidWord { word: "tca".into() });
    assert_eq!(game, before);

    // The same player may retry within the round
    play_turn(&engine, &mut game, "act");
    assert_eq!(game.play_index, 1);
}

#[test]
fn test_placement_validation() {
    let dictionary = create_test_dictionary();
    let rules = test_rules();
    let engine = GameEngine::new(&rules, &dictionary);
    let mut game = start_test_game(&engine, &["a", "b"], &TARGET_WORDS);
    let before = game.clone();

    let off_board = play_for(&game, "a", "cat", 24);
    let mut duplicate = play_for(&game, "a", "cat", OPEN_TILE);
    duplicate.tile_locations[2].index = OPEN_TILE;
    let mut misspelled = play_for(&game, "a", "cat", OPEN_TILE);
    misspelled.word = "act".into();
    let mut two_letters = play_for(&game, "a", "cat", OPEN_TILE);
    two_letters.tile_locations[0].letter = "ca".into();
    let mut other_game = play_for(&game, "a", "cat", OPEN_TILE);
    other_game.game_id = "elsewhere".into();

    for play in [off_board, duplicate, misspelled, two_letters, other_game] {
        let err = engine
            .submit_play(&mut game, "a", play, t0(), &mut seeded_rng())
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidPlay { .. }), "{err:?}");
    }
    assert_eq!(game, before);
}

#[test]
fn test_hazard_scoring_and_direction_flip() {
    let dictionary = create_test_dictionary();
    let rules = test_rules();
    let engine = GameEngine::new(&rules, &dictionary);
    let mut game = start_test_game(&engine, &["a", "b", "c"], &TARGET_WORDS);

    // a: plain play, 3 points, leads from play 0
    play_turn(&engine, &mut game, "cat");
    assert_eq!(game.player_turn_id, "b");

    // b: obstacle tile costs 2
    let play = play_for(&game, "b", "bat", OBSTACLE);
    let outcome = engine
        .submit_play(&mut game, "b", play, t0(), &mut seeded_rng())
        .unwrap();
    assert_eq!(outcome.play.score, 1);
    assert_eq!(game.leader_id.as_deref(), Some("a"));
    assert_eq!(game.player_turn_id, "c");

    // c: touches the reward tile, scores 6, takes the lead and reverses play
    let play = play_for(&game, "c", "tab", REWARD);
    let outcome = engine
        .submit_play(&mut game, "c", play, t0(), &mut seeded_rng())
        .unwrap();
    assert_eq!(outcome.play.score, 6);
    assert_eq!(outcome.play.play_direction, PlayDirection::Forward);
    assert_eq!(game.play_direction, PlayDirection::Reverse);
    assert_eq!(game.leader_id.as_deref(), Some("c"));
    assert_eq!(game.leader_since.get("c"), Some(&2));
    assert_eq!(game.player_turn_id, "b");
}

#[test]
fn test_equal_score_does_not_take_lead() {
    let dictionary = create_test_dictionary();
    let rules = test_rules();
    let engine = GameEngine::new(&rules, &dictionary);
    let mut game = start_test_game(&engine, &["a", "b"], &TARGET_WORDS);

    play_turn(&engine, &mut game, "cat");
    play_turn(&engine, &mut game, "bat");
    assert_eq!(game.score_of("a"), game.score_of("b"));
    assert_eq!(game.leader_id.as_deref(), Some("a"));
    assert!(!game.leader_since.contains_key("b"));
}

#[test]
fn test_game_over_when_word_pool_exhausted() {
    let dictionary = create_test_dictionary();
    let rules = test_rules();
    let engine = GameEngine::new(&rules, &dictionary);
    let mut game = start_test_game(&engine, &["a", "b"], &["house", "mouse"]);

    play_turn(&engine, &mut game, "cat");
    let play = play_for(&game, "b", "tab", REWARD);
    let outcome = engine
        .submit_play(&mut game, "b", play, t0(), &mut seeded_rng())
        .unwrap();

    assert!(outcome.response.game_over);
    assert_eq!(game.status, GameStatus::GameOver);
    let standings = outcome.standings.unwrap();
    assert_eq!(standings[0].user_id, "b");
    assert_eq!(standings[0].score, 6);
    assert_eq!(standings[1].user_id, "a");

    let play = play_for(&game, &game.player_turn_id.clone(), "cat", OPEN_TILE);
    let holder = game.player_turn_id.clone();
    let err = engine
        .submit_play(&mut game, &holder, play, t0(), &mut seeded_rng())
        .unwrap_err();
    assert_eq!(err, GameError::GameAlreadyCompleted);
}

#[test]
fn test_game_over_on_thresholds() {
    let dictionary = create_test_dictionary();

    let rules = GameRules {
        max_plays: Some(2),
        ..test_rules()
    };
    let engine = GameEngine::new(&rules, &dictionary);
    let mut game = start_test_game(&engine, &["a", "b"], &TARGET_WORDS);
    play_turn(&engine, &mut game, "cat");
    assert!(!game.is_over());
    play_turn(&engine, &mut game, "cat");
    assert!(game.is_over());

    let rules = GameRules {
        target_score: Some(3),
        ..test_rules()
    };
    let engine = GameEngine::new(&rules, &dictionary);
    let mut game = start_test_game(&engine, &["a", "b"], &TARGET_WORDS);
    play_turn(&engine, &mut game, "cat");
    assert!(game.is_over());
}

#[test]
fn test_skip_expired_turn() {
    let dictionary = create_test_dictionary();
    let rules = test_rules();
    let engine = GameEngine::new(&rules, &dictionary);
    let mut game = start_test_game(&engine, &["a", "b"], &TARGET_WORDS);

    assert!(!engine.skip_expired_turn(&mut game, t0() + Duration::seconds(30)));
    let later = t0() + Duration::seconds(45);
    assert!(engine.skip_expired_turn(&mut game, later));
    assert_eq!(game.player_turn_id, "b");
    assert_eq!(game.play_index, 0);
    assert_eq!(game.turn_started_at, later);
}

#[test]
fn test_turn_holder_leaving_passes_turn() {
    let dictionary = create_test_dictionary();
    let rules = test_rules();
    let engine = GameEngine::new(&rules, &dictionary);
    let mut game = start_test_game(&engine, &["a", "b", "c"], &TARGET_WORDS);

    let outcome = engine.leave(&mut game, "a", t0()).unwrap();
    assert_eq!(
        outcome,
        LeaveOutcome::Continued {
            next_turn: "b".into()
        }
    );
    assert_eq!(game.players.len(), 2);
    assert!(!game.is_player("a"));

    // Someone else leaving keeps the turn where it is
    let outcome = engine.leave(&mut game, "c", t0()).unwrap();
    assert_eq!(
        outcome,
        LeaveOutcome::Continued {
            next_turn: "b".into()
        }
    );
}

#[test]
fn test_leader_leaving_hands_lead_to_next_best() {
    let dictionary = create_test_dictionary();
    let rules = test_rules();
    let engine = GameEngine::new(&rules, &dictionary);
    let mut game = start_test_game(&engine, &["a", "b", "c"], &TARGET_WORDS);

    let play = play_for(&game, "a", "cat", REWARD);
    engine
        .submit_play(&mut game, "a", play, t0(), &mut seeded_rng())
        .unwrap();
    // Reverse now, so c is next
    play_turn(&engine, &mut game, "act");
    assert_eq!(game.leader_id.as_deref(), Some("a"));

    engine.leave(&mut game, "a", t0()).unwrap();
    assert_eq!(game.leader_id.as_deref(), Some("c"));
}

#[test]
fn test_sole_player_delete_ends_game() {
    let dictionary = create_test_dictionary();
    let rules = test_rules();
    let engine = GameEngine::new(&rules, &dictionary);
    let mut game = start_test_game(&engine, &["a", "b"], &TARGET_WORDS);

    engine.leave(&mut game, "b", t0()).unwrap();
    let outcome = engine.leave(&mut game, "a", t0()).unwrap();
    match outcome {
        LeaveOutcome::GameOver { standings } => {
            assert_eq!(standings.len(), 1);
            assert_eq!(standings[0].user_id, "a");
        }
        other => panic!("expected game over, got {other:?}"),
    }
    assert_eq!(game.status, GameStatus::GameOver);
    assert_eq!(game.player_turn_id, "a");
}

#[test]
fn test_outsider_cannot_leave() {
    let dictionary = create_test_dictionary();
    let rules = test_rules();
    let engine = GameEngine::new(&rules, &dictionary);
    let mut game = start_test_game(&engine, &["a", "b"], &TARGET_WORDS);

    let err = engine.leave(&mut game, "zed", t0()).unwrap_err();
    assert_eq!(
        err,
        GameError::NotParticipant {
            user_id: "zed".into()
        }
    );
}
