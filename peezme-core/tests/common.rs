#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use peezme_core::{EventHandler, GameEngine, GameRules, HazardMap, WordValidator};
use peezme_types::{Game, Match, PeezMeEvent, Play, Privacy, TileLocation, User};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Mutex;

/// Hidden words never share a letter with the play words, so no play
/// picks up the missing-letter bonus by accident.
pub const TARGET_WORDS: [&str; 6] = ["house", "mouse", "horse", "noose", "loose", "goose"];

/// Board layout used by `start_test_game`.
pub const BARRIER: u32 = 0;
pub const OBSTACLE: u32 = 5;
pub const REWARD: u32 = 15;
pub const OPEN_TILE: u32 = 20;

pub fn create_test_dictionary() -> WordValidator {
    let word_list = "cat\tA small feline\nbat\ntab\nact\n\
                     house\tA building\nmouse\nhorse\nnoose\nloose\ngoose";
    WordValidator::from_word_list(word_list)
}

pub fn test_rules() -> GameRules {
    GameRules {
        round_time: 30,
        board_size: 25,
        ..GameRules::default()
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub fn seeded_rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

pub fn create_test_players(ids: &[&str]) -> Vec<User> {
    ids.iter().map(|id| User::new(*id, id.to_uppercase())).collect()
}

pub fn create_test_match(ids: &[&str]) -> Match {
    Match {
        id: "match-1".into(),
        ticket_id: "ticket-1".into(),
        players: create_test_players(ids),
        room: None,
        created: t0(),
        game_type: "peezme".into(),
        room_type: Privacy::Public,
    }
}

/// A started game with one barrier, one obstacle and one reward tile.
pub fn start_test_game(engine: &GameEngine, ids: &[&str], words: &[&str]) -> Game {
    let hazards = HazardMap::new(&[BARRIER], &[OBSTACLE], &[REWARD]).unwrap();
    engine
        .start_game(
            &create_test_match(ids),
            words.iter().map(|w| w.to_string()).collect(),
            Some(hazards),
            t0(),
            &mut seeded_rng(),
        )
        .unwrap()
}

/// A play spelling `word` on consecutive tiles starting at `first_tile`.
pub fn play_for(game: &Game, user_id: &str, word: &str, first_tile: u32) -> Play {
    Play {
        id: String::new(),
        game_id: game.game_id.clone(),
        user_id: user_id.to_string(),
        tile_locations: word
            .chars()
            .enumerate()
            .map(|(i, c)| TileLocation::new(first_tile + i as u32, c.to_string()))
            .collect(),
        word: word.to_string(),
        definition: String::new(),
        play_direction: game.play_direction,
        play_index: game.play_index,
        score: 0,
    }
}

/// Submit a plain play for whoever holds the turn.
pub fn play_turn(engine: &GameEngine, game: &mut Game, word: &str) {
    let holder = game.player_turn_id.clone();
    let play = play_for(game, &holder, word, OPEN_TILE);
    engine
        .submit_play(game, &holder, play, t0(), &mut seeded_rng())
        .unwrap();
}

/// Collects event type names for assertions.
#[derive(Default)]
pub struct EventCollector {
    events: Mutex<Vec<PeezMeEvent>>,
}

impl EventCollector {
    pub fn type_names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.type_name())
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl EventHandler for EventCollector {
    fn handle_event(&self, event: &PeezMeEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
