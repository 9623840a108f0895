use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use peezme_types::{
    Game, GameError, GameStatus, Match, Play, PlayDirection, Standing, UserId,
    WordSubmittedResponse,
};
use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::hazards::{HazardCounts, HazardEffects, HazardMap, TileKind};
use crate::scoring::ScoringEngine;
use crate::word_validation::Dictionary;

/// Knobs for a game session.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRules {
    pub round_time: u32, // seconds
    pub board_size: u32,
    pub max_plays: Option<u32>,
    pub target_score: Option<i32>,
    pub hazard_counts: HazardCounts,
    pub effects: HazardEffects,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            round_time: 30,
            board_size: 25,
            max_plays: None,
            target_score: None,
            hazard_counts: HazardCounts::default(),
            effects: HazardEffects::default(),
        }
    }
}

/// Result of an accepted play.
#[derive(Debug, Clone)]
pub struct PlayOutcome {
    pub play: Play,
    pub response: WordSubmittedResponse,
    /// Present when the play ended the game.
    pub standings: Option<Vec<Standing>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LeaveOutcome {
    /// The game goes on; `next_turn` holds the turn afterwards.
    Continued { next_turn: UserId },
    GameOver { standings: Vec<Standing> },
}

pub struct GameEngine<'a> {
    rules: &'a GameRules,
    dictionary: &'a dyn Dictionary,
}

impl<'a> GameEngine<'a> {
    pub fn new(rules: &'a GameRules, dictionary: &'a dyn Dictionary) -> Self {
        Self { rules, dictionary }
    }

    pub fn rules(&self) -> &GameRules {
        self.rules
    }

    /// Seed a game from a formed match. The first word of `words` is played
    /// first; the rest become the word pool. Explicit hazards replace the
    /// randomly generated layout.
    pub fn start_game<R: Rng + ?Sized>(
        &self,
        game_match: &Match,
        words: Vec<String>,
        hazards: Option<HazardMap>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Game, GameError> {
        let first_player = game_match
            .players
            .first()
            .ok_or(GameError::NotEnoughPlayers)?;

        let mut words = words
            .into_iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty());
        let word = words.next().ok_or(GameError::EmptyWordPool)?;
        let word_pool: Vec<String> = words.collect();

        let hazards = match hazards {
            Some(map) => map,
            None => HazardMap::generate(self.rules.board_size, self.rules.hazard_counts, rng),
        };

        let mut game = Game {
            game_id: Uuid::new_v4().to_string(),
            players: game_match.players.clone(),
            definition: self.dictionary.lookup(&word).definition,
            missing_letter_index: rng.gen_range(0..word.chars().count()),
            word,
            round_time: self.rules.round_time,
            play_index: 0,
            player_turn_id: first_player.id.clone(),
            plays: BTreeMap::new(),
            leader_id: None,
            play_direction: PlayDirection::Forward,
            barriers: Vec::new(),
            obstacles: Vec::new(),
            rewards: Vec::new(),
            status: GameStatus::AwaitingFirstPlay,
            scores: game_match
                .players
                .iter()
                .map(|p| (p.id.clone(), 0))
                .collect(),
            leader_since: BTreeMap::new(),
            word_pool,
            turn_started_at: now,
            created: now,
        };
        hazards.install(&mut game);

        info!(
            game_id = %game.game_id,
            match_id = %game_match.id,
            players = game.players.len(),
            "Game started"
        );
        Ok(game)
    }

    /// Validate and apply one play. Every check runs before the first
    /// mutation, so an error leaves `game` exactly as it was.
    pub fn submit_play<R: Rng + ?Sized>(
        &self,
        game: &mut Game,
        user_id: &str,
        mut play: Play,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<PlayOutcome, GameError> {
        if game.is_over() {
            return Err(GameError::GameAlreadyCompleted);
        }
        if !game.is_player(user_id) {
            return Err(GameError::NotParticipant {
                user_id: user_id.to_string(),
            });
        }
        if user_id != game.player_turn_id {
            return Err(GameError::NotYourTurn {
                user_id: user_id.to_string(),
                turn_holder: game.player_turn_id.clone(),
            });
        }
        if play.play_index != game.play_index {
            return Err(GameError::StalePlay {
                expected: game.play_index,
                received: play.play_index,
            });
        }
        if Self::round_expired(game, now) {
            return Err(GameError::RoundExpired {
                elapsed_secs: (now - game.turn_started_at).num_seconds(),
                round_time: game.round_time,
            });
        }

        let tiles = self.check_placement(game, user_id, &play)?;

        let lookup = self.dictionary.lookup(&play.word);
        if !lookup.valid {
            debug!(game_id = %game.game_id, word = %play.word, "Rejected unknown word");
            return Err(GameError::InvalidWord { word: play.word });
        }

        let score = ScoringEngine::score_play(
            &lookup.word,
            &game.word,
            game.missing_letter(),
            &tiles,
            &self.rules.effects,
        );

        // Commit
        if play.id.is_empty() {
            play.id = Uuid::new_v4().to_string();
        }
        play.game_id = game.game_id.clone();
        play.user_id = user_id.to_string();
        play.word = lookup.word;
        play.definition = lookup.definition;
        play.play_direction = game.play_direction;
        play.score = score.total;
        for tile in &mut play.tile_locations {
            tile.user_id = user_id.to_string();
        }

        *game.scores.entry(user_id.to_string()).or_insert(0) += score.total;
        game.plays.insert(play.id.clone(), play.clone());
        self.update_leader(game, user_id);

        if score.flips_direction {
            game.play_direction = game.play_direction.flipped();
        }
        game.play_index += 1;
        game.status = GameStatus::InProgress;

        let standings = if self.reached_end(game) {
            game.status = GameStatus::GameOver;
            let standings = ScoringEngine::standings(game);
            info!(
                game_id = %game.game_id,
                plays = game.play_index,
                winner = %standings.first().map(|s| s.user_id.as_str()).unwrap_or(""),
                "Game over"
            );
            Some(standings)
        } else {
            self.next_word(game, rng);
            Self::pass_turn(game, now);
            None
        };

        info!(
            game_id = %game.game_id,
            user_id = %user_id,
            score = score.total,
            play_index = game.play_index,
            "Play accepted"
        );

        let response = WordSubmittedResponse::accepted(game, &play);
        Ok(PlayOutcome {
            play,
            response,
            standings,
        })
    }

    /// A participant leaves. The turn moves on if they held it; the last
    /// player leaving ends the game.
    pub fn leave(
        &self,
        game: &mut Game,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<LeaveOutcome, GameError> {
        let seat = game.seat_of(user_id).ok_or_else(|| GameError::NotParticipant {
            user_id: user_id.to_string(),
        })?;

        if game.is_over() || game.players.len() == 1 {
            game.status = GameStatus::GameOver;
            info!(game_id = %game.game_id, user_id = %user_id, "Last player left, game over");
            return Ok(LeaveOutcome::GameOver {
                standings: ScoringEngine::standings(game),
            });
        }

        if game.player_turn_id == user_id {
            Self::pass_turn(game, now);
        }
        game.players.remove(seat);

        if game.leader_id.as_deref() == Some(user_id) {
            game.leader_id = ScoringEngine::standings(game)
                .first()
                .filter(|s| s.score > 0)
                .map(|s| s.user_id.clone());
        }

        info!(
            game_id = %game.game_id,
            user_id = %user_id,
            next_turn = %game.player_turn_id,
            "Player left game"
        );
        Ok(LeaveOutcome::Continued {
            next_turn: game.player_turn_id.clone(),
        })
    }

    /// Pass the turn of a holder whose round clock ran out. The play index
    /// does not move. Returns whether anything changed.
    pub fn skip_expired_turn(&self, game: &mut Game, now: DateTime<Utc>) -> bool {
        if game.is_over() || !Self::round_expired(game, now) {
            return false;
        }
        let skipped = game.player_turn_id.clone();
        Self::pass_turn(game, now);
        debug!(
            game_id = %game.game_id,
            skipped = %skipped,
            next_turn = %game.player_turn_id,
            "Turn timed out"
        );
        true
    }

    pub fn round_expired(game: &Game, now: DateTime<Utc>) -> bool {
        (now - game.turn_started_at).num_milliseconds() > i64::from(game.round_time) * 1000
    }

    /// Seat that follows `seat` in the current direction, wrapping around.
    pub fn next_seat(game: &Game, seat: usize) -> usize {
        let len = game.players.len() as isize;
        (seat as isize + game.play_direction.step()).rem_euclid(len) as usize
    }

    fn pass_turn(game: &mut Game, now: DateTime<Utc>) {
        let seat = game.seat_of(&game.player_turn_id).unwrap_or(0);
        let next = Self::next_seat(game, seat);
        game.player_turn_id = game.players[next].id.clone();
        game.turn_started_at = now;
    }

    fn check_placement(
        &self,
        game: &Game,
        user_id: &str,
        play: &Play,
    ) -> Result<Vec<TileKind>, GameError> {
        let invalid = |reason: String| GameError::InvalidPlay { reason };

        if !play.game_id.is_empty() && play.game_id != game.game_id {
            return Err(invalid(format!("play is for game {}", play.game_id)));
        }
        if !play.user_id.is_empty() && play.user_id != user_id {
            return Err(invalid(format!("play belongs to {}", play.user_id)));
        }
        if play.tile_locations.is_empty() {
            return Err(invalid("no tiles placed".to_string()));
        }

        let hazards = HazardMap::from_game(game);
        let mut seen = HashSet::new();
        let mut kinds = Vec::with_capacity(play.tile_locations.len());
        let mut spelled = String::new();

        for tile in &play.tile_locations {
            if tile.index >= self.rules.board_size {
                return Err(invalid(format!("tile {} is off the board", tile.index)));
            }
            if !seen.insert(tile.index) {
                return Err(invalid(format!("tile {} placed twice", tile.index)));
            }
            let mut letters = tile.letter.chars();
            match (letters.next(), letters.next()) {
                (Some(c), None) if c.is_alphabetic() => spelled.extend(c.to_lowercase()),
                _ => {
                    return Err(invalid(format!(
                        "'{}' at tile {} is not a single letter",
                        tile.letter, tile.index
                    )));
                }
            }

            let kind = hazards.classify(tile.index);
            if kind == TileKind::Barrier {
                return Err(GameError::BlockedByBarrier { index: tile.index });
            }
            kinds.push(kind);
        }

        if spelled != play.word.trim().to_lowercase() {
            return Err(invalid(format!(
                "tiles spell '{}', not '{}'",
                spelled, play.word
            )));
        }
        Ok(kinds)
    }

    fn update_leader(&self, game: &mut Game, user_id: &str) {
        let takes_lead = match game.leader_id.as_deref() {
            None => true,
            Some(leader) if leader == user_id => false,
            Some(leader) => game.score_of(user_id) > game.score_of(leader),
        };
        if takes_lead {
            game.leader_id = Some(user_id.to_string());
            game.leader_since
                .entry(user_id.to_string())
                .or_insert(game.play_index);
        }
    }

    fn reached_end(&self, game: &Game) -> bool {
        if game.word_pool.is_empty() {
            return true;
        }
        if let Some(max) = self.rules.max_plays {
            if game.play_index >= max {
                return true;
            }
        }
        if let Some(target) = self.rules.target_score {
            if game.scores.values().any(|&s| s >= target) {
                return true;
            }
        }
        false
    }

    fn next_word<R: Rng + ?Sized>(&self, game: &mut Game, rng: &mut R) {
        let word = game.word_pool.remove(0);
        game.definition = self.dictionary.lookup(&word).definition;
        game.missing_letter_index = rng.gen_range(0..word.chars().count().max(1));
        game.word = word;
    }
}
