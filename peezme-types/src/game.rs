use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{GameId, User, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum GameStatus {
    AwaitingFirstPlay,
    InProgress,
    GameOver,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PlayDirection {
    #[default]
    Forward,
    Reverse,
}

impl PlayDirection {
    pub fn flipped(self) -> Self {
        match self {
            PlayDirection::Forward => PlayDirection::Reverse,
            PlayDirection::Reverse => PlayDirection::Forward,
        }
    }

    /// Seat step used when passing the turn.
    pub fn step(self) -> isize {
        match self {
            PlayDirection::Forward => 1,
            PlayDirection::Reverse => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TileLocation {
    pub index: u32,
    pub letter: String,
    #[serde(default)]
    pub area_name: String,
    #[serde(default)]
    pub user_id: UserId,
    #[serde(default)]
    pub is_selected: bool,
}

impl TileLocation {
    pub fn new(index: u32, letter: impl Into<String>) -> Self {
        Self {
            index,
            letter: letter.into(),
            area_name: String::new(),
            user_id: String::new(),
            is_selected: false,
        }
    }
}

/// One submitted move. Only accepted plays are ever stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Play {
    #[serde(default)]
    pub id: String,
    pub game_id: GameId,
    pub user_id: UserId,
    pub tile_locations: Vec<TileLocation>,
    pub word: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub play_direction: PlayDirection,
    pub play_index: u32,
    #[serde(default)]
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Game {
    pub game_id: GameId,
    pub players: Vec<User>,
    pub word: String,
    #[serde(rename = "Definition")]
    pub definition: String,
    pub missing_letter_index: usize,
    pub round_time: u32, // seconds
    pub play_index: u32,
    pub player_turn_id: UserId,
    pub plays: BTreeMap<String, Play>,
    pub leader_id: Option<UserId>,
    pub play_direction: PlayDirection,
    pub barriers: Vec<u32>,
    pub obstacles: Vec<u32>,
    pub rewards: Vec<u32>,
    pub status: GameStatus,
    pub scores: BTreeMap<UserId, i32>,
    /// Earliest play index at which each player took the lead.
    pub leader_since: BTreeMap<UserId, u32>,
    /// Words still to be played after the current one.
    pub word_pool: Vec<String>,
    pub turn_started_at: DateTime<Utc>,
    pub created: DateTime<Utc>,
}

impl Game {
    pub fn player(&self, user_id: &str) -> Option<&User> {
        self.players.iter().find(|p| p.id == user_id)
    }

    pub fn is_player(&self, user_id: &str) -> bool {
        self.player(user_id).is_some()
    }

    pub fn seat_of(&self, user_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == user_id)
    }

    pub fn turn_holder(&self) -> Option<&User> {
        self.player(&self.player_turn_id)
    }

    pub fn leader(&self) -> Option<&User> {
        self.leader_id.as_deref().and_then(|id| self.player(id))
    }

    pub fn score_of(&self, user_id: &str) -> i32 {
        self.scores.get(user_id).copied().unwrap_or(0)
    }

    pub fn is_over(&self) -> bool {
        self.status == GameStatus::GameOver
    }

    /// The letter hidden from the current word.
    pub fn missing_letter(&self) -> Option<char> {
        self.word.chars().nth(self.missing_letter_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WordDefinition {
    pub word: String,
    pub valid: bool,
    #[serde(rename = "Definition")]
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Standing {
    pub user_id: UserId,
    pub name: String,
    pub score: i32,
    pub leader_since: Option<u32>,
}
