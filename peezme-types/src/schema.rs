//! Earlier wire shapes of `Ticket` and `Game`, and their upgrades.
//!
//! * v1: invitee ids, a `room` string, no status; games embed the turn holder
//!   and leader as `User` objects, store `PlayerMoves`, and list hazards as
//!   `TileLocation`s.
//! * v2: invitees as embedded `User`s, turn and leader by id, hazards as index
//!   strings.
//! * v3: the current [`Ticket`] and [`Game`].
//!
//! Stored payloads are decoded through [`VersionedTicket`] / [`VersionedGame`]
//! and upgraded on read, so a record is rewritten as v3 on its next save.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Game, GameStatus, Play, PlayDirection, Privacy, SchemaError, Ticket, TicketStatus,
    TileLocation, User,
};

pub const CURRENT_SCHEMA_VERSION: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketV1 {
    pub id: String,
    pub created_by: String,
    pub game_type: String,
    pub room_type: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub is_match_ticket: bool,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
    #[serde(default)]
    pub invitees: Vec<String>,
    #[serde(default)]
    pub accepted_by: Vec<String>,
    #[serde(default)]
    pub is_being_processed: bool,
    #[serde(default)]
    pub invitation_sent: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketV2 {
    pub id: String,
    pub created_by: String,
    pub game_type: String,
    pub room_type: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub is_match_ticket: bool,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
    #[serde(default)]
    pub invitees: Vec<User>,
    #[serde(default)]
    pub accepted_by: Vec<User>,
    #[serde(default)]
    pub is_being_processed: bool,
    #[serde(default)]
    pub invitation_sent: bool,
}

impl From<TicketV1> for TicketV2 {
    fn from(v1: TicketV1) -> Self {
        Self {
            id: v1.id,
            created_by: v1.created_by,
            game_type: v1.game_type,
            room_type: v1.room_type,
            is_active: v1.is_active,
            room: v1.room,
            is_match_ticket: v1.is_match_ticket,
            created: v1.created,
            expires: v1.expires,
            invitees: v1.invitees.iter().map(|id| User::placeholder(id)).collect(),
            accepted_by: v1.accepted_by.iter().map(|id| User::placeholder(id)).collect(),
            is_being_processed: v1.is_being_processed,
            invitation_sent: v1.invitation_sent,
        }
    }
}

impl TryFrom<TicketV2> for Ticket {
    type Error = SchemaError;

    /// Older tickets carry no capacity; every invitee had to accept.
    fn try_from(v2: TicketV2) -> Result<Self, Self::Error> {
        let room_type = v2
            .room_type
            .parse::<Privacy>()
            .map_err(SchemaError::BadPrivacy)?;

        let mut profiles = BTreeMap::new();
        for user in v2.invitees.iter().chain(v2.accepted_by.iter()) {
            profiles.insert(user.id.clone(), user.clone());
        }

        let invitees: Vec<String> = v2.invitees.iter().map(|u| u.id.clone()).collect();
        let accepted_by: Vec<String> = v2.accepted_by.iter().map(|u| u.id.clone()).collect();
        let capacity = invitees.len().max(1) as u32;

        let status = if accepted_by.len() >= capacity as usize {
            TicketStatus::Ready
        } else if accepted_by.is_empty() {
            TicketStatus::New
        } else {
            TicketStatus::Staged
        };

        Ok(Ticket {
            id: v2.id,
            created_by: v2.created_by,
            game_type: v2.game_type,
            room_type,
            is_active: v2.is_active,
            room_id: (!v2.room.is_empty()).then_some(v2.room),
            is_match_ticket: v2.is_match_ticket,
            created: v2.created,
            expires: v2.expires,
            invitees,
            accepted_by,
            rejected_by: Vec::new(),
            is_being_processed: false,
            invitation_sent: v2.invitation_sent,
            status,
            game_id: None,
            capacity,
            profiles,
        })
    }
}

/// Any stored ticket payload. Variants are tried newest first.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum VersionedTicket {
    Current(Ticket),
    V2(TicketV2),
    V1(TicketV1),
}

impl VersionedTicket {
    pub fn version(&self) -> u32 {
        match self {
            VersionedTicket::Current(_) => CURRENT_SCHEMA_VERSION,
            VersionedTicket::V2(_) => 2,
            VersionedTicket::V1(_) => 1,
        }
    }

    pub fn upgrade(self) -> Result<Ticket, SchemaError> {
        match self {
            VersionedTicket::Current(ticket) => Ok(ticket),
            VersionedTicket::V2(v2) => Ticket::try_from(v2),
            VersionedTicket::V1(v1) => Ticket::try_from(TicketV2::from(v1)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMoves {
    pub word: String,
    pub game_id: String,
    pub user: User,
    #[serde(default)]
    pub tile_locations: Vec<TileLocation>,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub play_direction: String,
    pub play_index: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayV2 {
    pub word: String,
    pub game_id: String,
    pub user_id: String,
    #[serde(default)]
    pub tile_locations: Vec<TileLocation>,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub play_direction: String,
    pub play_index: u32,
}

impl From<PlayerMoves> for PlayV2 {
    fn from(moves: PlayerMoves) -> Self {
        Self {
            word: moves.word,
            game_id: moves.game_id,
            user_id: moves.user.id,
            tile_locations: moves.tile_locations,
            definition: moves.definition,
            play_direction: moves.play_direction,
            play_index: moves.play_index,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameV1 {
    pub players: Vec<User>,
    pub word: String,
    #[serde(rename = "Definition", default)]
    pub definition: String,
    pub missing_letter_index: usize,
    pub game_id: String,
    pub round_time: u32,
    pub play_index: u32,
    pub player_turn: User,
    #[serde(default)]
    pub plays: BTreeMap<String, PlayerMoves>,
    #[serde(default)]
    pub leader: Option<User>,
    #[serde(default)]
    pub play_direction: String,
    #[serde(default)]
    pub barriers: Vec<TileLocation>,
    #[serde(default)]
    pub obstacles: Vec<TileLocation>,
    #[serde(default)]
    pub rewards: Vec<TileLocation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameV2 {
    pub players: Vec<User>,
    pub word: String,
    #[serde(rename = "Definition", default)]
    pub definition: String,
    pub missing_letter_index: usize,
    pub game_id: String,
    pub round_time: u32,
    pub play_index: u32,
    pub player_turn_id: String,
    #[serde(default)]
    pub plays: BTreeMap<String, PlayV2>,
    pub leader_id: String,
    #[serde(default)]
    pub play_direction: String,
    #[serde(default)]
    pub barriers: Vec<String>,
    #[serde(default)]
    pub obstacles: Vec<String>,
    #[serde(default)]
    pub rewards: Vec<String>,
}

impl From<GameV1> for GameV2 {
    fn from(v1: GameV1) -> Self {
        let indices = |tiles: Vec<TileLocation>| -> Vec<String> {
            tiles.into_iter().map(|t| t.index.to_string()).collect()
        };

        Self {
            players: v1.players,
            word: v1.word,
            definition: v1.definition,
            missing_letter_index: v1.missing_letter_index,
            game_id: v1.game_id,
            round_time: v1.round_time,
            play_index: v1.play_index,
            player_turn_id: v1.player_turn.id,
            plays: v1
                .plays
                .into_iter()
                .map(|(id, moves)| (id, PlayV2::from(moves)))
                .collect(),
            leader_id: v1.leader.map(|u| u.id).unwrap_or_default(),
            play_direction: v1.play_direction,
            barriers: indices(v1.barriers),
            obstacles: indices(v1.obstacles),
            rewards: indices(v1.rewards),
        }
    }
}

fn parse_direction(raw: &str) -> PlayDirection {
    if raw.trim().eq_ignore_ascii_case("reverse") {
        PlayDirection::Reverse
    } else {
        PlayDirection::Forward
    }
}

fn parse_indices(raw: &[String]) -> Result<Vec<u32>, SchemaError> {
    raw.iter()
        .map(|s| {
            s.trim()
                .parse::<u32>()
                .map_err(|_| SchemaError::BadHazardIndex(s.clone()))
        })
        .collect()
}

impl GameV2 {
    /// Older games kept no scores; they are rebuilt from the recorded plays
    /// at one point per placed tile. The clock restarts at `now`.
    pub fn upgrade(self, now: DateTime<Utc>) -> Result<Game, SchemaError> {
        let barriers = parse_indices(&self.barriers)?;
        let obstacles = parse_indices(&self.obstacles)?;
        let rewards = parse_indices(&self.rewards)?;

        let mut scores: BTreeMap<String, i32> =
            self.players.iter().map(|p| (p.id.clone(), 0)).collect();
        let mut plays = BTreeMap::new();
        for (id, play) in self.plays {
            let score = play.tile_locations.len() as i32;
            *scores.entry(play.user_id.clone()).or_insert(0) += score;
            plays.insert(
                id.clone(),
                Play {
                    id,
                    game_id: play.game_id,
                    user_id: play.user_id,
                    tile_locations: play.tile_locations,
                    word: play.word,
                    definition: play.definition,
                    play_direction: parse_direction(&play.play_direction),
                    play_index: play.play_index,
                    score,
                },
            );
        }

        let leader_id = (!self.leader_id.is_empty()).then_some(self.leader_id);
        let mut leader_since = BTreeMap::new();
        if let Some(leader) = &leader_id {
            leader_since.insert(leader.clone(), self.play_index.saturating_sub(1));
        }

        let status = if self.play_index == 0 {
            GameStatus::AwaitingFirstPlay
        } else {
            GameStatus::InProgress
        };

        Ok(Game {
            game_id: self.game_id,
            players: self.players,
            word: self.word,
            definition: self.definition,
            missing_letter_index: self.missing_letter_index,
            round_time: self.round_time,
            play_index: self.play_index,
            player_turn_id: self.player_turn_id,
            plays,
            leader_id,
            play_direction: parse_direction(&self.play_direction),
            barriers,
            obstacles,
            rewards,
            status,
            scores,
            leader_since,
            word_pool: Vec::new(),
            turn_started_at: now,
            created: now,
        })
    }
}

/// Any stored game payload. Variants are tried newest first.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum VersionedGame {
    Current(Game),
    V2(GameV2),
    V1(GameV1),
}

impl VersionedGame {
    pub fn version(&self) -> u32 {
        match self {
            VersionedGame::Current(_) => CURRENT_SCHEMA_VERSION,
            VersionedGame::V2(_) => 2,
            VersionedGame::V1(_) => 1,
        }
    }

    pub fn upgrade(self, now: DateTime<Utc>) -> Result<Game, SchemaError> {
        match self {
            VersionedGame::Current(game) => Ok(game),
            VersionedGame::V2(v2) => v2.upgrade(now),
            VersionedGame::V1(v1) => GameV2::from(v1).upgrade(now),
        }
    }
}
