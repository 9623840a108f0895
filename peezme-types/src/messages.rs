use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{
    Game, GameId, Play, PlayDirection, Privacy, RoomId, Ticket, TicketId, TileLocation, User,
    UserId,
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InviteRequest {
    pub created_by: User,
    pub invitees: Vec<User>,
    pub capacity: u32,
    pub game_type: String,
    pub room_type: Privacy,
    #[serde(default)]
    pub room_id: Option<RoomId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InviteResponse {
    pub message: String,
    pub ticket: Ticket,
}

/// Open matchmaking request: place me in the pool for this game and room type.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MatchTicketRequest {
    pub user: User,
    pub game_type: String,
    pub room_type: Privacy,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CancelRequest {
    pub ticket_id: TicketId,
    pub user_id: UserId,
}

/// Invitee answer to a ticket; the same shape is echoed back on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export)]
pub struct TicketResponse {
    pub response_type: String,
    pub accepted: bool,
    pub ticket_id: TicketId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WordSubmittedResponse {
    pub score: i32,
    pub word: String,
    pub game_id: GameId,
    pub missing_letter_index: usize,
    pub play_index: u32,
    pub player_turn_id: UserId,
    pub word_is_good: bool,
    pub play_direction: PlayDirection,
    pub leader_id: Option<UserId>,
    pub tile_locations: Vec<TileLocation>,
    #[serde(rename = "Definition")]
    pub definition: String,
    pub game_over: bool,
}

impl WordSubmittedResponse {
    /// Response for an accepted play, read from the post-play game state.
    pub fn accepted(game: &Game, play: &Play) -> Self {
        Self {
            score: play.score,
            word: play.word.clone(),
            game_id: game.game_id.clone(),
            missing_letter_index: game.missing_letter_index,
            play_index: game.play_index,
            player_turn_id: game.player_turn_id.clone(),
            word_is_good: true,
            play_direction: game.play_direction,
            leader_id: game.leader_id.clone(),
            tile_locations: play.tile_locations.clone(),
            definition: play.definition.clone(),
            game_over: game.is_over(),
        }
    }

    /// Response for a play whose word failed the dictionary check.
    /// The game state is untouched, so everything echoes the current turn.
    pub fn rejected(game: &Game, play: &Play) -> Self {
        Self {
            score: 0,
            word: play.word.clone(),
            game_id: game.game_id.clone(),
            missing_letter_index: game.missing_letter_index,
            play_index: game.play_index,
            player_turn_id: game.player_turn_id.clone(),
            word_is_good: false,
            play_direction: game.play_direction,
            leader_id: game.leader_id.clone(),
            tile_locations: play.tile_locations.clone(),
            definition: String::new(),
            game_over: game.is_over(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DeleteRequest {
    pub user_id: UserId,
    pub game_id: GameId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DeleteGameResponse {
    pub game_id: GameId,
    pub game_over: bool,
    pub player_turn_id: Option<UserId>,
}

/// Join or leave a room. Older clients send `id` for the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LobbyRoomRequest {
    #[serde(rename = "id", alias = "roomId")]
    pub room_id: RoomId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RoomCreateRequest {
    pub room_name: String,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    pub user: User,
    #[serde(default = "default_privacy")]
    pub privacy: Privacy,
}

fn default_privacy() -> Privacy {
    Privacy::Public
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ServiceInfo {
    pub service: String,
    pub revision: String,
}
