use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::TicketStatus;

/// Coarse classification shared by every domain error. Callers decide
/// how to report or retry from this alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Forbidden,
    Invalid,
    Expired,
    Busy,
    Internal,
}

impl ErrorKind {
    /// Only lock contention is worth retrying unchanged.
    pub fn is_retryable(self) -> bool {
        self == ErrorKind::Busy
    }
}

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum TicketError {
    #[error("invalid capacity {capacity} for {invitees} invitees")]
    InvalidCapacity { capacity: u32, invitees: u32 },
    #[error("ticket {ticket_id} not found")]
    TicketNotFound { ticket_id: String },
    #[error("ticket {ticket_id} has expired")]
    TicketExpired { ticket_id: String },
    #[error("user {user_id} already responded")]
    AlreadyResponded { user_id: String },
    #[error("ticket {ticket_id} is already at capacity")]
    CapacityExceeded { ticket_id: String },
    #[error("user {user_id} was not invited")]
    NotInvited { user_id: String },
    #[error("only the creator may cancel, not {user_id}")]
    NotTicketCreator { user_id: String },
    #[error("ticket {ticket_id} has ended")]
    TicketClosed { ticket_id: String },
    #[error("ticket cannot move from {from} to {to}")]
    InvalidTransition { from: TicketStatus, to: TicketStatus },
    #[error("ticket {ticket_id} is being processed, retry later")]
    TicketBusy { ticket_id: String },
    #[error("user {user_id} already has a ticket in pool {pool}")]
    AlreadyQueued { user_id: String, pool: String },
}

impl TicketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TicketError::InvalidCapacity { .. } => ErrorKind::Invalid,
            TicketError::TicketNotFound { .. } => ErrorKind::NotFound,
            TicketError::TicketExpired { .. } => ErrorKind::Expired,
            TicketError::AlreadyResponded { .. }
            | TicketError::CapacityExceeded { .. }
            | TicketError::TicketClosed { .. }
            | TicketError::InvalidTransition { .. }
            | TicketError::AlreadyQueued { .. } => ErrorKind::Conflict,
            TicketError::NotInvited { .. } | TicketError::NotTicketCreator { .. } => {
                ErrorKind::Forbidden
            }
            TicketError::TicketBusy { .. } => ErrorKind::Busy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum GameError {
    #[error("game {game_id} not found")]
    GameNotFound { game_id: String },
    #[error("user {user_id} is not playing in this game")]
    NotParticipant { user_id: String },
    #[error("not your turn, waiting on {turn_holder}")]
    NotYourTurn { user_id: String, turn_holder: String },
    #[error("stale play: expected play index {expected}, got {received}")]
    StalePlay { expected: u32, received: u32 },
    #[error("round expired after {elapsed_secs}s (limit {round_time}s)")]
    RoundExpired { elapsed_secs: i64, round_time: u32 },
    #[error("tile {index} is blocked by a barrier")]
    BlockedByBarrier { index: u32 },
    #[error("invalid play: {reason}")]
    InvalidPlay { reason: String },
    #[error("invalid word: {word}")]
    InvalidWord { word: String },
    #[error("tile {index} is configured as more than one hazard")]
    OverlappingHazard { index: u32 },
    #[error("game already completed")]
    GameAlreadyCompleted,
    #[error("a game needs at least one player")]
    NotEnoughPlayers,
    #[error("a game needs at least one word")]
    EmptyWordPool,
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::GameNotFound { .. } => ErrorKind::NotFound,
            GameError::NotParticipant { .. } => ErrorKind::Forbidden,
            GameError::NotYourTurn { .. }
            | GameError::StalePlay { .. }
            | GameError::OverlappingHazard { .. }
            | GameError::GameAlreadyCompleted => ErrorKind::Conflict,
            GameError::RoundExpired { .. } => ErrorKind::Expired,
            GameError::BlockedByBarrier { .. }
            | GameError::InvalidPlay { .. }
            | GameError::InvalidWord { .. }
            | GameError::NotEnoughPlayers
            | GameError::EmptyWordPool => ErrorKind::Invalid,
        }
    }

    /// The turn holder may try again within the same round.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GameError::InvalidWord { .. }
                | GameError::BlockedByBarrier { .. }
                | GameError::InvalidPlay { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum LobbyError {
    #[error("room {room_id} not found")]
    RoomNotFound { room_id: String },
    #[error("room {room_id} cannot admit {requested} more players (max {capacity})")]
    RoomFull {
        room_id: String,
        capacity: u32,
        requested: u32,
    },
    #[error("room {room_id} already exists")]
    RoomExists { room_id: String },
    #[error("only the creator may close room {room_id}")]
    NotRoomCreator { room_id: String },
    #[error("user {user_id} is not in room {room_id}")]
    NotInRoom { room_id: String, user_id: String },
}

impl LobbyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LobbyError::RoomNotFound { .. } => ErrorKind::NotFound,
            LobbyError::RoomFull { .. }
            | LobbyError::RoomExists { .. }
            | LobbyError::NotInRoom { .. } => ErrorKind::Conflict,
            LobbyError::NotRoomCreator { .. } => ErrorKind::Forbidden,
        }
    }
}

/// Failure while upgrading a stored payload to the current schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("payload matches no known schema version: {0}")]
    Unrecognized(String),
    #[error("hazard index '{0}' is not a board index")]
    BadHazardIndex(String),
    #[error("{0}")]
    BadPrivacy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_busy_is_retryable() {
        assert!(
            TicketError::TicketBusy {
                ticket_id: "t".into()
            }
            .kind()
            .is_retryable()
        );
        assert!(
            !TicketError::CapacityExceeded {
                ticket_id: "t".into()
            }
            .kind()
            .is_retryable()
        );
        assert!(!GameError::GameAlreadyCompleted.kind().is_retryable());
    }

    #[test]
    fn test_invalid_word_is_recoverable_but_stale_play_is_not() {
        let invalid = GameError::InvalidWord { word: "zzz".into() };
        assert!(invalid.is_recoverable());
        assert_eq!(invalid.kind(), ErrorKind::Invalid);

        let stale = GameError::StalePlay {
            expected: 2,
            received: 1,
        };
        assert!(!stale.is_recoverable());
        assert_eq!(stale.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_error_messages() {
        let err = TicketError::InvalidCapacity {
            capacity: 4,
            invitees: 3,
        };
        assert_eq!(err.to_string(), "invalid capacity 4 for 3 invitees");

        let err = LobbyError::RoomFull {
            room_id: "r1".into(),
            capacity: 4,
            requested: 2,
        };
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("r1"));
    }
}
