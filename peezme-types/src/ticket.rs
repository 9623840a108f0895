use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{GameId, Privacy, RoomId, TicketId, User, UserId};

/// Lifecycle of a matchmaking ticket. The declaration order is the
/// progression order; a ticket never moves backwards.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub enum TicketStatus {
    New,       // Invitations out, no responses yet
    Staged,    // Some acceptances, or waiting in a pool
    Ready,     // Capacity met, match formed
    Active,    // Bound to a live game
    Ended,     // Terminal
}

impl TicketStatus {
    pub fn is_terminal(self) -> bool {
        self == TicketStatus::Ended
    }

    pub fn can_advance_to(self, next: TicketStatus) -> bool {
        next >= self && !self.is_terminal()
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Ticket {
    pub id: TicketId,
    pub created_by: UserId,
    pub game_type: String,
    pub room_type: Privacy,
    pub is_active: bool,
    pub room_id: Option<RoomId>,
    pub is_match_ticket: bool,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
    pub invitees: Vec<UserId>,
    pub accepted_by: Vec<UserId>,
    pub rejected_by: Vec<UserId>,
    pub is_being_processed: bool,
    pub invitation_sent: bool,
    pub status: TicketStatus,
    pub game_id: Option<GameId>,
    pub capacity: u32,
    /// Denormalized profile snapshots keyed by user id.
    #[serde(default)]
    pub profiles: BTreeMap<UserId, User>,
}

impl Ticket {
    pub fn is_invited(&self, user_id: &str) -> bool {
        self.invitees.iter().any(|id| id == user_id)
    }

    pub fn has_responded(&self, user_id: &str) -> bool {
        self.accepted_by.iter().any(|id| id == user_id)
            || self.rejected_by.iter().any(|id| id == user_id)
    }

    /// Invitees that have neither accepted nor rejected.
    pub fn pending(&self) -> Vec<&UserId> {
        self.invitees
            .iter()
            .filter(|id| !self.has_responded(id))
            .collect()
    }

    pub fn is_full(&self) -> bool {
        self.accepted_by.len() >= self.capacity as usize
    }

    /// Whether the outstanding invitees can still fill the ticket.
    pub fn can_still_fill(&self) -> bool {
        self.accepted_by.len() + self.pending().len() >= self.capacity as usize
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires
    }

    pub fn profile(&self, user_id: &str) -> User {
        self.profiles
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| User::placeholder(user_id))
    }

    pub fn pool_name(&self) -> String {
        Pool::name_for(&self.game_type, self.room_type)
    }
}

/// The immutable result of a completed ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Match {
    pub id: String,
    pub ticket_id: TicketId,
    pub players: Vec<User>,
    pub room: Option<RoomId>,
    pub created: DateTime<Utc>,
    pub game_type: String,
    pub room_type: Privacy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Pool {
    pub name: String,
    pub tickets: Vec<Ticket>,
}

impl Pool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tickets: Vec::new(),
        }
    }

    pub fn name_for(game_type: &str, room_type: Privacy) -> String {
        format!("{}:{}", game_type, room_type)
    }
}
