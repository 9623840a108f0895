use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{
    DeleteRequest, Game, GameId, InviteResponse, Match, Standing, Ticket, TicketId,
    TicketResponse, WordSubmittedResponse,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum CloseReason {
    Cancelled,
    Unfillable,
    Expired,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TicketClosure {
    pub ticket_id: TicketId,
    pub reason: CloseReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GameOverReport {
    pub game_id: GameId,
    pub standings: Vec<Standing>,
}

/// Delta pushed to subscribers. `@type` names the payload carried in `data`;
/// `delta` is the record snapshot after the change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "@type")]
#[ts(export)]
pub enum PeezMeEvent {
    TicketCreated { data: InviteResponse, delta: Ticket },
    TicketUpdated { data: TicketResponse, delta: Ticket },
    MatchFormed { data: Match, delta: Ticket },
    TicketClosed { data: TicketClosure, delta: Ticket },
    WordSubmitted { data: WordSubmittedResponse, delta: Game },
    GameOver { data: GameOverReport, delta: Game },
    PlayerLeft { data: DeleteRequest, delta: Game },
}

impl PeezMeEvent {
    pub fn type_name(&self) -> &'static str {
        match self {
            PeezMeEvent::TicketCreated { .. } => "TicketCreated",
            PeezMeEvent::TicketUpdated { .. } => "TicketUpdated",
            PeezMeEvent::MatchFormed { .. } => "MatchFormed",
            PeezMeEvent::TicketClosed { .. } => "TicketClosed",
            PeezMeEvent::WordSubmitted { .. } => "WordSubmitted",
            PeezMeEvent::GameOver { .. } => "GameOver",
            PeezMeEvent::PlayerLeft { .. } => "PlayerLeft",
        }
    }

    pub fn ticket_id(&self) -> Option<&str> {
        match self {
            PeezMeEvent::TicketCreated { delta, .. }
            | PeezMeEvent::TicketUpdated { delta, .. }
            | PeezMeEvent::MatchFormed { delta, .. }
            | PeezMeEvent::TicketClosed { delta, .. } => Some(&delta.id),
            _ => None,
        }
    }

    pub fn game_id(&self) -> Option<&str> {
        match self {
            PeezMeEvent::WordSubmitted { delta, .. }
            | PeezMeEvent::GameOver { delta, .. }
            | PeezMeEvent::PlayerLeft { delta, .. } => Some(&delta.game_id),
            _ => None,
        }
    }
}
