use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use peezme_types::schema::{CURRENT_SCHEMA_VERSION, VersionedGame, VersionedTicket};
use peezme_types::{Game, Ticket};
use tracing::debug;

pub fn encode_ticket(ticket: &Ticket) -> Result<String> {
    serde_json::to_string(ticket).context("Failed to encode ticket")
}

pub fn encode_game(game: &Game) -> Result<String> {
    serde_json::to_string(game).context("Failed to encode game")
}

/// Decode a stored ticket of any schema version into the current shape.
pub fn decode_ticket(payload: &str) -> Result<Ticket> {
    let versioned: VersionedTicket =
        serde_json::from_str(payload).context("Ticket payload matches no known schema")?;
    let version = versioned.version();
    if version != CURRENT_SCHEMA_VERSION {
        debug!("Upgrading ticket payload from schema v{}", version);
    }
    Ok(versioned.upgrade()?)
}

/// Decode a stored game of any schema version. Older shapes carry no
/// timestamps, so `now` stands in for them.
pub fn decode_game(payload: &str, now: DateTime<Utc>) -> Result<Game> {
    let versioned: VersionedGame =
        serde_json::from_str(payload).context("Game payload matches no known schema")?;
    let version = versioned.version();
    if version != CURRENT_SCHEMA_VERSION {
        debug!("Upgrading game payload from schema v{}", version);
    }
    Ok(versioned.upgrade(now)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use peezme_types::{GameStatus, TicketStatus};

    #[test]
    fn test_v2_ticket_payload_upgrades() {
        let payload = r#"{
            "id": "t1",
            "createdBy": "host",
            "gameType": "peezme",
            "roomType": "private",
            "isActive": true,
            "room": "",
            "isMatchTicket": false,
            "created": "2024-01-01T00:00:00Z",
            "expires": "2024-01-01T00:05:00Z",
            "invitees": [{"id": "a", "name": "A"}, {"id": "b", "name": "B"}],
            "acceptedBy": [{"id": "a", "name": "A"}],
            "rejectedBy": [],
            "isBeingProcessed": false,
            "invitationSent": true
        }"#;

        let ticket = decode_ticket(payload).unwrap();
        assert_eq!(ticket.status, TicketStatus::Staged);
        assert_eq!(ticket.accepted_by, vec!["a"]);
        assert_eq!(ticket.room_id, None);
        assert_eq!(ticket.profile("b").name, "B");
    }

    #[test]
    fn test_unrecognized_ticket_payload_fails() {
        let payload = r#"{
            "id": "t1",
            "invitees": ["a"]
        }"#;
        assert!(decode_ticket(payload).is_err());
    }

    #[test]
    fn test_v2_game_payload_upgrades() {
        let payload = r#"{
            "gameId": "g1",
            "players": [{"id": "a", "name": "A"}, {"id": "b", "name": "B"}],
            "word": "house",
            "Definition": "A building",
            "missingLetterIndex": 2,
            "roundTime": 30,
            "playIndex": 0,
            "playerTurnId": "a",
            "plays": {},
            "leaderId": "",
            "playDirection": "forward",
            "barriers": ["1"],
            "obstacles": [],
            "rewards": ["7"]
        }"#;

        let now = Utc::now();
        let game = decode_game(payload, now).unwrap();
        assert_eq!(game.status, GameStatus::AwaitingFirstPlay);
        assert_eq!(game.barriers, vec![1]);
        assert_eq!(game.rewards, vec![7]);
        assert_eq!(game.turn_started_at, now);

        let again = decode_game(&encode_game(&game).unwrap(), Utc::now()).unwrap();
        assert_eq!(again, game);
    }
}
