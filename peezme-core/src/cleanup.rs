use chrono::{DateTime, Utc};
use peezme_types::{Game, GameId, Ticket, TicketId, TicketStatus};

use crate::game_state::GameEngine;

/// Picks the records a periodic sweep has to touch. Applying the change
/// is left to the caller, which holds the per-record locks.
pub struct TimeoutSweep {
    now: DateTime<Utc>,
}

/// Tally of one sweep, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub tickets_expired: usize,
    pub pooled_tickets_expired: usize,
    pub turns_skipped: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl TimeoutSweep {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Unfilled tickets whose deadline has passed.
    pub fn due_tickets<'a>(&self, tickets: impl IntoIterator<Item = &'a Ticket>) -> Vec<TicketId> {
        tickets
            .into_iter()
            .filter(|t| t.status < TicketStatus::Ready && t.is_expired(self.now))
            .map(|t| t.id.clone())
            .collect()
    }

    /// Running games whose turn holder ran out of time.
    pub fn stalled_games<'a>(&self, games: impl IntoIterator<Item = &'a Game>) -> Vec<GameId> {
        games
            .into_iter()
            .filter(|g| !g.is_over() && GameEngine::round_expired(g, self.now))
            .map(|g| g.game_id.clone())
            .collect()
    }
}
