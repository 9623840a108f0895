use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use peezme_types::{Match, Pool, Ticket, TicketError, TicketId, TicketStatus};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ticket::TicketLifecycle;

/// Outcome of one grouping attempt on a pool.
#[derive(Debug, Default)]
pub struct PoolDraw {
    pub formed: Option<(Match, Vec<Ticket>)>,
    /// Tickets found past their deadline, already moved to Ended.
    pub expired: Vec<Ticket>,
}

/// Open matchmaking tickets grouped by `"{gameType}:{roomType}"`, each
/// pool in arrival order.
pub struct PoolRegistry {
    pools: BTreeMap<String, VecDeque<Ticket>>,
    min_players: usize,
    max_players: usize,
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::new_with_config(2, 4)
    }

    pub fn new_with_config(min_players: usize, max_players: usize) -> Self {
        let min_players = min_players.max(1);
        Self {
            pools: BTreeMap::new(),
            min_players,
            max_players: max_players.max(min_players),
        }
    }

    /// Queue a staged match ticket. Returns its 1-based position.
    pub fn enqueue(&mut self, ticket: Ticket) -> Result<usize, TicketError> {
        if !ticket.is_match_ticket || ticket.status != TicketStatus::Staged {
            return Err(TicketError::InvalidTransition {
                from: ticket.status,
                to: TicketStatus::Staged,
            });
        }

        let pool_name = ticket.pool_name();
        let queue = self.pools.entry(pool_name.clone()).or_default();
        if queue.iter().any(|t| t.created_by == ticket.created_by) {
            return Err(TicketError::AlreadyQueued {
                user_id: ticket.created_by,
                pool: pool_name,
            });
        }

        info!(ticket_id = %ticket.id, pool = %pool_name, "Ticket queued");
        queue.push_back(ticket);
        Ok(queue.len())
    }

    pub fn remove(&mut self, ticket_id: &str) -> Option<Ticket> {
        for queue in self.pools.values_mut() {
            if let Some(index) = queue.iter().position(|t| t.id == ticket_id) {
                return queue.remove(index);
            }
        }
        None
    }

    /// Group the oldest tickets of a pool into one match once enough are
    /// waiting. Tickets past their deadline are ended and dropped first, so
    /// a lapsed ticket is never grouped. Every grouped ticket moves to Ready
    /// and leaves the pool.
    pub fn form_match(&mut self, pool_name: &str, now: DateTime<Utc>) -> PoolDraw {
        let Some(queue) = self.pools.get_mut(pool_name) else {
            return PoolDraw::default();
        };

        let mut expired = Vec::new();
        queue.retain(|ticket| {
            if !ticket.is_expired(now) {
                return true;
            }
            let mut ticket = ticket.clone();
            TicketLifecycle::expire(&mut ticket, now);
            expired.push(ticket);
            false
        });
        if queue.len() < self.min_players {
            return PoolDraw {
                formed: None,
                expired,
            };
        }

        let take = queue.len().min(self.max_players);
        let mut tickets: Vec<Ticket> = queue.drain(..take).collect();

        let first = &tickets[0];
        let game_match = Match {
            id: Uuid::new_v4().to_string(),
            ticket_id: first.id.clone(),
            players: tickets
                .iter()
                .map(|t| t.profile(&t.created_by))
                .collect(),
            room: None,
            created: now,
            game_type: first.game_type.clone(),
            room_type: first.room_type,
        };

        tickets.retain_mut(|ticket| match TicketLifecycle::fill_from_pool(ticket, &game_match) {
            Ok(()) => true,
            Err(e) => {
                warn!(ticket_id = %ticket.id, "Dropping pooled ticket: {}", e);
                false
            }
        });

        info!(
            pool = %pool_name,
            match_id = %game_match.id,
            players = tickets.len(),
            "Pool formed a match"
        );
        PoolDraw {
            formed: Some((game_match, tickets)),
            expired,
        }
    }

    /// Put staged tickets back at the head of their pools, oldest first.
    /// Used when a formed group could not be launched as drawn.
    pub fn requeue(&mut self, tickets: Vec<Ticket>) {
        for ticket in tickets.into_iter().rev() {
            if ticket.status != TicketStatus::Staged || self.contains(&ticket.id) {
                continue;
            }
            debug!(ticket_id = %ticket.id, "Ticket requeued");
            self.pools
                .entry(ticket.pool_name())
                .or_default()
                .push_front(ticket);
        }
    }

    /// End and drop every pooled ticket past its deadline.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Vec<Ticket> {
        let mut expired = Vec::new();
        for queue in self.pools.values_mut() {
            let (gone, kept): (Vec<Ticket>, Vec<Ticket>) =
                queue.drain(..).partition(|t| t.is_expired(now));
            *queue = kept.into();
            for mut ticket in gone {
                TicketLifecycle::expire(&mut ticket, now);
                expired.push(ticket);
            }
        }
        self.pools.retain(|_, queue| !queue.is_empty());
        expired
    }

    /// 1-based position of a ticket within its pool.
    pub fn position(&self, ticket_id: &str) -> Option<usize> {
        self.pools
            .values()
            .find_map(|queue| queue.iter().position(|t| t.id == ticket_id))
            .map(|i| i + 1)
    }

    pub fn contains(&self, ticket_id: &TicketId) -> bool {
        self.position(ticket_id).is_some()
    }

    pub fn len(&self, pool_name: &str) -> usize {
        self.pools.get(pool_name).map_or(0, |q| q.len())
    }

    pub fn pool(&self, pool_name: &str) -> Pool {
        Pool {
            name: pool_name.to_string(),
            tickets: self
                .pools
                .get(pool_name)
                .map(|q| q.iter().cloned().collect())
                .unwrap_or_default(),
        }
    }

    pub fn pool_names(&self) -> Vec<String> {
        self.pools.keys().cloned().collect()
    }
}
