use chrono::{DateTime, Utc};
use peezme_core::{PoolDraw, PoolRegistry};
use peezme_types::{Pool, Ticket, TicketError};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;

/// Waiting room for open match tickets, one FIFO per game/room type.
pub struct MatchmakingQueue {
    registry: RwLock<PoolRegistry>,
    min_players: usize,
    max_players: usize,
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self::new_with_config(2, 4)
    }

    pub fn new_with_config(min_players: usize, max_players: usize) -> Self {
        Self {
            registry: RwLock::new(PoolRegistry::new_with_config(min_players, max_players)),
            min_players,
            max_players,
        }
    }

    /// Queue a ticket and, when its pool now holds enough players, group the
    /// oldest into a match. Both happen under one write lock so two
    /// concurrent joins can never claim the same tickets.
    pub async fn add_ticket(
        &self,
        ticket: Ticket,
        now: DateTime<Utc>,
    ) -> Result<(usize, PoolDraw), TicketError> {
        let pool_name = ticket.pool_name();
        let mut registry = self.registry.write().await;
        let position = registry.enqueue(ticket)?;
        let draw = registry.form_match(&pool_name, now);
        if let Some((game_match, _)) = &draw.formed {
            info!(pool = %pool_name, match_id = %game_match.id, "Matchmaking formed a group");
        }
        Ok((position, draw))
    }

    /// Queue a ticket without trying to group its pool.
    pub async fn restore_ticket(&self, ticket: Ticket) -> Result<usize, TicketError> {
        self.registry.write().await.enqueue(ticket)
    }

    pub async fn remove_ticket(&self, ticket_id: &str) -> Option<Ticket> {
        self.registry.write().await.remove(ticket_id)
    }

    pub async fn requeue(&self, tickets: Vec<Ticket>) {
        self.registry.write().await.requeue(tickets);
    }

    pub async fn try_create_match(&self, pool_name: &str, now: DateTime<Utc>) -> PoolDraw {
        self.registry.write().await.form_match(pool_name, now)
    }

    /// End and drop pooled tickets past their deadline.
    pub async fn cleanup_expired_tickets(&self, now: DateTime<Utc>) -> Vec<Ticket> {
        let expired = self.registry.write().await.expire(now);
        if !expired.is_empty() {
            info!(count = expired.len(), "Expired pooled tickets");
        }
        expired
    }

    pub async fn get_queue_position(&self, ticket_id: &str) -> Option<usize> {
        self.registry.read().await.position(ticket_id)
    }

    pub async fn is_ticket_queued(&self, ticket_id: &str) -> bool {
        self.registry.read().await.contains(&ticket_id.to_string())
    }

    pub async fn pool(&self, pool_name: &str) -> Pool {
        self.registry.read().await.pool(pool_name)
    }

    pub async fn get_queue_stats(&self, now: DateTime<Utc>) -> Vec<QueueStats> {
        let registry = self.registry.read().await;
        registry
            .pool_names()
            .into_iter()
            .map(|name| registry.pool(&name))
            .filter(|pool| !pool.tickets.is_empty())
            .map(|pool| {
                let oldest_wait_seconds = pool
                    .tickets
                    .iter()
                    .map(|t| (now - t.created).num_seconds())
                    .max()
                    .unwrap_or(0);
                QueueStats {
                    pool: pool.name,
                    waiting: pool.tickets.len(),
                    oldest_wait_seconds,
                    min_players_needed: self.min_players,
                    max_players_per_match: self.max_players,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub pool: String,
    pub waiting: usize,
    pub oldest_wait_seconds: i64,
    pub min_players_needed: usize,
    pub max_players_per_match: usize,
}

impl Default for MatchmakingQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use peezme_core::TicketLifecycle;
    use peezme_types::{Privacy, TicketStatus, User};
    use std::sync::Arc;

    fn match_ticket(user: &str, now: DateTime<Utc>) -> Ticket {
        TicketLifecycle::open_match_ticket(
            User::new(user, user),
            "peezme".to_string(),
            Privacy::Public,
            Duration::minutes(5),
            now,
        )
    }

    #[tokio::test]
    async fn test_basic_queue_operations() {
        let queue = MatchmakingQueue::new();
        let now = Utc::now();
        let ticket = match_ticket("ann", now);
        let id = ticket.id.clone();

        let (position, draw) = queue.add_ticket(ticket, now).await.unwrap();
        assert_eq!(position, 1);
        assert!(draw.formed.is_none());
        assert!(queue.is_ticket_queued(&id).await);
        assert_eq!(queue.get_queue_position(&id).await, Some(1));

        assert!(queue.remove_ticket(&id).await.is_some());
        assert!(!queue.is_ticket_queued(&id).await);
        assert!(queue.remove_ticket(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_prevent_duplicate_queue_entries() {
        let queue = MatchmakingQueue::new_with_config(3, 4);
        let now = Utc::now();
        queue.add_ticket(match_ticket("ann", now), now).await.unwrap();

        let err = queue
            .add_ticket(match_ticket("ann", now), now)
            .await
            .unwrap_err();
        assert!(matches!(err, TicketError::AlreadyQueued { .. }));
        assert_eq!(queue.pool("peezme:public").await.tickets.len(), 1);
    }

    #[tokio::test]
    async fn test_match_forms_at_minimum_players() {
        let queue = MatchmakingQueue::new_with_config(2, 4);
        let now = Utc::now();
        queue.add_ticket(match_ticket("ann", now), now).await.unwrap();
        let (_, draw) = queue.add_ticket(match_ticket("bob", now), now).await.unwrap();

        let (game_match, tickets) = draw.formed.unwrap();
        assert_eq!(game_match.players.len(), 2);
        assert_eq!(game_match.players[0].id, "ann");
        assert!(tickets.iter().all(|t| t.status == TicketStatus::Ready));
        assert!(queue.get_queue_stats(now).await.is_empty());
    }

    #[tokio::test]
    async fn test_expired_tickets_leave_the_pool() {
        let queue = MatchmakingQueue::new_with_config(3, 4);
        let now = Utc::now();
        queue.add_ticket(match_ticket("ann", now), now).await.unwrap();

        let stats = queue.get_queue_stats(now + Duration::seconds(30)).await;
        assert_eq!(stats[0].waiting, 1);
        assert_eq!(stats[0].oldest_wait_seconds, 30);

        let expired = queue
            .cleanup_expired_tickets(now + Duration::minutes(6))
            .await;
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].status, TicketStatus::Ended);
        assert!(queue.pool("peezme:public").await.tickets.is_empty());
    }

    #[tokio::test]
    async fn test_join_after_deadline_ends_the_lapsed_ticket() {
        let queue = MatchmakingQueue::new_with_config(2, 4);
        let now = Utc::now();
        queue.add_ticket(match_ticket("ann", now), now).await.unwrap();

        let later = now + Duration::minutes(10);
        let (position, draw) = queue.add_ticket(match_ticket("bob", later), later).await.unwrap();
        assert_eq!(position, 2);
        assert!(draw.formed.is_none());
        assert_eq!(draw.expired.len(), 1);
        assert_eq!(draw.expired[0].created_by, "ann");
        assert_eq!(draw.expired[0].status, TicketStatus::Ended);

        let pool = queue.pool("peezme:public").await;
        assert_eq!(pool.tickets.len(), 1);
        assert_eq!(pool.tickets[0].created_by, "bob");
    }

    #[tokio::test]
    async fn test_requeued_tickets_match_again() {
        let queue = MatchmakingQueue::new_with_config(2, 2);
        let now = Utc::now();
        let ann = match_ticket("ann", now);
        let bob = match_ticket("bob", now);
        queue.restore_ticket(ann.clone()).await.unwrap();
        assert_eq!(queue.get_queue_position(&ann.id).await, Some(1));
        assert!(queue.try_create_match("peezme:public", now).await.formed.is_none());

        queue.remove_ticket(&ann.id).await;
        queue.requeue(vec![ann.clone(), bob]).await;
        let (game_match, _) = queue
            .try_create_match("peezme:public", now)
            .await
            .formed
            .unwrap();
        assert_eq!(game_match.ticket_id, ann.id);
    }

    #[tokio::test]
    async fn test_concurrent_joins_never_share_a_ticket() {
        let queue = Arc::new(MatchmakingQueue::new_with_config(2, 2));
        let now = Utc::now();
        let mut handles = Vec::new();
        for i in 0..8 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .add_ticket(match_ticket(&format!("user{}", i), now), now)
                    .await
                    .unwrap()
                    .1
                    .formed
            }));
        }

        let mut seen = std::collections::HashSet::new();
        let mut matches = 0;
        for handle in handles {
            if let Some((_, tickets)) = handle.await.unwrap() {
                matches += 1;
                for ticket in tickets {
                    assert!(seen.insert(ticket.id));
                }
            }
        }
        assert_eq!(matches, 4);
        assert_eq!(seen.len(), 8);
    }
}
