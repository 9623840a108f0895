use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use peezme_types::{Game, GameId, Ticket, TicketId, TicketStatus};
use tokio::sync::RwLock;

use super::{GameStore, TicketStore};

/// Process-local store, used for tests and when no database is configured.
#[derive(Default)]
pub struct InMemoryStore {
    tickets: RwLock<HashMap<TicketId, Ticket>>,
    games: RwLock<HashMap<GameId, Game>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketStore for InMemoryStore {
    async fn get_ticket(&self, id: &str) -> Result<Option<Ticket>> {
        Ok(self.tickets.read().await.get(id).cloned())
    }

    async fn save_ticket(&self, ticket: &Ticket) -> Result<()> {
        self.tickets
            .write()
            .await
            .insert(ticket.id.clone(), ticket.clone());
        Ok(())
    }

    async fn delete_ticket(&self, id: &str) -> Result<bool> {
        Ok(self.tickets.write().await.remove(id).is_some())
    }

    async fn find_ticket_by_game(&self, game_id: &str) -> Result<Option<Ticket>> {
        Ok(self
            .tickets
            .read()
            .await
            .values()
            .find(|t| t.game_id.as_deref() == Some(game_id))
            .cloned())
    }

    async fn open_tickets(&self) -> Result<Vec<Ticket>> {
        let mut open: Vec<Ticket> = self
            .tickets
            .read()
            .await
            .values()
            .filter(|t| t.status < TicketStatus::Ready)
            .cloned()
            .collect();
        open.sort_by_key(|t| t.created);
        Ok(open)
    }
}

#[async_trait]
impl GameStore for InMemoryStore {
    async fn get_game(&self, id: &str) -> Result<Option<Game>> {
        Ok(self.games.read().await.get(id).cloned())
    }

    async fn save_game(&self, game: &Game) -> Result<()> {
        self.games
            .write()
            .await
            .insert(game.game_id.clone(), game.clone());
        Ok(())
    }

    async fn delete_game(&self, id: &str) -> Result<bool> {
        Ok(self.games.write().await.remove(id).is_some())
    }

    async fn active_games(&self) -> Result<Vec<Game>> {
        Ok(self
            .games
            .read()
            .await
            .values()
            .filter(|g| !g.is_over())
            .cloned()
            .collect())
    }
}
