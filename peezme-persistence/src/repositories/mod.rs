pub mod game_repository;
pub mod memory;
pub mod ticket_repository;

pub use game_repository::GameRepository;
pub use memory::InMemoryStore;
pub use ticket_repository::TicketRepository;

use anyhow::Result;
use async_trait::async_trait;
use peezme_types::{Game, Ticket};

/// Ticket records keyed by ticket id.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn get_ticket(&self, id: &str) -> Result<Option<Ticket>>;

    /// Insert or replace.
    async fn save_ticket(&self, ticket: &Ticket) -> Result<()>;

    async fn delete_ticket(&self, id: &str) -> Result<bool>;

    /// The ticket bound to a game, if any.
    async fn find_ticket_by_game(&self, game_id: &str) -> Result<Option<Ticket>>;

    /// Tickets still collecting responses (New or Staged).
    async fn open_tickets(&self) -> Result<Vec<Ticket>>;
}

/// Game records keyed by game id.
#[async_trait]
pub trait GameStore: Send + Sync {
    async fn get_game(&self, id: &str) -> Result<Option<Game>>;

    async fn save_game(&self, game: &Game) -> Result<()>;

    async fn delete_game(&self, id: &str) -> Result<bool>;

    /// Games that have not reached GameOver.
    async fn active_games(&self) -> Result<Vec<Game>>;
}
