pub mod codec;
pub mod connection;
pub mod entities;
pub mod repositories;

pub use repositories::*;

use sea_orm::DatabaseConnection;

/// Both sea-orm repositories over one shared connection.
pub struct DatabaseManager {
    connection: DatabaseConnection,
}

impl DatabaseManager {
    pub async fn connect(database_url: &str) -> Result<Self, sea_orm::DbErr> {
        let connection = connection::connect_and_migrate(database_url).await?;
        Ok(Self { connection })
    }

    pub fn get_connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    pub fn ticket_repository(&self) -> TicketRepository {
        TicketRepository::new(self.connection.clone())
    }

    pub fn game_repository(&self) -> GameRepository {
        GameRepository::new(self.connection.clone())
    }
}
