use std::sync::Arc;

use chrono::{DateTime, Utc};
use peezme_core::{EventBus, SweepReport, WordValidator};
use peezme_persistence::{DatabaseManager, GameStore, InMemoryStore, TicketStore};
use peezme_types::ServiceInfo;
use tracing::info;

use crate::config::Config;
use crate::errors::ApiResult;
use crate::game_manager::GameManager;
use crate::lobby_service::LobbyService;
use crate::locks::KeyedLocks;
use crate::matchmaking::MatchmakingQueue;
use crate::ticket_manager::{RetryPolicy, TicketManager};
use crate::websocket::ConnectionManager;

#[derive(Clone)]
pub struct Stores {
    pub tickets: Arc<dyn TicketStore>,
    pub games: Arc<dyn GameStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            tickets: store.clone(),
            games: store,
        }
    }

    /// `memory` selects the in-process store; anything else is a database URL.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        if database_url == "memory" {
            info!("Using in-memory store");
            return Ok(Self::in_memory());
        }
        let db = DatabaseManager::connect(database_url).await?;
        info!("Connected to database");
        Ok(Self {
            tickets: Arc::new(db.ticket_repository()),
            games: Arc::new(db.game_repository()),
        })
    }
}

/// Everything the routes share.
#[derive(Clone)]
pub struct AppState {
    pub service: ServiceInfo,
    pub tickets: Arc<TicketManager>,
    pub games: Arc<GameManager>,
    pub lobby: Arc<LobbyService>,
    pub connections: Arc<ConnectionManager>,
}

impl AppState {
    pub fn build(config: &Config, stores: Stores, dictionary: Arc<WordValidator>) -> Self {
        let connections = Arc::new(ConnectionManager::new());
        let mut events = EventBus::new();
        events.add_handler(connections.clone());

        let lobby = Arc::new(LobbyService::new(config.max_room_size));
        let ticket_locks = Arc::new(KeyedLocks::new());
        let games = Arc::new(GameManager::new(
            &stores,
            ticket_locks.clone(),
            dictionary,
            config.game_rules(),
            config.words_per_game,
            lobby.clone(),
            events.clone(),
        ));
        let tickets = Arc::new(TicketManager::new(
            stores.tickets.clone(),
            ticket_locks,
            MatchmakingQueue::new_with_config(config.pool_min_players, config.pool_max_players),
            games.clone(),
            lobby.clone(),
            events,
            config.ticket_ttl(),
            RetryPolicy {
                attempts: config.respond_retry_attempts,
                backoff: config.respond_backoff(),
            },
        ));

        Self {
            service: ServiceInfo {
                service: config.service_name.clone(),
                revision: config.service_revision.clone(),
            },
            tickets,
            games,
            lobby,
            connections,
        }
    }

    /// One pass of the timeout sweep: expire due tickets, skip timed-out turns.
    pub async fn sweep(&self, now: DateTime<Utc>) -> ApiResult<SweepReport> {
        let (tickets_expired, pooled_tickets_expired) = self.tickets.expire_due(now).await?;
        let turns_skipped = self.games.skip_expired_turns(now).await?;
        Ok(SweepReport {
            tickets_expired,
            pooled_tickets_expired,
            turns_skipped,
        })
    }
}
