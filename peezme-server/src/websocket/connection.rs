use std::fmt;
use std::time::Instant;

use dashmap::DashMap;
use peezme_core::EventHandler;
use peezme_types::PeezMeEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which events a connection wants. Empty means everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub ticket_id: Option<String>,
    #[serde(default)]
    pub game_id: Option<String>,
}

impl Subscription {
    pub fn matches(&self, event: &PeezMeEvent) -> bool {
        if let Some(ticket_id) = &self.ticket_id {
            if event.ticket_id() != Some(ticket_id.as_str()) {
                return false;
            }
        }
        if let Some(game_id) = &self.game_id {
            let ticket_game = match event {
                PeezMeEvent::MatchFormed { delta, .. } | PeezMeEvent::TicketClosed { delta, .. } => {
                    delta.game_id.as_deref()
                }
                _ => None,
            };
            if event.game_id() != Some(game_id.as_str()) && ticket_game != Some(game_id.as_str()) {
                return false;
            }
        }
        if let Some(user_id) = &self.user_id {
            return Self::involves(event, user_id);
        }
        true
    }

    fn involves(event: &PeezMeEvent, user_id: &str) -> bool {
        match event {
            PeezMeEvent::TicketCreated { delta, .. }
            | PeezMeEvent::TicketUpdated { delta, .. }
            | PeezMeEvent::MatchFormed { delta, .. }
            | PeezMeEvent::TicketClosed { delta, .. } => {
                delta.created_by == user_id || delta.is_invited(user_id)
            }
            PeezMeEvent::PlayerLeft { data, delta } => {
                data.user_id == user_id || delta.is_player(user_id)
            }
            PeezMeEvent::WordSubmitted { delta, .. } | PeezMeEvent::GameOver { delta, .. } => {
                delta.is_player(user_id)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub subscription: Subscription,
    pub connected_at: Instant,
    pub last_activity: Instant,
    pub sender: mpsc::UnboundedSender<PeezMeEvent>,
}

impl Connection {
    pub fn new(
        id: ConnectionId,
        subscription: Subscription,
    ) -> (Self, mpsc::UnboundedReceiver<PeezMeEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let now = Instant::now();

        let connection = Self {
            id,
            subscription,
            connected_at: now,
            last_activity: now,
            sender,
        };

        (connection, receiver)
    }

    pub fn send_event(&self, event: PeezMeEvent) -> Result<(), String> {
        self.sender
            .send(event)
            .map_err(|_| "Connection closed".to_string())
    }
}

/// Live event subscribers. Registered on the event bus, so every published
/// delta is fanned out to the connections whose subscription matches.
#[derive(Default)]
pub struct ConnectionManager {
    connections: DashMap<ConnectionId, Connection>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_connection(
        &self,
        id: ConnectionId,
        subscription: Subscription,
    ) -> mpsc::UnboundedReceiver<PeezMeEvent> {
        let (connection, receiver) = Connection::new(id, subscription);
        self.connections.insert(id, connection);
        receiver
    }

    pub fn remove_connection(&self, id: ConnectionId) {
        self.connections.remove(&id);
    }

    pub fn update_subscription(&self, id: ConnectionId, subscription: Subscription) -> bool {
        match self.connections.get_mut(&id) {
            Some(mut connection) => {
                connection.subscription = subscription;
                connection.last_activity = Instant::now();
                true
            }
            None => false,
        }
    }

    pub fn send_to_connection(&self, id: ConnectionId, event: PeezMeEvent) -> Result<(), String> {
        match self.connections.get(&id) {
            Some(connection) => connection.send_event(event),
            None => Err("Connection not found".to_string()),
        }
    }

    /// Deliver to every matching subscriber; returns how many got it.
    pub fn broadcast(&self, event: &PeezMeEvent) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();
        for connection in self.connections.iter() {
            if !connection.subscription.matches(event) {
                continue;
            }
            match connection.send_event(event.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => closed.push(connection.id),
            }
        }
        for id in closed {
            debug!(connection_id = %id, "Dropping closed subscriber");
            self.connections.remove(&id);
        }
        delivered
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl EventHandler for ConnectionManager {
    fn handle_event(&self, event: &PeezMeEvent) {
        let delivered = self.broadcast(event);
        debug!(event = event.type_name(), delivered, "Event fanned out");
    }
}
