use peezme_core::LobbyDirectory;
use peezme_types::{Lobby, LobbyError, Match, Privacy, Room, RoomCreateRequest, RoomId, User};
use tokio::sync::RwLock;
use tracing::debug;

/// Shared room directory. Readers see a consistent snapshot; every
/// mutation holds the write lock for its whole validate-then-apply step.
pub struct LobbyService {
    directory: RwLock<LobbyDirectory>,
}

impl LobbyService {
    pub fn new(max_room_size: u32) -> Self {
        Self {
            directory: RwLock::new(LobbyDirectory::new(max_room_size)),
        }
    }

    pub async fn lobby(&self) -> Lobby {
        self.directory.read().await.lobby()
    }

    pub async fn list(&self, privacy: Privacy) -> Vec<Room> {
        self.directory.read().await.list(privacy)
    }

    pub async fn room(&self, room_id: &str) -> Option<Room> {
        self.directory.read().await.room(room_id).cloned()
    }

    pub async fn place_match(&self, game_match: &Match) -> Result<Room, LobbyError> {
        self.directory.write().await.place_match(game_match)
    }

    pub async fn create_room(&self, request: RoomCreateRequest) -> Result<Room, LobbyError> {
        self.directory.write().await.create_room(
            request.room_name,
            request.room_id,
            request.privacy,
            request.user,
        )
    }

    pub async fn join_room(&self, room_id: &str, user: User) -> Result<Room, LobbyError> {
        self.directory.write().await.join_room(room_id, user)
    }

    pub async fn leave_room(&self, room_id: &str, user_id: &str) -> Result<Room, LobbyError> {
        self.directory.write().await.remove_user(room_id, user_id)
    }

    pub async fn close_room(&self, room_id: &str, by_user_id: &str) -> Result<Room, LobbyError> {
        self.directory.write().await.close_room(room_id, by_user_id)
    }

    /// Remove a departing player from a game's room, if they are still in it.
    pub async fn release_player(&self, room_id: &RoomId, user_id: &str) {
        match self.leave_room(room_id, user_id).await {
            Ok(room) => debug!(room_id = %room.id, user_id = %user_id, "Released player from room"),
            Err(e) => debug!(room_id = %room_id, user_id = %user_id, "Nothing to release: {}", e),
        }
    }
}
