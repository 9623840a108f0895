use peezme_types::{Lobby, LobbyError, Match, Privacy, Room, RoomId, User};
use tracing::{debug, info};
use uuid::Uuid;

/// Rooms in creation order. Every operation validates before it mutates.
pub struct LobbyDirectory {
    rooms: Vec<Room>,
    max_room_size: u32,
}

impl LobbyDirectory {
    pub fn new(max_room_size: u32) -> Self {
        Self {
            rooms: Vec::new(),
            max_room_size: max_room_size.max(1),
        }
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == room_id)
    }

    fn room_mut(&mut self, room_id: &str) -> Result<&mut Room, LobbyError> {
        self.rooms
            .iter_mut()
            .find(|r| r.id == room_id)
            .ok_or_else(|| LobbyError::RoomNotFound {
                room_id: room_id.to_string(),
            })
    }

    /// Seat a match's players in its target room, or a fresh room when the
    /// match names none.
    pub fn place_match(&mut self, game_match: &Match) -> Result<Room, LobbyError> {
        let max_room_size = self.max_room_size;
        let room_id = game_match
            .room
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if self.room(&room_id).is_none() {
            let creator = game_match.players.first().map(|p| p.id.clone()).unwrap_or_default();
            self.check_size(&room_id, 0, game_match.players.len())?;
            self.rooms.push(Room {
                id: room_id.clone(),
                name: format!("{} {}", game_match.game_type, &game_match.id),
                privacy: game_match.room_type,
                active: true,
                created_by: creator,
                users: Vec::new(),
            });
        }

        let room = self.room_mut(&room_id)?;
        let joining: Vec<&User> = game_match
            .players
            .iter()
            .filter(|p| !room.has_user(&p.id))
            .collect();
        if room.users.len() + joining.len() > max_room_size as usize {
            return Err(LobbyError::RoomFull {
                room_id,
                capacity: max_room_size,
                requested: joining.len() as u32,
            });
        }

        room.users.extend(joining.into_iter().cloned());
        room.active = true;
        info!(room_id = %room.id, match_id = %game_match.id, "Match placed in room");
        Ok(room.clone())
    }

    pub fn create_room(
        &mut self,
        name: String,
        room_id: Option<RoomId>,
        privacy: Privacy,
        creator: User,
    ) -> Result<Room, LobbyError> {
        let room_id = room_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        if self.room(&room_id).is_some() {
            return Err(LobbyError::RoomExists { room_id });
        }

        let room = Room {
            id: room_id,
            name,
            privacy,
            active: true,
            created_by: creator.id.clone(),
            users: vec![creator],
        };
        info!(room_id = %room.id, privacy = %room.privacy, "Room created");
        self.rooms.push(room.clone());
        Ok(room)
    }

    /// Add a user to a room. Joining a room you are already in is a no-op.
    pub fn join_room(&mut self, room_id: &str, user: User) -> Result<Room, LobbyError> {
        let max_room_size = self.max_room_size;
        let room = self.room_mut(room_id)?;
        if room.has_user(&user.id) {
            return Ok(room.clone());
        }
        if room.users.len() >= max_room_size as usize {
            return Err(LobbyError::RoomFull {
                room_id: room_id.to_string(),
                capacity: max_room_size,
                requested: 1,
            });
        }

        debug!(room_id = %room_id, user_id = %user.id, "User joined room");
        room.users.push(user);
        room.active = true;
        Ok(room.clone())
    }

    /// Take a user out of a room; the room goes inactive once empty.
    pub fn remove_user(&mut self, room_id: &str, user_id: &str) -> Result<Room, LobbyError> {
        let room = self.room_mut(room_id)?;
        let index = room
            .users
            .iter()
            .position(|u| u.id == user_id)
            .ok_or_else(|| LobbyError::NotInRoom {
                room_id: room_id.to_string(),
                user_id: user_id.to_string(),
            })?;

        room.users.remove(index);
        if room.users.is_empty() {
            room.active = false;
            info!(room_id = %room_id, "Room emptied, deactivated");
        }
        Ok(room.clone())
    }

    pub fn close_room(&mut self, room_id: &str, by_user_id: &str) -> Result<Room, LobbyError> {
        let room = self.room_mut(room_id)?;
        if room.created_by != by_user_id {
            return Err(LobbyError::NotRoomCreator {
                room_id: room_id.to_string(),
            });
        }
        room.active = false;
        room.users.clear();
        info!(room_id = %room_id, "Room closed");
        Ok(room.clone())
    }

    /// Active rooms of one visibility, oldest first.
    pub fn list(&self, privacy: Privacy) -> Vec<Room> {
        self.rooms
            .iter()
            .filter(|r| r.active && r.privacy == privacy)
            .cloned()
            .collect()
    }

    pub fn lobby(&self) -> Lobby {
        Lobby {
            public: self.list(Privacy::Public),
            private: self.list(Privacy::Private),
        }
    }

    fn check_size(&self, room_id: &str, present: usize, joining: usize) -> Result<(), LobbyError> {
        if present + joining > self.max_room_size as usize {
            return Err(LobbyError::RoomFull {
                room_id: room_id.to_string(),
                capacity: self.max_room_size,
                requested: joining as u32,
            });
        }
        Ok(())
    }
}
