pub mod errors;
pub mod events;
pub mod game;
pub mod lobby;
pub mod messages;
pub mod schema;
pub mod ticket;
pub mod user;

pub type UserId = String;
pub type TicketId = String;
pub type GameId = String;
pub type RoomId = String;

// Re-export all types
pub use errors::*;
pub use events::*;
pub use game::*;
pub use lobby::*;
pub use messages::*;
pub use ticket::*;
pub use user::*;
