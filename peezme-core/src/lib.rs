pub mod cleanup;
pub mod game_events;
pub mod game_state;
pub mod hazards;
pub mod lobby;
pub mod pool;
pub mod scoring;
pub mod ticket;
pub mod word_validation;

// Re-export main components
pub use cleanup::*;
pub use game_events::*;
pub use game_state::*;
pub use hazards::*;
pub use lobby::*;
pub use pool::*;
pub use scoring::*;
pub use ticket::*;
pub use word_validation::*;
