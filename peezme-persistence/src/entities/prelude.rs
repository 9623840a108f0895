pub use super::games::Entity as Games;
pub use super::tickets::Entity as Tickets;
