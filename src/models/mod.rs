pub mod event;
pub mod ticket;
pub mod user;

pub use event::Event;
pub use ticket::Ticket;
pub use user::User;
