pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::TicketError;
use crate::models::{Event, Ticket, User};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub total_seats: i32,
    pub starts_at: Option<DateTime<Utc>>,
}

/// Durable storage behind the reservation engine: the capacity ledger, the
/// ticket records, and the identity/catalog lookups the workflows need.
///
/// Operations that touch capacity together with ticket rows
/// (`create_reservation`, `delete_ticket`, `delete_all_tickets`) are atomic
/// within a single call; each backend owns its own transaction or lock
/// discipline. `events.remaining_seats` is mutated exclusively through these
/// methods, never via read-then-write from calling code.
#[async_trait]
pub trait TicketStore: Send + Sync {
    // --- identity / catalog ---
    async fn create_user(&self, user: NewUser) -> Result<User, TicketError>;
    async fn user_exists(&self, user_id: Uuid) -> Result<bool, TicketError>;
    async fn create_event(&self, event: NewEvent) -> Result<Event, TicketError>;
    async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>, TicketError>;
    async fn list_events(&self) -> Result<Vec<Event>, TicketError>;

    // --- ticket records ---
    /// Tickets held by a user for one event, in any payment state.
    async fn count_user_tickets(&self, user_id: Uuid, event_id: Uuid) -> Result<i64, TicketError>;
    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, TicketError>;
    async fn list_tickets(&self, user_id: Option<Uuid>) -> Result<Vec<Ticket>, TicketError>;
    async fn list_reservation_tickets(
        &self,
        reservation_id: Uuid,
    ) -> Result<Vec<Ticket>, TicketError>;

    // --- capacity ledger + atomic workflows ---
    /// Atomically checks remaining capacity, decrements it by `quantity` and
    /// creates `quantity` pending tickets sharing `reservation_id`. Fails
    /// with `SoldOut` (naming the remaining seats) when capacity is
    /// insufficient; any failure leaves both the ledger and the ticket
    /// records untouched.
    async fn create_reservation(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        quantity: i32,
        price: Decimal,
        reservation_id: Uuid,
    ) -> Result<Vec<Ticket>, TicketError>;

    /// Pending -> paid transition. Conditional: a ticket that is already
    /// paid yields `AlreadyConfirmed`, an unknown id `NotFound`. Does not
    /// touch the capacity ledger.
    async fn mark_paid(
        &self,
        ticket_id: Uuid,
        confirmation_code: &str,
        purchased_at: DateTime<Utc>,
    ) -> Result<Ticket, TicketError>;

    /// Deletes one ticket and releases its seat in the same transaction.
    async fn delete_ticket(&self, ticket_id: Uuid) -> Result<Ticket, TicketError>;

    /// Deletes all tickets (optionally scoped to one event), releasing the
    /// aggregate per-event quantities in the same transaction. Returns the
    /// number of deleted tickets.
    async fn delete_all_tickets(&self, event_id: Option<Uuid>) -> Result<u64, TicketError>;
}
