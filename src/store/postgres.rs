use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Resource, TicketError};
use crate::models::{Event, Ticket, User};
use crate::store::{NewEvent, NewUser, TicketStore};

const TICKET_COLUMNS: &str =
    "id, event_id, user_id, price_at_purchase, reservation_id, paid, confirmation_code, purchased_at";

const EVENT_COLUMNS: &str =
    "id, title, description, price, total_seats, remaining_seats, starts_at";

/// Postgres-backed store. All capacity mutations go through conditional
/// updates checked by affected-row count, so two concurrent reservations can
/// never both pass the capacity check against the same seats.
#[derive(Clone)]
pub struct PgStore {
    db: Database,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        PgStore { db }
    }
}

#[async_trait]
impl TicketStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, TicketError> {
        let created = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email, name)
             VALUES ($1, $2, $3)
             RETURNING id, email, name, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.name)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(created)
    }

    async fn user_exists(&self, user_id: Uuid) -> Result<bool, TicketError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)",
        )
        .bind(user_id)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(exists)
    }

    async fn create_event(&self, event: NewEvent) -> Result<Event, TicketError> {
        let query = format!(
            "INSERT INTO events (id, title, description, price, total_seats, remaining_seats, starts_at)
             VALUES ($1, $2, $3, $4, $5, $5, $6)
             RETURNING {EVENT_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Event>(&query)
            .bind(Uuid::new_v4())
            .bind(&event.title)
            .bind(&event.description)
            .bind(event.price)
            .bind(event.total_seats)
            .bind(event.starts_at)
            .fetch_one(&self.db.pool)
            .await?;
        Ok(created)
    }

    async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>, TicketError> {
        let query = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        let event = sqlx::query_as::<_, Event>(&query)
            .bind(event_id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(event)
    }

    async fn list_events(&self) -> Result<Vec<Event>, TicketError> {
        let query = format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY created_at DESC");
        let events = sqlx::query_as::<_, Event>(&query)
            .fetch_all(&self.db.pool)
            .await?;
        Ok(events)
    }

    async fn count_user_tickets(&self, user_id: Uuid, event_id: Uuid) -> Result<i64, TicketError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tickets WHERE user_id = $1 AND event_id = $2",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(count)
    }

    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, TicketError> {
        let query = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1");
        let ticket = sqlx::query_as::<_, Ticket>(&query)
            .bind(ticket_id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(ticket)
    }

    async fn list_tickets(&self, user_id: Option<Uuid>) -> Result<Vec<Ticket>, TicketError> {
        let tickets = match user_id {
            Some(uid) => {
                let query = format!(
                    "SELECT {TICKET_COLUMNS} FROM tickets WHERE user_id = $1 ORDER BY created_at DESC"
                );
                sqlx::query_as::<_, Ticket>(&query)
                    .bind(uid)
                    .fetch_all(&self.db.pool)
                    .await?
            }
            None => {
                let query = format!("SELECT {TICKET_COLUMNS} FROM tickets ORDER BY created_at DESC");
                sqlx::query_as::<_, Ticket>(&query)
                    .fetch_all(&self.db.pool)
                    .await?
            }
        };
        Ok(tickets)
    }

    async fn list_reservation_tickets(
        &self,
        reservation_id: Uuid,
    ) -> Result<Vec<Ticket>, TicketError> {
        let query = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE reservation_id = $1 ORDER BY created_at"
        );
        let tickets = sqlx::query_as::<_, Ticket>(&query)
            .bind(reservation_id)
            .fetch_all(&self.db.pool)
            .await?;
        Ok(tickets)
    }

    async fn create_reservation(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        quantity: i32,
        price: Decimal,
        reservation_id: Uuid,
    ) -> Result<Vec<Ticket>, TicketError> {
        let mut tx = self.db.pool.begin().await?;

        // Single atomic check-and-decrement. Zero affected rows means the
        // capacity check failed; nothing has been written at that point.
        let decremented = sqlx::query_scalar::<_, i32>(
            "UPDATE events
             SET remaining_seats = remaining_seats - $2
             WHERE id = $1 AND remaining_seats >= $2
             RETURNING remaining_seats",
        )
        .bind(event_id)
        .bind(quantity)
        .fetch_optional(&mut *tx)
        .await?;

        if decremented.is_none() {
            // re-read inside the transaction, right after the refused
            // update, so the reported count cannot have grown past the
            // quantity that was just rejected
            let remaining = sqlx::query_scalar::<_, i32>(
                "SELECT remaining_seats FROM events WHERE id = $1",
            )
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?;
            tx.rollback().await?;
            let remaining =
                remaining.ok_or(TicketError::NotFound(Resource::Event(event_id)))?;
            return Err(TicketError::SoldOut { remaining });
        }

        let insert = format!(
            "INSERT INTO tickets (id, event_id, user_id, price_at_purchase, reservation_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {TICKET_COLUMNS}"
        );
        let mut tickets = Vec::with_capacity(quantity as usize);
        for _ in 0..quantity {
            // an insert failure drops the transaction and rolls back the
            // capacity decrement along with any tickets created so far
            let ticket = sqlx::query_as::<_, Ticket>(&insert)
                .bind(Uuid::new_v4())
                .bind(event_id)
                .bind(user_id)
                .bind(price)
                .bind(reservation_id)
                .fetch_one(&mut *tx)
                .await?;
            tickets.push(ticket);
        }

        tx.commit().await?;
        Ok(tickets)
    }

    async fn mark_paid(
        &self,
        ticket_id: Uuid,
        confirmation_code: &str,
        purchased_at: DateTime<Utc>,
    ) -> Result<Ticket, TicketError> {
        let query = format!(
            "UPDATE tickets
             SET paid = TRUE, confirmation_code = $2, purchased_at = $3
             WHERE id = $1 AND paid = FALSE
             RETURNING {TICKET_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Ticket>(&query)
            .bind(ticket_id)
            .bind(confirmation_code)
            .bind(purchased_at)
            .fetch_optional(&self.db.pool)
            .await?;

        match updated {
            Some(ticket) => Ok(ticket),
            // zero rows: either the ticket is gone or it was already paid,
            // and a retried webhook must be able to tell the difference
            None => {
                let exists = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM tickets WHERE id = $1)",
                )
                .bind(ticket_id)
                .fetch_one(&self.db.pool)
                .await?;
                if exists {
                    Err(TicketError::AlreadyConfirmed(ticket_id))
                } else {
                    Err(TicketError::NotFound(Resource::Ticket(ticket_id)))
                }
            }
        }
    }

    async fn delete_ticket(&self, ticket_id: Uuid) -> Result<Ticket, TicketError> {
        let mut tx = self.db.pool.begin().await?;

        let query = format!("DELETE FROM tickets WHERE id = $1 RETURNING {TICKET_COLUMNS}");
        let deleted = sqlx::query_as::<_, Ticket>(&query)
            .bind(ticket_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(ticket) = deleted else {
            tx.rollback().await?;
            return Err(TicketError::NotFound(Resource::Ticket(ticket_id)));
        };

        // one seat back per deleted ticket, in the same transaction
        sqlx::query("UPDATE events SET remaining_seats = remaining_seats + 1 WHERE id = $1")
            .bind(ticket.event_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(ticket)
    }

    async fn delete_all_tickets(&self, event_id: Option<Uuid>) -> Result<u64, TicketError> {
        let mut tx = self.db.pool.begin().await?;

        // delete first and derive the release quantities from exactly the
        // rows removed; counting up front would miss a reservation that
        // commits between the count and the delete, leaking its seats
        let deleted_events: Vec<Uuid> = match event_id {
            Some(eid) => {
                sqlx::query_scalar(
                    "DELETE FROM tickets WHERE event_id = $1 RETURNING event_id",
                )
                .bind(eid)
                .fetch_all(&mut *tx)
                .await?
            }
            None => {
                sqlx::query_scalar("DELETE FROM tickets RETURNING event_id")
                    .fetch_all(&mut *tx)
                    .await?
            }
        };

        let mut per_event: HashMap<Uuid, i64> = HashMap::new();
        for eid in &deleted_events {
            *per_event.entry(*eid).or_insert(0) += 1;
        }

        for (eid, count) in &per_event {
            sqlx::query("UPDATE events SET remaining_seats = remaining_seats + $2 WHERE id = $1")
                .bind(eid)
                .bind(*count as i32)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(deleted_events.len() as u64)
    }
}
