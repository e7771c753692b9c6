use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{Resource, TicketError};
use crate::models::{Event, Ticket, User};
use crate::store::{NewEvent, NewUser, TicketStore};

/// In-memory store for tests and local development. A single mutex guards
/// all state, so reserve/release sequences are linearizable by construction
/// and behave like the Postgres backend's serializable transactions.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_next_create: AtomicBool,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    events: HashMap<Uuid, Event>,
    tickets: Vec<Ticket>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `create_reservation` fail after its capacity check,
    /// simulating a storage fault mid-reservation. The failed call must
    /// leave the seat count untouched.
    pub fn fail_next_create(&self) {
        self.fail_next_create.store(true, Ordering::SeqCst);
    }
}

fn injected_fault() -> TicketError {
    TicketError::Storage(sqlx::Error::PoolClosed)
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, TicketError> {
        let mut inner = self.inner.lock().await;
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            created_at: Utc::now(),
        };
        inner.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn user_exists(&self, user_id: Uuid) -> Result<bool, TicketError> {
        Ok(self.inner.lock().await.users.contains_key(&user_id))
    }

    async fn create_event(&self, event: NewEvent) -> Result<Event, TicketError> {
        let mut inner = self.inner.lock().await;
        let created = Event {
            id: Uuid::new_v4(),
            title: event.title,
            description: event.description,
            price: event.price,
            total_seats: event.total_seats,
            remaining_seats: event.total_seats,
            starts_at: event.starts_at,
        };
        inner.events.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>, TicketError> {
        Ok(self.inner.lock().await.events.get(&event_id).cloned())
    }

    async fn list_events(&self) -> Result<Vec<Event>, TicketError> {
        Ok(self.inner.lock().await.events.values().cloned().collect())
    }

    async fn count_user_tickets(&self, user_id: Uuid, event_id: Uuid) -> Result<i64, TicketError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tickets
            .iter()
            .filter(|t| t.user_id == user_id && t.event_id == event_id)
            .count() as i64)
    }

    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, TicketError> {
        let inner = self.inner.lock().await;
        Ok(inner.tickets.iter().find(|t| t.id == ticket_id).cloned())
    }

    async fn list_tickets(&self, user_id: Option<Uuid>) -> Result<Vec<Ticket>, TicketError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tickets
            .iter()
            .filter(|t| user_id.map_or(true, |uid| t.user_id == uid))
            .cloned()
            .collect())
    }

    async fn list_reservation_tickets(
        &self,
        reservation_id: Uuid,
    ) -> Result<Vec<Ticket>, TicketError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tickets
            .iter()
            .filter(|t| t.reservation_id == reservation_id)
            .cloned()
            .collect())
    }

    async fn create_reservation(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        quantity: i32,
        price: Decimal,
        reservation_id: Uuid,
    ) -> Result<Vec<Ticket>, TicketError> {
        let mut inner = self.inner.lock().await;

        let remaining = inner
            .events
            .get(&event_id)
            .map(|e| e.remaining_seats)
            .ok_or(TicketError::NotFound(Resource::Event(event_id)))?;
        if remaining < quantity {
            return Err(TicketError::SoldOut { remaining });
        }

        // nothing has been mutated yet, so an injected fault here matches a
        // rolled-back transaction in the Postgres backend
        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(injected_fault());
        }

        let tickets: Vec<Ticket> = (0..quantity)
            .map(|_| Ticket {
                id: Uuid::new_v4(),
                event_id,
                user_id,
                price_at_purchase: price,
                reservation_id,
                paid: false,
                confirmation_code: None,
                purchased_at: None,
            })
            .collect();

        let event = inner.events.get_mut(&event_id).expect("event checked above");
        event.remaining_seats -= quantity;
        inner.tickets.extend(tickets.iter().cloned());
        Ok(tickets)
    }

    async fn mark_paid(
        &self,
        ticket_id: Uuid,
        confirmation_code: &str,
        purchased_at: DateTime<Utc>,
    ) -> Result<Ticket, TicketError> {
        let mut inner = self.inner.lock().await;
        let ticket = inner
            .tickets
            .iter_mut()
            .find(|t| t.id == ticket_id)
            .ok_or(TicketError::NotFound(Resource::Ticket(ticket_id)))?;
        if ticket.paid {
            return Err(TicketError::AlreadyConfirmed(ticket_id));
        }
        ticket.paid = true;
        ticket.confirmation_code = Some(confirmation_code.to_string());
        ticket.purchased_at = Some(purchased_at);
        Ok(ticket.clone())
    }

    async fn delete_ticket(&self, ticket_id: Uuid) -> Result<Ticket, TicketError> {
        let mut inner = self.inner.lock().await;
        let pos = inner
            .tickets
            .iter()
            .position(|t| t.id == ticket_id)
            .ok_or(TicketError::NotFound(Resource::Ticket(ticket_id)))?;
        let ticket = inner.tickets.remove(pos);
        if let Some(event) = inner.events.get_mut(&ticket.event_id) {
            event.remaining_seats = (event.remaining_seats + 1).min(event.total_seats);
        }
        Ok(ticket)
    }

    async fn delete_all_tickets(&self, event_id: Option<Uuid>) -> Result<u64, TicketError> {
        let mut inner = self.inner.lock().await;
        let (deleted, kept): (Vec<Ticket>, Vec<Ticket>) = inner
            .tickets
            .drain(..)
            .partition(|t| event_id.map_or(true, |eid| t.event_id == eid));
        inner.tickets = kept;
        for ticket in &deleted {
            if let Some(event) = inner.events.get_mut(&ticket.event_id) {
                event.remaining_seats = (event.remaining_seats + 1).min(event.total_seats);
            }
        }
        Ok(deleted.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn store_with_event(total_seats: i32) -> (MemoryStore, Uuid, Uuid) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        rt.block_on(async {
            let store = MemoryStore::new();
            let user = store
                .create_user(NewUser {
                    email: "a@example.com".into(),
                    name: "A".into(),
                })
                .await
                .unwrap();
            let event = store
                .create_event(NewEvent {
                    title: "gig".into(),
                    description: None,
                    price: Decimal::new(2000, 2),
                    total_seats,
                    starts_at: None,
                })
                .await
                .unwrap();
            (store, user.id, event.id)
        })
    }

    #[tokio::test]
    async fn reserve_rejects_when_capacity_insufficient() {
        let store = MemoryStore::new();
        let event = store
            .create_event(NewEvent {
                title: "gig".into(),
                description: None,
                price: Decimal::new(1000, 2),
                total_seats: 2,
                starts_at: None,
            })
            .await
            .unwrap();

        let err = store
            .create_reservation(Uuid::new_v4(), event.id, 3, event.price, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, TicketError::SoldOut { remaining: 2 }));

        // the failed attempt left the ledger untouched
        let event = store.get_event(event.id).await.unwrap().unwrap();
        assert_eq!(event.remaining_seats, 2);
    }

    #[tokio::test]
    async fn release_never_exceeds_total() {
        let store = MemoryStore::new();
        let event = store
            .create_event(NewEvent {
                title: "gig".into(),
                description: None,
                price: Decimal::new(1000, 2),
                total_seats: 5,
                starts_at: None,
            })
            .await
            .unwrap();

        let tickets = store
            .create_reservation(Uuid::new_v4(), event.id, 2, event.price, Uuid::new_v4())
            .await
            .unwrap();
        for t in &tickets {
            store.delete_ticket(t.id).await.unwrap();
        }

        let event = store.get_event(event.id).await.unwrap().unwrap();
        assert_eq!(event.remaining_seats, 5);
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .create_reservation(Uuid::new_v4(), Uuid::new_v4(), 1, Decimal::ONE, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, TicketError::NotFound(Resource::Event(_))));
    }

    proptest! {
        // conservation invariant: remaining + live tickets == total across
        // any sequence of reservations and cancellations
        #[test]
        fn seats_are_conserved(ops in proptest::collection::vec(0u8..=4, 1..40)) {
            let (store, user_id, event_id) = store_with_event(8);
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                for op in ops {
                    match op {
                        0..=2 => {
                            let quantity = i32::from(op) + 1;
                            let _ = store
                                .create_reservation(
                                    user_id,
                                    event_id,
                                    quantity,
                                    Decimal::new(2000, 2),
                                    Uuid::new_v4(),
                                )
                                .await;
                        }
                        3 => {
                            let first = store.list_tickets(None).await.unwrap().first().cloned();
                            if let Some(t) = first {
                                store.delete_ticket(t.id).await.unwrap();
                            }
                        }
                        _ => {
                            let last = store.list_tickets(None).await.unwrap().last().cloned();
                            if let Some(t) = last {
                                // confirmation must not touch the ledger
                                let _ = store.mark_paid(t.id, "code", Utc::now()).await;
                            }
                        }
                    }

                    let event = store.get_event(event_id).await.unwrap().unwrap();
                    let live = store.list_tickets(None).await.unwrap().len() as i32;
                    prop_assert!(event.remaining_seats >= 0);
                    prop_assert_eq!(event.remaining_seats + live, event.total_seats);
                }
                Ok(())
            })?;
        }
    }
}
