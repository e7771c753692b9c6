use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Resource, TicketError};
use crate::models::Ticket;
use crate::services::notify::Notifier;
use crate::store::TicketStore;

/// Per-user, per-event cap on held tickets in any payment state.
pub const MAX_TICKETS_PER_USER: i64 = 10;

/// Result of a successful purchase request: the grouping key shared by the
/// created tickets and the amount to hand to the payment gateway.
#[derive(Debug, Clone, Serialize)]
pub struct Reservation {
    pub reservation_id: Uuid,
    pub total_amount: Decimal,
    pub tickets: Vec<Ticket>,
}

/// Orchestrates the reservation, confirmation and cancellation workflows
/// over the ticket store. All capacity accounting happens inside the store's
/// atomic operations; this layer owns the preconditions and the error
/// surface.
#[derive(Clone)]
pub struct ReservationService {
    store: Arc<dyn TicketStore>,
    notifier: Arc<dyn Notifier>,
}

impl ReservationService {
    pub fn new(store: Arc<dyn TicketStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Reserves `quantity` seats for a user. Preconditions are checked
    /// before any durable write, so a failure at any step leaves no
    /// residue and the caller may retry immediately.
    pub async fn reserve(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        quantity: i32,
    ) -> Result<Reservation, TicketError> {
        if quantity < 1 {
            return Err(TicketError::InvalidInput(
                "quantity must be at least 1".to_string(),
            ));
        }

        if !self.store.user_exists(user_id).await? {
            return Err(TicketError::NotFound(Resource::User(user_id)));
        }
        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or(TicketError::NotFound(Resource::Event(event_id)))?;

        let held = self.store.count_user_tickets(user_id, event_id).await?;
        if held + i64::from(quantity) > MAX_TICKETS_PER_USER {
            return Err(TicketError::LimitExceeded {
                held,
                remaining: MAX_TICKETS_PER_USER - held,
            });
        }

        // price is copied onto each ticket here; later catalog price changes
        // do not affect this purchase
        let reservation_id = Uuid::new_v4();
        let tickets = self
            .store
            .create_reservation(user_id, event_id, quantity, event.price, reservation_id)
            .await?;

        let total_amount: Decimal = tickets.iter().map(|t| t.price_at_purchase).sum();
        info!(
            "reservation {} created: {} tickets for event {} (total {})",
            reservation_id, quantity, event_id, total_amount
        );

        Ok(Reservation {
            reservation_id,
            total_amount,
            tickets,
        })
    }

    /// Finalizes payment for one ticket. Capacity was committed at
    /// reservation time; this only transitions pending -> paid and stamps
    /// the confirmation code. A second call for the same ticket fails with
    /// `AlreadyConfirmed` so retried webhooks are detectable.
    pub async fn confirm(&self, ticket_id: Uuid) -> Result<Ticket, TicketError> {
        let code = Uuid::new_v4().simple().to_string();
        let ticket = self.store.mark_paid(ticket_id, &code, Utc::now()).await?;

        if let Err(e) = self.notifier.ticket_confirmed(&ticket).await {
            warn!("confirmation notification failed for ticket {}: {e:#}", ticket.id);
        }

        info!("ticket {} confirmed as paid", ticket.id);
        Ok(ticket)
    }

    /// Deletes one ticket and returns its seat to the pool. Paid tickets
    /// may be cancelled too; the refund money-flow lives with the gateway.
    pub async fn cancel(&self, ticket_id: Uuid) -> Result<Ticket, TicketError> {
        let ticket = self.store.delete_ticket(ticket_id).await?;
        info!(
            "ticket {} cancelled, one seat released for event {}",
            ticket.id, ticket.event_id
        );
        Ok(ticket)
    }

    /// Bulk removal, optionally scoped to one event. The store releases the
    /// matching aggregate seat quantities in the same transaction.
    pub async fn cancel_all(&self, event_id: Option<Uuid>) -> Result<u64, TicketError> {
        let deleted = self.store.delete_all_tickets(event_id).await?;
        info!("bulk cancel: {} tickets deleted", deleted);
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notify::LogNotifier;
    use crate::store::{MemoryStore, NewEvent, NewUser, TicketStore};

    struct Fixture {
        store: Arc<MemoryStore>,
        service: ReservationService,
        user_id: Uuid,
        event_id: Uuid,
    }

    async fn fixture(total_seats: i32, price: Decimal) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let service = ReservationService::new(store.clone(), Arc::new(LogNotifier));
        let user = store
            .create_user(NewUser {
                email: "buyer@example.com".into(),
                name: "Buyer".into(),
            })
            .await
            .unwrap();
        let event = store
            .create_event(NewEvent {
                title: "concert".into(),
                description: None,
                price,
                total_seats,
                starts_at: None,
            })
            .await
            .unwrap();
        Fixture {
            store,
            service,
            user_id: user.id,
            event_id: event.id,
        }
    }

    async fn remaining(f: &Fixture) -> i32 {
        f.store
            .get_event(f.event_id)
            .await
            .unwrap()
            .unwrap()
            .remaining_seats
    }

    #[tokio::test]
    async fn reserve_creates_pending_tickets_sharing_one_reservation() {
        let f = fixture(5, Decimal::new(2000, 2)).await;

        let r = f.service.reserve(f.user_id, f.event_id, 3).await.unwrap();
        assert_eq!(r.tickets.len(), 3);
        assert_eq!(r.total_amount, Decimal::new(6000, 2));
        assert!(r.tickets.iter().all(|t| !t.paid));
        assert!(r.tickets.iter().all(|t| t.reservation_id == r.reservation_id));
        assert_eq!(remaining(&f).await, 2);
    }

    #[tokio::test]
    async fn zero_quantity_is_invalid() {
        let f = fixture(5, Decimal::ONE).await;
        let err = f.service.reserve(f.user_id, f.event_id, 0).await.unwrap_err();
        assert!(matches!(err, TicketError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn unknown_user_and_event_are_not_found() {
        let f = fixture(5, Decimal::ONE).await;

        let err = f
            .service
            .reserve(Uuid::new_v4(), f.event_id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, TicketError::NotFound(Resource::User(_))));

        let err = f
            .service
            .reserve(f.user_id, Uuid::new_v4(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, TicketError::NotFound(Resource::Event(_))));
    }

    #[tokio::test]
    async fn sold_out_names_remaining_seats() {
        let f = fixture(2, Decimal::ONE).await;
        f.service.reserve(f.user_id, f.event_id, 1).await.unwrap();

        let err = f.service.reserve(f.user_id, f.event_id, 2).await.unwrap_err();
        assert!(matches!(err, TicketError::SoldOut { remaining: 1 }));
        assert_eq!(remaining(&f).await, 1);
    }

    #[tokio::test]
    async fn limit_ladder() {
        let f = fixture(50, Decimal::ONE).await;

        // 9 held: quantity 2 exceeds the cap, quantity 1 reaches it
        f.service.reserve(f.user_id, f.event_id, 9).await.unwrap();
        let err = f.service.reserve(f.user_id, f.event_id, 2).await.unwrap_err();
        assert!(matches!(err, TicketError::LimitExceeded { held: 9, remaining: 1 }));

        f.service.reserve(f.user_id, f.event_id, 1).await.unwrap();

        // at the cap every further quantity fails
        let err = f.service.reserve(f.user_id, f.event_id, 1).await.unwrap_err();
        assert!(matches!(err, TicketError::LimitExceeded { held: 10, remaining: 0 }));
    }

    #[tokio::test]
    async fn storage_fault_after_capacity_check_leaves_no_residue() {
        let f = fixture(5, Decimal::ONE).await;

        f.store.fail_next_create();
        let err = f.service.reserve(f.user_id, f.event_id, 3).await.unwrap_err();
        assert!(matches!(err, TicketError::Storage(_)));

        assert_eq!(remaining(&f).await, 5);
        assert!(f.store.list_tickets(None).await.unwrap().is_empty());

        // immediately retryable
        f.service.reserve(f.user_id, f.event_id, 3).await.unwrap();
        assert_eq!(remaining(&f).await, 2);
    }

    #[tokio::test]
    async fn confirm_is_idempotently_rejected() {
        let f = fixture(5, Decimal::ONE).await;
        let r = f.service.reserve(f.user_id, f.event_id, 1).await.unwrap();
        let ticket_id = r.tickets[0].id;

        let confirmed = f.service.confirm(ticket_id).await.unwrap();
        assert!(confirmed.paid);
        assert!(confirmed.confirmation_code.is_some());
        assert!(confirmed.purchased_at.is_some());

        let err = f.service.confirm(ticket_id).await.unwrap_err();
        assert!(matches!(err, TicketError::AlreadyConfirmed(id) if id == ticket_id));

        // the duplicate attempt changed nothing
        let after = f.store.get_ticket(ticket_id).await.unwrap().unwrap();
        assert_eq!(after.confirmation_code, confirmed.confirmation_code);
        assert_eq!(after.purchased_at, confirmed.purchased_at);

        // confirmation never touches the ledger
        assert_eq!(remaining(&f).await, 4);
    }

    #[tokio::test]
    async fn cancel_restores_capacity() {
        let f = fixture(5, Decimal::ONE).await;
        let r = f.service.reserve(f.user_id, f.event_id, 3).await.unwrap();
        assert_eq!(remaining(&f).await, 2);

        f.service.cancel(r.tickets[0].id).await.unwrap();
        f.service.cancel(r.tickets[1].id).await.unwrap();
        assert_eq!(remaining(&f).await, 4);

        let err = f.service.cancel(r.tickets[0].id).await.unwrap_err();
        assert!(matches!(err, TicketError::NotFound(Resource::Ticket(_))));
    }

    #[tokio::test]
    async fn cancelling_a_paid_ticket_still_releases_its_seat() {
        let f = fixture(2, Decimal::ONE).await;
        let r = f.service.reserve(f.user_id, f.event_id, 1).await.unwrap();
        f.service.confirm(r.tickets[0].id).await.unwrap();

        f.service.cancel(r.tickets[0].id).await.unwrap();
        assert_eq!(remaining(&f).await, 2);
    }

    #[tokio::test]
    async fn bulk_cancel_releases_aggregate_quantities() {
        let f = fixture(6, Decimal::ONE).await;
        f.service.reserve(f.user_id, f.event_id, 4).await.unwrap();
        assert_eq!(remaining(&f).await, 2);

        let deleted = f.service.cancel_all(Some(f.event_id)).await.unwrap();
        assert_eq!(deleted, 4);
        assert_eq!(remaining(&f).await, 6);
    }
}
