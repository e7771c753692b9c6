use async_trait::async_trait;
use tracing::info;

use crate::models::Ticket;

/// Best-effort side channel fired after a successful confirmation. A failed
/// notification is logged by the caller and never rolls back the payment
/// state change.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn ticket_confirmed(&self, ticket: &Ticket) -> anyhow::Result<()>;
}

/// Default notifier: writes the confirmation to the log. Stands in for mail
/// delivery, which is owned by the surrounding system.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn ticket_confirmed(&self, ticket: &Ticket) -> anyhow::Result<()> {
        info!(
            "ticket {} confirmed for user {} (event {})",
            ticket.id, ticket.user_id, ticket.event_id
        );
        Ok(())
    }
}
