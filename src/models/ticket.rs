use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One ticket = one seat. A purchase of N seats creates N rows sharing a
/// `reservation_id`; the reservation itself is never stored as an entity.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    /// Copied from `events.price` at reservation time and never recomputed,
    /// so later price changes do not affect existing buyers.
    pub price_at_purchase: Decimal,
    pub reservation_id: Uuid,
    pub paid: bool,
    /// Redeemable proof of purchase, generated only on the pending -> paid
    /// transition.
    pub confirmation_code: Option<String>,
    pub purchased_at: Option<DateTime<Utc>>,
}
