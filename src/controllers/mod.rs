pub mod events;
pub mod payments;
pub mod tickets;
pub mod users;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(events::routes())
        .merge(users::routes())
        .merge(tickets::routes())
        .merge(payments::routes())
}
